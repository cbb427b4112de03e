//! Recursive MIME body decoding.
//!
//! A `text/plain` part yields its base64url-decoded payload. Any other part
//! yields the concatenation of its children, in order, with no separator.
//! A malformed payload anywhere in the tree fails the whole decode.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;

use crate::error::DecodeError;
use crate::types::MailPart;

/// MIME type whose payload is forwarded verbatim.
pub const PLAIN_TEXT: &str = "text/plain";

/// URL-safe alphabet; the mailbox may or may not pad payloads.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode the body of a message from its top-level part.
pub fn decode_body(part: &MailPart) -> Result<String, DecodeError> {
    if part.mime_type != PLAIN_TEXT {
        let mut body = String::new();
        for child in &part.children {
            body.push_str(&decode_body(child)?);
        }
        return Ok(body);
    }

    let data = part.data.as_deref().unwrap_or_default();
    let bytes = URL_SAFE_LENIENT
        .decode(data)
        .map_err(|source| DecodeError::Base64 {
            mime_type: part.mime_type.clone(),
            source,
        })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
