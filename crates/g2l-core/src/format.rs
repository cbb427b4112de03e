//! Outbound message template.

use crate::types::MailRecord;

/// Render a record into the chat payload.
///
/// Each section is newline-terminated; user content is not escaped.
pub fn render(record: &MailRecord) -> String {
    format!(
        "[From]\n{}\n[Subject]\n{}\n[Body]\n{}\n",
        record.from, record.subject, record.body
    )
}
