use serde::Serialize;
use std::fmt;
use std::sync::Arc;

pub mod logging;

// ============================================================================
// Recipients
// ============================================================================

/// A normalized phone number.
///
/// Only constructible through [`Recipient::parse`], so every value matches
/// `^\+?\d+$`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Recipient(String);

impl Recipient {
    /// Strip whitespace, hyphens and parentheses from a raw phone number.
    ///
    /// Whitespace is Unicode `White_Space` plus U+FEFF (byte order mark).
    /// Every other character is kept as-is.
    pub fn normalize(raw: &str) -> String {
        raw.chars()
            .filter(|c| !c.is_whitespace() && !matches!(c, '\u{feff}' | '-' | '(' | ')'))
            .collect()
    }

    /// Normalize `raw` and accept it if it is an optional `+` followed by one
    /// or more ASCII digits.
    pub fn parse(raw: &str) -> Option<Self> {
        let cleaned = Self::normalize(raw);
        let digits = cleaned.strip_prefix('+').unwrap_or(&cleaned);

        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(cleaned))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Recipient {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One position in a bulk request's recipient list.
///
/// Rejected entries stay in the list so the dispatch loop can report them at
/// the position the caller supplied them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipientEntry {
    Valid(Recipient),
    Rejected { raw: String },
}

impl RecipientEntry {
    pub fn from_raw(raw: &str) -> Self {
        match Recipient::parse(raw) {
            Some(recipient) => RecipientEntry::Valid(recipient),
            None => RecipientEntry::Rejected { raw: raw.to_string() },
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, RecipientEntry::Valid(_))
    }
}

// ============================================================================
// Messages and Jobs
// ============================================================================

/// Ordered message bodies; the order is the send order.
///
/// Cloning is cheap: all jobs of a bulk request share one allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBatch {
    messages: Arc<[String]>,
}

impl MessageBatch {
    /// Returns `None` for an empty list.
    pub fn new(messages: Vec<String>) -> Option<Self> {
        if messages.is_empty() {
            return None;
        }
        Some(Self { messages: messages.into() })
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(String::as_str)
    }
}

/// A recipient paired with the batch to send it.
#[derive(Debug, Clone)]
pub struct DispatchJob {
    pub recipient: Recipient,
    pub batch: MessageBatch,
}

impl DispatchJob {
    pub fn new(recipient: Recipient, batch: MessageBatch) -> Self {
        Self { recipient, batch }
    }
}

/// Work accepted by the API and handed to the background dispatcher.
#[derive(Debug, Clone)]
pub enum DispatchRequest {
    /// One recipient; a delivery failure ends the job.
    Single(DispatchJob),
    /// Many recipients sharing one batch; failures are isolated per recipient.
    Bulk {
        recipients: Vec<RecipientEntry>,
        batch: MessageBatch,
    },
}

impl DispatchRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchRequest::Single(_) => "single",
            DispatchRequest::Bulk { .. } => "bulk",
        }
    }
}

/// Summary of a finished dispatch loop. Only ever logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub messages_delivered: usize,
    pub recipients_completed: usize,
    pub recipients_failed: usize,
    pub recipients_skipped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_only_separators() {
        assert_eq!(Recipient::normalize("(555) 123-4567"), "5551234567");
        assert_eq!(Recipient::normalize("+1 555\t000-0001"), "+15550000001");
        assert_eq!(Recipient::normalize("555.123.4567"), "555.123.4567");
        assert_eq!(Recipient::normalize("bad-number"), "badnumber");
    }

    #[test]
    fn test_normalize_strips_unicode_spaces_and_bom() {
        assert_eq!(Recipient::normalize("555\u{feff}1234"), "5551234");
        assert_eq!(Recipient::normalize("\u{feff}+1\u{a0}555\u{2003}0001"), "+15550001");
        assert_eq!(Recipient::parse("555\u{feff}1234").unwrap().as_str(), "5551234");
        // Zero-width space is not whitespace
        assert!(Recipient::parse("555\u{200b}1234").is_none());
    }

    #[test]
    fn test_parse_accepts_digits_with_optional_plus() {
        assert_eq!(Recipient::parse("(555) 123-4567").unwrap().as_str(), "5551234567");
        assert_eq!(Recipient::parse("+1 555-000-0001").unwrap().as_str(), "+15550000001");
    }

    #[test]
    fn test_parse_rejects_malformed_numbers() {
        assert!(Recipient::parse("bad-number").is_none());
        assert!(Recipient::parse("+").is_none());
        assert!(Recipient::parse("").is_none());
        assert!(Recipient::parse("  - () ").is_none());
        assert!(Recipient::parse("++15550001").is_none());
        assert!(Recipient::parse("555+1234").is_none());
        assert!(Recipient::parse("555.123.4567").is_none());
        // Non-ASCII digits are not phone digits
        assert!(Recipient::parse("٥٥٥١٢٣").is_none());
    }

    #[test]
    fn test_recipient_entry_keeps_raw_input_when_rejected() {
        let entry = RecipientEntry::from_raw("bad-number");
        assert_eq!(entry, RecipientEntry::Rejected { raw: "bad-number".to_string() });
        assert!(!entry.is_valid());
        assert!(RecipientEntry::from_raw("+1 555-000-0001").is_valid());
    }

    #[test]
    fn test_message_batch_rejects_empty() {
        assert!(MessageBatch::new(vec![]).is_none());

        let batch = MessageBatch::new(vec!["a".into(), "b".into()]).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_recipient_serializes_as_plain_string() {
        let recipient = Recipient::parse("555 0100").unwrap();
        assert_eq!(serde_json::to_string(&recipient).unwrap(), "\"5550100\"");
    }
}
