//! Request validation and recipient normalization.
//!
//! Pure functions: nothing here touches the dispatcher.

use tp_common::{DispatchJob, MessageBatch, Recipient, RecipientEntry};

use crate::error::ValidationError;

pub const SINGLE_MISSING_FIELDS: &str = "Missing required fields: phone_number and messages (array)";
pub const BULK_MISSING_FIELDS: &str = "Missing required fields: phone_numbers (array) and messages (array)";

/// Validate a single-recipient request.
///
/// The recipient must be present and non-empty, `messages` must be a non-empty
/// list, and the normalized number must be an optional `+` followed by digits.
pub fn validate_single(
    phone_number: Option<&str>,
    messages: Option<Vec<String>>,
) -> Result<DispatchJob, ValidationError> {
    let missing = ValidationError::MissingFields(SINGLE_MISSING_FIELDS);

    let phone_number = phone_number.filter(|p| !p.is_empty()).ok_or(missing.clone())?;
    let batch = messages.and_then(MessageBatch::new).ok_or(missing)?;

    let recipient = Recipient::parse(phone_number).ok_or(ValidationError::InvalidRecipientFormat)?;

    Ok(DispatchJob::new(recipient, batch))
}

/// Validate a bulk request.
///
/// Only missing or empty lists fail here. Malformed numbers are kept as
/// [`RecipientEntry::Rejected`] at their position; the dispatch loop skips them.
pub fn validate_bulk(
    phone_numbers: Option<Vec<String>>,
    messages: Option<Vec<String>>,
) -> Result<(Vec<RecipientEntry>, MessageBatch), ValidationError> {
    let missing = ValidationError::MissingFields(BULK_MISSING_FIELDS);

    let phone_numbers = phone_numbers.filter(|p| !p.is_empty()).ok_or(missing.clone())?;
    let batch = messages.and_then(MessageBatch::new).ok_or(missing)?;

    let recipients = phone_numbers
        .iter()
        .map(|raw| RecipientEntry::from_raw(raw))
        .collect();

    Ok((recipients, batch))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msgs(items: &[&str]) -> Option<Vec<String>> {
        Some(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_single_normalizes_recipient() {
        let job = validate_single(Some("(555) 123-4567"), msgs(&["hi"])).unwrap();
        assert_eq!(job.recipient.as_str(), "5551234567");
        assert_eq!(job.batch.iter().collect::<Vec<_>>(), vec!["hi"]);
    }

    #[test]
    fn test_single_missing_fields() {
        let expected = Err(ValidationError::MissingFields(SINGLE_MISSING_FIELDS));

        assert_eq!(validate_single(None, msgs(&["hi"])).map(|_| ()), expected);
        assert_eq!(validate_single(Some(""), msgs(&["hi"])).map(|_| ()), expected);
        assert_eq!(validate_single(Some("5551234567"), None).map(|_| ()), expected);
        assert_eq!(validate_single(Some("5551234567"), msgs(&[])).map(|_| ()), expected);
    }

    #[test]
    fn test_single_rejects_bad_format() {
        let result = validate_single(Some("call-me-maybe"), msgs(&["hi"]));
        assert_eq!(result.map(|_| ()), Err(ValidationError::InvalidRecipientFormat));
    }

    #[test]
    fn test_missing_fields_wins_over_bad_format() {
        let result = validate_single(Some("not a number"), msgs(&[]));
        assert_eq!(
            result.map(|_| ()),
            Err(ValidationError::MissingFields(SINGLE_MISSING_FIELDS))
        );
    }

    #[test]
    fn test_bulk_keeps_rejected_entries_in_order() {
        let (recipients, batch) = validate_bulk(
            Some(vec!["+1 555-000-0001".into(), "bad-number".into(), "+1 555-000-0001".into()]),
            msgs(&["x"]),
        )
        .unwrap();

        assert_eq!(batch.len(), 1);
        assert_eq!(recipients.len(), 3);
        assert_eq!(recipients[0], RecipientEntry::Valid(Recipient::parse("+15550000001").unwrap()));
        assert_eq!(recipients[1], RecipientEntry::Rejected { raw: "bad-number".into() });
        // Duplicates are processed independently
        assert_eq!(recipients[2], recipients[0]);
    }

    #[test]
    fn test_bulk_missing_fields() {
        let expected = Err(ValidationError::MissingFields(BULK_MISSING_FIELDS));

        assert_eq!(validate_bulk(None, msgs(&["x"])).map(|_| ()), expected);
        assert_eq!(validate_bulk(Some(vec![]), msgs(&["x"])).map(|_| ()), expected);
        assert_eq!(validate_bulk(Some(vec!["5550001".into()]), None).map(|_| ()), expected);
        assert_eq!(validate_bulk(Some(vec!["5550001".into()]), msgs(&[])).map(|_| ()), expected);
    }

    #[test]
    fn test_bulk_with_only_bad_numbers_is_accepted() {
        let (recipients, _) = validate_bulk(Some(vec!["nope".into()]), msgs(&["x"])).unwrap();
        assert!(!recipients[0].is_valid());
    }
}
