use crate::application::orchestrator::CheckoutRequest;
use crate::error::{Result, SettlementError};
use std::io::Read;

/// Reads checkout requests from a CSV source with camelCase headers
/// (`appointmentId, amount, practitionerId, clientId, description, successUrl, cancelUrl`).
///
/// Fields are trimmed and rows may omit trailing columns; missing values are
/// reported by request validation, not here.
pub struct CheckoutRequestReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CheckoutRequestReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes one request per row.
    pub fn requests(self) -> impl Iterator<Item = Result<CheckoutRequest>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(SettlementError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const HEADER: &str = "appointmentId, amount, practitionerId, clientId, description, successUrl, cancelUrl";

    #[test]
    fn test_reader_valid_stream() {
        let data = format!(
            "{HEADER}\n\
             6f1c0d4e-0000-4000-8000-000000000001, 100, 6f1c0d4e-0000-4000-8000-0000000000a1, 6f1c0d4e-0000-4000-8000-0000000000b1, Consultation, https://app.example.com/ok, https://app.example.com/cancel\n\
             6f1c0d4e-0000-4000-8000-000000000002, 49.90, 6f1c0d4e-0000-4000-8000-0000000000a1, 6f1c0d4e-0000-4000-8000-0000000000b1, , https://app.example.com/ok, https://app.example.com/cancel"
        );
        let results: Vec<Result<CheckoutRequest>> =
            CheckoutRequestReader::new(data.as_bytes()).requests().collect();

        assert_eq!(results.len(), 2);
        let first = results[0].as_ref().unwrap();
        assert_eq!(first.amount, Some(dec!(100)));
        assert_eq!(first.description.as_deref(), Some("Consultation"));
        let second = results[1].as_ref().unwrap();
        assert_eq!(second.amount, Some(dec!(49.90)));
        assert!(second.description.is_none());
    }

    #[test]
    fn test_short_row_leaves_fields_empty() {
        let data = format!("{HEADER}\n6f1c0d4e-0000-4000-8000-000000000001, 100");
        let request = CheckoutRequestReader::new(data.as_bytes())
            .requests()
            .next()
            .unwrap()
            .unwrap();
        assert!(request.practitioner_id.is_none());
        assert!(request.cancel_url.is_none());
    }

    #[test]
    fn test_reader_malformed_amount() {
        let data = format!("{HEADER}\na-1, lots, p, c, d, s, x");
        let results: Vec<Result<CheckoutRequest>> =
            CheckoutRequestReader::new(data.as_bytes()).requests().collect();
        assert!(matches!(results[0], Err(SettlementError::Csv(_))));
    }
}
