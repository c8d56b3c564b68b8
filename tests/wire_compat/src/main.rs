//! JSON shape checks for the protocol types, run with `cargo test`.

fn main() {}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use serde::Serialize;
    use serde::de::DeserializeOwned;
    use serde_json::Value;

    use bytesink_protocol::{ProgressEvent, TransferStatus, TransferSummary};

    /// Parses `fixtures/<name>` into `T` and checks that encoding it again
    /// produces the same JSON document.
    fn decode_stable<T: DeserializeOwned + Serialize>(name: &str) -> T {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures").join(name);
        let text = std::fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("{}: {e}", path.display()));
        let expected: Value = serde_json::from_str(&text).unwrap();

        let value: T = serde_json::from_value(expected.clone())
            .unwrap_or_else(|e| panic!("{name} does not decode: {e}"));
        assert_eq!(serde_json::to_value(&value).unwrap(), expected, "{name} re-encodes differently");
        value
    }

    #[test]
    fn fixture_progress_event() {
        let event: ProgressEvent = decode_stable("progress_event.json");
        assert_eq!(event.total, Some(1_048_576));
        assert!(!event.is_complete());
    }

    #[test]
    fn fixture_progress_event_unknown_total() {
        let event: ProgressEvent = decode_stable("progress_event_unknown_total.json");
        assert_eq!(event.total, None);
        assert!(event.percentage().is_none());
    }

    #[test]
    fn fixture_transfer_summary() {
        let summary: TransferSummary = decode_stable("transfer_summary.json");
        assert_eq!(summary.status, TransferStatus::Completed);
        assert_eq!(summary.existing_len, 0);
    }

    #[test]
    fn fixture_transfer_summary_append() {
        let summary: TransferSummary = decode_stable("transfer_summary_append.json");
        assert!(summary.appended);
        assert_eq!(summary.final_len(), 65_536 + 4096);
    }

    #[test]
    fn null_total_reads_as_unknown() {
        let json = r#"{"target":"t","increment":1,"transferred":1,"total":null}"#;
        let event: ProgressEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.total, None);
    }

    #[test]
    fn unknown_status_rejected() {
        let json = r#"{"target":"t","status":"paused","bytesWritten":0,"appended":false}"#;
        assert!(serde_json::from_str::<TransferSummary>(json).is_err());
    }
}
