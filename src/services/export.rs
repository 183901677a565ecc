use crate::models::delivery::DeliveryRecord;

/// File name offered for the filtered export
pub const EXPORT_FILE_NAME: &str = "deliveries_filtered.csv";

pub const EXPORT_CONTENT_TYPE: &str = "text/csv";

/// Write records as CSV with a header row in projection column order.
pub fn to_csv(records: &[&DeliveryRecord]) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    // serde only emits headers once a record is written, so write them ourselves
    writer.write_record(crate::db::delivery_tables::DeliveryTable::COLUMNS)?;
    for record in records {
        writer.serialize(record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Flush(e.to_string()))?;
    Ok(String::from_utf8(bytes)?)
}

/// Parse CSV produced by [`to_csv`] back into records.
pub fn from_csv(data: &str) -> Result<Vec<DeliveryRecord>, ExportError> {
    let mut reader = csv::Reader::from_reader(data.as_bytes());
    let mut records = Vec::new();
    for record in reader.deserialize() {
        records.push(record?);
    }
    Ok(records)
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to flush CSV output: {0}")]
    Flush(String),

    #[error("CSV output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::delivery_tables::DeliveryTable;
    use crate::services::test_support::delivery;
    use chrono::NaiveDate;

    #[test]
    fn test_header_matches_projection() {
        let csv = to_csv(&[]).unwrap();

        assert_eq!(csv.trim_end(), DeliveryTable::COLUMNS.join(","));
    }

    #[test]
    fn test_export_then_parse_reproduces_rows() {
        let mut first = delivery("D-1", "North", "Delivered", "W1");
        first.driver_name = "Okello, Peter".into();
        first.capacity_utilisation = 48.25;
        first.created_date = NaiveDate::from_ymd_opt(2023, 12, 30)
            .unwrap()
            .and_hms_opt(14, 5, 9)
            .unwrap();
        let mut second = delivery("D-2", "North", "Delayed", "W1");
        second.cargo_subtype = "Water \"treated\"".into();
        let records = vec![first, second];
        let refs: Vec<&DeliveryRecord> = records.iter().collect();

        let csv = to_csv(&refs).unwrap();
        let parsed = from_csv(&csv).unwrap();

        assert_eq!(parsed, records);
        assert!(csv.contains("2023-12-30 14:05:09"));
        assert!(csv.contains(",2024-01-01,"));
    }

    #[test]
    fn test_parse_rejects_bad_date() {
        let csv = to_csv(&[&delivery("D-1", "North", "Delivered", "W1")])
            .unwrap()
            .replace("2024-01-01", "soon");

        assert!(from_csv(&csv).is_err());
    }
}
