//! CSV export of harvested records

use crate::output::summary::OutputResult;
use crate::record::Record;
use std::path::Path;

/// Writes `records` to a CSV file at `output_path`
///
/// The file starts with a header row and has one row per record, in order.
/// Missing parent directories are created.
///
/// # Returns
///
/// The number of rows written, not counting the header
pub fn export_csv(records: &[Record], output_path: &Path) -> OutputResult<usize> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_path(output_path)?;

    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    tracing::info!(
        "Exported {} records to {}",
        records.len(),
        output_path.display()
    );
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, price: &str) -> Record {
        Record {
            title: title.to_string(),
            price: price.to_string(),
            ..Record::empty()
        }
    }

    #[test]
    fn test_export_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("records.csv");

        let written = export_csv(
            &[record("Laptop, 15 inch", "$1,299.00"), record("Mouse", "N/A")],
            &path,
        )
        .unwrap();
        assert_eq!(written, 2);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines[0],
            "title,price,url,description,reviews,rating,location,units_sold"
        );
        assert_eq!(lines[1], r#""Laptop, 15 inch","$1,299.00",N/A,N/A,N/A,N/A,N/A,N/A"#);
        assert_eq!(lines[2], "Mouse,N/A,N/A,N/A,N/A,N/A,N/A,N/A");
    }

    #[test]
    fn test_export_reads_back_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.csv");
        let records: Vec<Record> = (0..5).map(|i| record(&format!("Item {}", i), "$1")).collect();

        export_csv(&records, &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let titles: Vec<String> = reader
            .records()
            .map(|row| row.unwrap()[0].to_string())
            .collect();
        assert_eq!(titles, vec!["Item 0", "Item 1", "Item 2", "Item 3", "Item 4"]);
    }
}
