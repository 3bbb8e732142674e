use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use tracing::info;

use crate::error::ExportError;
use crate::model::{CanonicalRecord, CSV_COLUMNS};

/// Write records as CSV in schema column order. Fields containing a comma, quote or newline
/// are quoted with inner quotes doubled; labels are joined with `;`.
pub fn write_csv<W: Write>(records: &[CanonicalRecord], out: W) -> Result<(), ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(out);
    writer.write_record(CSV_COLUMNS)?;
    for record in records {
        writer.write_record(record.to_row())?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_csv<R: Read>(input: R) -> Result<Vec<CanonicalRecord>, ExportError> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(input);
    let headers = reader.headers()?;
    if headers.len() != CSV_COLUMNS.len() {
        return Err(ExportError::Schema {
            expected: CSV_COLUMNS.len(),
            found: headers.len(),
        });
    }
    if let Some((column, (expected, found))) = CSV_COLUMNS
        .iter()
        .zip(headers.iter())
        .enumerate()
        .find(|(_, (expected, found))| **expected != found.trim())
    {
        return Err(ExportError::Header {
            column,
            expected: *expected,
            found: found.to_string(),
        });
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let mut cells = [""; 18];
        for (slot, value) in cells.iter_mut().zip(row.iter()) {
            *slot = value;
        }
        records.push(CanonicalRecord::from_row(&cells));
    }
    Ok(records)
}

pub fn write_json<W: Write>(records: &[CanonicalRecord], out: W) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(out, records)?;
    Ok(())
}

pub fn read_json<R: Read>(input: R) -> Result<Vec<CanonicalRecord>, ExportError> {
    Ok(serde_json::from_reader(input)?)
}

/// Read a batch file, picking the format from the extension (`.csv`, anything else is JSON).
pub fn load_batch(path: &Path) -> Result<Vec<CanonicalRecord>, ExportError> {
    let file = File::open(path)?;
    let records = if is_csv(path) {
        read_csv(file)?
    } else {
        read_json(file)?
    };
    info!(path = %path.display(), records = records.len(), "loaded batch");
    Ok(records)
}

pub fn save_batch(path: &Path, records: &[CanonicalRecord]) -> Result<(), ExportError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let file = File::create(path)?;
    if is_csv(path) {
        write_csv(records, file)?;
    } else {
        write_json(records, file)?;
    }
    info!(path = %path.display(), records = records.len(), "saved batch");
    Ok(())
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tricky() -> CanonicalRecord {
        CanonicalRecord {
            technology_name_en: "Sail, \"rigid\" type".into(),
            id: "171616".into(),
            company_name: "Eco Marine Power Co. Ltd.".into(),
            published_time: "2021/6/3".into(),
            updated_time: String::new(),
            company_website_url: "https://www.ecomarinepower.com".into(),
            technology_image_url: "https://img.example.org/171616.jpg".into(),
            description: "Line one\nLine two, with comma".into(),
            benefits: "Greenhouse gases; Energy".into(),
            benefits_description: "It reduces greenhouse gas emissions, contributing to a more sustainable future.".into(),
            developed_in_country: "Japan".into(),
            deployed_in_country: "Australia".into(),
            technology_readiness_level: "8".into(),
            intellectual_property: "Patented".into(),
            custom_labels: vec!["Maritime decarbonization".into(), "Solar energy".into(), "Wind energy".into()],
            technology_name_cn: "能源帆".into(),
            technology_category: "clean-energy".into(),
            sub_category: "renewables".into(),
        }
    }

    #[test]
    fn csv_header_order() {
        let mut buf = Vec::new();
        write_csv(&[], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.trim_end(), CSV_COLUMNS.join(","));
    }

    #[test]
    fn csv_quoting_rule() {
        let mut buf = Vec::new();
        write_csv(&[tricky()], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("\"Sail, \"\"rigid\"\" type\""));
        assert!(text.contains("\"Line one\nLine two, with comma\""));
        assert!(text.contains(",Maritime decarbonization;Solar energy;Wind energy,"));
        assert!(text.contains(",171616,"));
    }

    #[test]
    fn csv_round_trip() {
        let records = vec![tricky(), CanonicalRecord { id: "1".into(), ..Default::default() }];
        let mut buf = Vec::new();
        write_csv(&records, &mut buf).unwrap();
        let back = read_csv(buf.as_slice()).unwrap();
        assert_eq!(back, records);
    }

    #[test]
    fn json_round_trip() {
        let records = vec![tricky()];
        let mut buf = Vec::new();
        write_json(&records, &mut buf).unwrap();
        assert_eq!(read_json(buf.as_slice()).unwrap(), records);
    }

    #[test]
    fn csv_wrong_header_rejected() {
        let err = read_csv("a,b\n1,2\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ExportError::Schema { expected: 18, found: 2 }));
    }

    #[test]
    fn csv_reordered_header_rejected() {
        let mut header: Vec<&str> = CSV_COLUMNS.to_vec();
        header.swap(0, 1);
        let row = vec!["171616"; 18];
        let text = format!("{}\n{}\n", header.join(","), row.join(","));
        let err = read_csv(text.as_bytes()).unwrap_err();
        match err {
            ExportError::Header { column, expected, found } => {
                assert_eq!(column, 0);
                assert_eq!(expected, "technologyNameEN");
                assert_eq!(found, "id");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
