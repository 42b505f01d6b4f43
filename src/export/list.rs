use std::io;
use std::path::Path;

use serde::Serialize;

use crate::models::record::FileRecord;

#[derive(Serialize)]
struct Row<'a> {
    name: &'a str,
    path: String,
    size: u64,
    status: &'static str,
    mime_type: &'a str,
    modified_at: String,
}

impl<'a> From<&'a FileRecord> for Row<'a> {
    fn from(record: &'a FileRecord) -> Self {
        Self {
            name: &record.name,
            path: record.path.display().to_string(),
            size: record.size_bytes,
            status: record.status.label(),
            mime_type: &record.mime_type,
            modified_at: record.modified_at.to_rfc3339(),
        }
    }
}

/// One CSV row per record with a `name,path,size,status,mime_type,modified_at`
/// header.
pub fn write_list<'a, W: io::Write>(
    records: impl IntoIterator<Item = &'a FileRecord>,
    writer: W,
) -> anyhow::Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    let mut rows = 0;
    for record in records {
        wtr.serialize(Row::from(record))?;
        rows += 1;
    }
    if rows == 0 {
        wtr.write_record(["name", "path", "size", "status", "mime_type", "modified_at"])?;
    }
    wtr.flush()?;
    Ok(rows)
}

pub fn export_list<'a>(
    records: impl IntoIterator<Item = &'a FileRecord>,
    output_path: &Path,
) -> anyhow::Result<usize> {
    let file = std::fs::File::create(output_path)?;
    write_list(records, io::BufWriter::new(file))
}
