use std::path::Path;

use crate::models::snapshot::ScanSnapshot;

pub fn export_json(snapshot: &ScanSnapshot, output_path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(output_path, json)?;
    Ok(())
}
