use std::fmt::Write;
use std::path::Path;

use crate::core::analyzer::Analyzer;
use crate::models::record::FileStatus;
use crate::models::scan_result::ScanIssue;
use crate::models::snapshot::ScanSnapshot;
use crate::models::stats::{human_duration, human_readable_size};

/// Folders below this share of scanned bytes are folded into "Others".
const FOLDER_THRESHOLD: f64 = 0.01;
const MAX_LISTED_DAMAGED: usize = 200;

pub fn export_markdown(
    snapshot: &ScanSnapshot,
    issues: &[ScanIssue],
    output_path: &Path,
) -> anyhow::Result<()> {
    let md = render_markdown(snapshot, issues)?;
    std::fs::write(output_path, md)?;
    Ok(())
}

pub fn render_markdown(snapshot: &ScanSnapshot, issues: &[ScanIssue]) -> anyhow::Result<String> {
    let mut md = String::new();
    let stats = &snapshot.stats;

    writeln!(md, "# FileRescue Scan Report")?;
    writeln!(md)?;
    writeln!(md, "- **Root:** {}", snapshot.root_path.display())?;
    writeln!(
        md,
        "- **Captured:** {}",
        snapshot.captured_at.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(md, "- **Files:** {}", stats.total_files)?;
    writeln!(md, "- **Recoverable:** {}", stats.recoverable_count)?;
    writeln!(
        md,
        "- **Damaged:** {} ({} corrupted)",
        stats.damaged_count, stats.corrupted_count
    )?;
    writeln!(md, "- **Scanned:** {}", human_readable_size(stats.scanned_bytes))?;
    if let Some(duration) = stats.duration() {
        writeln!(md, "- **Scan Duration:** {}", human_duration(duration))?;
    }
    writeln!(md)?;

    let counts = Analyzer::status_counts(&snapshot.files);
    writeln!(md, "## Status")?;
    writeln!(md)?;
    writeln!(md, "| Status | Files |")?;
    writeln!(md, "|--------|-------|")?;
    writeln!(md, "| Good | {} |", counts.good)?;
    writeln!(md, "| Damaged | {} |", counts.damaged)?;
    writeln!(md, "| Corrupted | {} |", counts.corrupted)?;
    writeln!(md)?;

    let folders = Analyzer::group_by_folder(&snapshot.files);
    if !folders.is_empty() {
        writeln!(md, "## Folders")?;
        writeln!(md)?;
        writeln!(md, "| Folder | Files | Damaged | Size | % |")?;
        writeln!(md, "|--------|-------|---------|------|---|")?;
        for folder in Analyzer::merge_small_folders(&folders, FOLDER_THRESHOLD) {
            let name = if folder.is_merged() {
                format!("Others ({} folders)", folder.merged_count)
            } else {
                folder.folder.display().to_string()
            };
            writeln!(
                md,
                "| {} | {} | {} | {} | {:.1}% |",
                escape(&name),
                folder.file_count,
                folder.damaged_count,
                human_readable_size(folder.total_bytes),
                folder.percentage,
            )?;
        }
        writeln!(md)?;
    }

    let damaged: Vec<_> = snapshot
        .files
        .iter()
        .filter(|r| r.status != FileStatus::Good)
        .collect();
    if !damaged.is_empty() {
        writeln!(md, "## Damaged Files ({} total)", damaged.len())?;
        writeln!(md)?;
        writeln!(md, "| Name | Status | Type | Size | Path |")?;
        writeln!(md, "|------|--------|------|------|------|")?;
        for record in damaged.iter().take(MAX_LISTED_DAMAGED) {
            writeln!(
                md,
                "| {} | {} | {} | {} | {} |",
                escape(&record.name),
                record.status,
                record.mime_type,
                record.human_readable_size(),
                escape(&record.path.display().to_string()),
            )?;
        }
        if damaged.len() > MAX_LISTED_DAMAGED {
            writeln!(md)?;
            writeln!(md, "_...and {} more_", damaged.len() - MAX_LISTED_DAMAGED)?;
        }
        writeln!(md)?;
    }

    if !issues.is_empty() {
        writeln!(md, "## Errors ({} total)", issues.len())?;
        writeln!(md)?;
        for issue in issues {
            writeln!(md, "- **{:?}**: {}", issue.kind, issue.path.display())?;
        }
    }

    Ok(md)
}

fn escape(cell: &str) -> String {
    cell.replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::FileRecord;
    use crate::models::stats::ScanStatistics;
    use std::path::PathBuf;
    use std::time::SystemTime;

    #[test]
    fn report_lists_damaged_files() {
        let files = vec![
            FileRecord::new(
                PathBuf::from("/r/ok.png"),
                10,
                FileStatus::Good,
                "image/png",
                SystemTime::UNIX_EPOCH,
            ),
            FileRecord::new(
                PathBuf::from("/r/bad|name.pdf"),
                20,
                FileStatus::Damaged,
                "text/plain",
                SystemTime::UNIX_EPOCH,
            ),
        ];
        let mut stats = ScanStatistics::default();
        for f in &files {
            stats.record(f.status, f.size_bytes);
        }
        let snapshot = ScanSnapshot::new(files, stats, PathBuf::from("/r"));

        let md = render_markdown(&snapshot, &[]).unwrap();
        assert!(md.contains("- **Files:** 2"));
        assert!(md.contains("## Damaged Files (1 total)"));
        assert!(md.contains("bad\\|name.pdf"));
        assert!(!md.contains("## Errors"));
    }
}
