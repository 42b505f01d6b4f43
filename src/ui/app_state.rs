use std::collections::HashSet;
use std::path::PathBuf;

use crate::core::analyzer::{Analyzer, RecordFilter};
use crate::core::details::FileDetails;
use crate::core::progress::ProgressSnapshot;
use crate::models::category::Category;
use crate::models::record::{FileRecord, FileStatus};
use crate::models::scan_result::{ScanIssue, ScanState};
use crate::models::stats::ScanStatistics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Normal,
    Help,
    ErrorList,
    Details,
    Confirm,
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutChoice {
    Flat,
    Structured,
    Metadata,
}

impl LayoutChoice {
    pub fn label(self) -> &'static str {
        match self {
            LayoutChoice::Flat => "Flat",
            LayoutChoice::Structured => "Folder structure",
            LayoutChoice::Metadata => "Flat + metadata",
        }
    }
}

/// A pending yes/no question from the recovery worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPrompt {
    pub name: String,
    pub status: FileStatus,
}

pub struct AppState {
    pub view_mode: ViewMode,
    pub root_path: PathBuf,
    pub category: Category,
    pub scan_state: ScanState,
    pub records: Vec<FileRecord>,
    pub stats: ScanStatistics,
    pub issues: Vec<ScanIssue>,
    /// Indices into `records`.
    pub checked: HashSet<usize>,
    pub filter: RecordFilter,
    pub layout: LayoutChoice,
    pub selected_index: usize,
    pub list_offset: usize,
    pub percent: f64,
    pub files_seen: u64,
    pub scan_speed: f64,
    pub current_scanning_path: String,
    pub status_text: String,
    pub error_count: u64,
    pub recovery_progress: Option<(usize, usize)>,
    pub confirm: Option<ConfirmPrompt>,
    pub details: Option<FileDetails>,
    pub message: Option<String>,
    pub should_quit: bool,
    pub pending_g: bool,
}

impl AppState {
    pub fn new(root_path: PathBuf, category: Category) -> Self {
        Self {
            view_mode: ViewMode::Normal,
            root_path,
            category,
            scan_state: ScanState::Idle,
            records: Vec::new(),
            stats: ScanStatistics::default(),
            issues: Vec::new(),
            checked: HashSet::new(),
            filter: RecordFilter::default(),
            layout: LayoutChoice::Structured,
            selected_index: 0,
            list_offset: 0,
            percent: 0.0,
            files_seen: 0,
            scan_speed: 0.0,
            current_scanning_path: String::new(),
            status_text: String::from("Ready"),
            error_count: 0,
            recovery_progress: None,
            confirm: None,
            details: None,
            message: None,
            should_quit: false,
            pending_g: false,
        }
    }

    /// Record indices that pass the current filter, in scan order.
    pub fn visible_indices(&self) -> Vec<usize> {
        if self.filter.is_empty() {
            return (0..self.records.len()).collect();
        }
        Analyzer::filter_indices(&self.records, &self.filter)
    }

    pub fn visible_count(&self) -> usize {
        self.visible_indices().len()
    }

    /// Index into `records` of the highlighted row.
    pub fn highlighted(&self) -> Option<usize> {
        self.visible_indices().get(self.selected_index).copied()
    }

    pub fn highlighted_record(&self) -> Option<&FileRecord> {
        self.highlighted().and_then(|i| self.records.get(i))
    }

    pub fn move_up(&mut self) {
        if self.selected_index > 0 {
            self.selected_index -= 1;
            if self.selected_index < self.list_offset {
                self.list_offset = self.selected_index;
            }
        }
    }

    pub fn move_down(&mut self) {
        let count = self.visible_count();
        if count > 0 && self.selected_index < count - 1 {
            self.selected_index += 1;
        }
    }

    pub fn go_to_first(&mut self) {
        self.selected_index = 0;
        self.list_offset = 0;
    }

    pub fn go_to_last(&mut self) {
        let count = self.visible_count();
        if count > 0 {
            self.selected_index = count - 1;
        }
    }

    pub fn toggle_checked(&mut self) {
        if let Some(i) = self.highlighted() {
            if !self.checked.remove(&i) {
                self.checked.insert(i);
            }
        }
        self.move_down();
    }

    /// Check every visible record, or clear them all if they already are.
    pub fn toggle_all(&mut self) {
        let visible = self.visible_indices();
        if !visible.is_empty() && visible.iter().all(|i| self.checked.contains(i)) {
            for i in visible {
                self.checked.remove(&i);
            }
        } else {
            self.checked.extend(visible);
        }
    }

    pub fn checked_records(&self) -> Vec<FileRecord> {
        let mut indices: Vec<usize> = self.checked.iter().copied().collect();
        indices.sort_unstable();
        indices
            .into_iter()
            .filter_map(|i| self.records.get(i).cloned())
            .collect()
    }

    /// Filter by the highlighted record's folder, or clear the folder filter.
    pub fn toggle_folder_filter(&mut self) {
        if self.filter.folder.is_some() {
            self.filter.folder = None;
        } else if let Some(record) = self.highlighted_record() {
            self.filter.folder = Some(record.containing_folder.clone());
        }
        self.go_to_first();
    }

    pub fn cycle_status_filter(&mut self) {
        self.filter.status = match self.filter.status {
            None => Some(FileStatus::Good),
            Some(FileStatus::Good) => Some(FileStatus::Damaged),
            Some(FileStatus::Damaged) => Some(FileStatus::Corrupted),
            Some(FileStatus::Corrupted) => None,
        };
        self.go_to_first();
    }

    pub fn begin_search(&mut self) {
        self.view_mode = ViewMode::Search;
    }

    pub fn push_search_char(&mut self, c: char) {
        self.filter.query.push(c);
        self.go_to_first();
    }

    pub fn pop_search_char(&mut self) {
        self.filter.query.pop();
        self.go_to_first();
    }

    /// Leave search input; `keep` false also drops the query.
    pub fn end_search(&mut self, keep: bool) {
        if !keep {
            self.filter.query.clear();
            self.go_to_first();
        }
        self.view_mode = ViewMode::Normal;
    }

    pub fn cycle_layout(&mut self) {
        self.layout = match self.layout {
            LayoutChoice::Flat => LayoutChoice::Structured,
            LayoutChoice::Structured => LayoutChoice::Metadata,
            LayoutChoice::Metadata => LayoutChoice::Flat,
        };
        self.message = Some(format!("Recovery layout: {}", self.layout.label()));
    }

    pub fn toggle_help(&mut self) {
        self.view_mode = if self.view_mode == ViewMode::Help {
            ViewMode::Normal
        } else {
            ViewMode::Help
        };
    }

    pub fn toggle_error_list(&mut self) {
        self.view_mode = if self.view_mode == ViewMode::ErrorList {
            ViewMode::Normal
        } else {
            ViewMode::ErrorList
        };
    }

    pub fn show_details(&mut self, details: FileDetails) {
        self.details = Some(details);
        self.view_mode = ViewMode::Details;
    }

    pub fn close_overlay(&mut self) {
        self.details = None;
        self.view_mode = ViewMode::Normal;
    }

    pub fn ask(&mut self, prompt: ConfirmPrompt) {
        self.confirm = Some(prompt);
        self.view_mode = ViewMode::Confirm;
    }

    pub fn answer(&mut self) {
        self.confirm = None;
        self.view_mode = ViewMode::Normal;
    }

    pub fn update_progress(&mut self, progress: &ProgressSnapshot) {
        self.percent = progress.percent;
        self.files_seen = progress.files_seen;
        self.scan_speed = progress.files_per_second;
        self.current_scanning_path = progress.current_path.display().to_string();
        self.status_text = progress.status.clone();
        self.error_count = progress.errors_count;
    }

    /// True when the engine holds issues this state has not pulled yet.
    /// The engine keeps at most `max_issues` even though the counter goes on.
    pub fn needs_issue_refresh(&self, max_issues: usize) -> bool {
        let kept = self.error_count.min(max_issues as u64);
        self.issues.len() as u64 != kept
    }

    pub fn append_records(&mut self, records: Vec<FileRecord>) {
        self.records.extend(records);
    }

    /// Replace everything with restored results.
    pub fn replace_records(&mut self, records: Vec<FileRecord>, stats: ScanStatistics) {
        self.records = records;
        self.stats = stats;
        self.checked.clear();
        self.filter = RecordFilter::default();
        self.issues.clear();
        self.go_to_first();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn state_with(paths: &[(&str, FileStatus)]) -> AppState {
        let mut state = AppState::new(PathBuf::from("/r"), Category::All);
        state.append_records(
            paths
                .iter()
                .map(|(p, s)| FileRecord::new(PathBuf::from(p), 1, *s, "unknown", SystemTime::UNIX_EPOCH))
                .collect(),
        );
        state
    }

    #[test]
    fn folder_filter_follows_highlight() {
        let mut state = state_with(&[
            ("/r/a/1.txt", FileStatus::Good),
            ("/r/b/2.txt", FileStatus::Good),
            ("/r/b/3.txt", FileStatus::Damaged),
        ]);
        state.move_down();
        state.toggle_folder_filter();
        assert_eq!(state.visible_indices(), vec![1, 2]);
        state.toggle_folder_filter();
        assert_eq!(state.visible_count(), 3);
    }

    #[test]
    fn select_all_toggles() {
        let mut state = state_with(&[
            ("/r/1.txt", FileStatus::Good),
            ("/r/2.txt", FileStatus::Damaged),
        ]);
        state.toggle_all();
        assert_eq!(state.checked_records().len(), 2);
        state.toggle_all();
        assert!(state.checked.is_empty());

        state.filter.status = Some(FileStatus::Damaged);
        state.toggle_checked();
        assert_eq!(state.checked_records()[0].name, "2.txt");
    }

    #[test]
    fn search_narrows_by_name() {
        let mut state = state_with(&[
            ("/r/a/Holiday.JPG", FileStatus::Good),
            ("/r/a/notes.txt", FileStatus::Good),
            ("/r/b/holiday-2.png", FileStatus::Damaged),
        ]);
        state.begin_search();
        assert_eq!(state.view_mode, ViewMode::Search);
        for c in "holi".chars() {
            state.push_search_char(c);
        }
        assert_eq!(state.visible_indices(), vec![0, 2]);

        state.end_search(true);
        assert_eq!(state.view_mode, ViewMode::Normal);
        state.cycle_status_filter();
        assert_eq!(state.visible_indices(), vec![0]);

        state.begin_search();
        state.pop_search_char();
        state.end_search(false);
        assert!(state.filter.query.is_empty());
        assert_eq!(state.visible_indices(), vec![0, 1]);
    }

    #[test]
    fn issue_refresh_stops_at_cap() {
        let mut state = state_with(&[]);
        state.error_count = 3;
        assert!(state.needs_issue_refresh(10));

        state.issues = (0..2)
            .map(|i| ScanIssue {
                path: PathBuf::from(format!("/r/{i}")),
                kind: crate::models::scan_result::ScanIssueKind::PermissionDenied,
                message: String::new(),
            })
            .collect();
        state.error_count = 50;
        assert!(!state.needs_issue_refresh(2));
        assert!(state.needs_issue_refresh(3));
    }
}
