use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::Event;
use crossterm::execute;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc;

use crate::config::settings::Settings;
use crate::core::control::JobGate;
use crate::core::details::FileDetails;
use crate::core::events;
use crate::core::recovery::{Confirm, Layout, RecoveryEngine};
use crate::core::scanner::ScanEngine;
use crate::core::session::SessionStore;
use crate::models::category::Category;
use crate::models::record::FileStatus;
use crate::models::scan_result::ScanState;
use crate::models::stats::human_duration;
use crate::ui::app_state::{AppState, ConfirmPrompt, LayoutChoice};
use crate::ui::input::{self, InputAction};
use crate::ui::renderer;

/// A question from the recovery worker and the channel to answer it on.
type ConfirmRequest = (ConfirmPrompt, std::sync::mpsc::Sender<bool>);

pub struct App {
    state: AppState,
    settings: Settings,
    sessions: SessionStore,
}

struct Jobs {
    scan: ScanEngine,
    recovery: RecoveryEngine,
    confirm_tx: mpsc::UnboundedSender<ConfirmRequest>,
    pending_reply: Option<std::sync::mpsc::Sender<bool>>,
}

impl App {
    pub fn new(root_path: PathBuf, category: Category, settings: Settings) -> Self {
        Self {
            state: AppState::new(root_path, category),
            sessions: SessionStore::new(settings.sessions_dir()),
            settings,
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        let (event_tx, event_rx) = events::create_event_channel();
        let gate = JobGate::new();
        let scan = ScanEngine::with_gate(self.settings.clone(), event_tx.clone(), gate.clone());
        let recovery = RecoveryEngine::new(event_tx, gate);

        // Reject a bad root before the terminal is taken over.
        scan.start(self.state.root_path.clone(), self.state.category)?;

        terminal::enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let (confirm_tx, confirm_rx) = mpsc::unbounded_channel();
        let mut jobs = Jobs {
            scan,
            recovery,
            confirm_tx,
            pending_reply: None,
        };

        let result = self
            .event_loop(&mut terminal, event_rx, confirm_rx, &mut jobs)
            .await;

        jobs.scan.cancel();

        terminal::disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
        mut event_rx: events::EventReceiver,
        mut confirm_rx: mpsc::UnboundedReceiver<ConfirmRequest>,
        jobs: &mut Jobs,
    ) -> anyhow::Result<()> {
        // Dedicated blocking thread for terminal input, forwarded over a channel.
        let (input_tx, mut input_rx) = mpsc::unbounded_channel::<Event>();
        let _input_thread = tokio::task::spawn_blocking(move || loop {
            match input::poll_event(Duration::from_millis(50)) {
                Ok(Some(event)) => {
                    if input_tx.send(event).is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(_) => break,
            }
        });

        let mut tick_interval = tokio::time::interval(Duration::from_millis(100));

        loop {
            terminal.draw(|frame| {
                renderer::render(frame, &self.state);
            })?;

            tokio::select! {
                input_event = input_rx.recv() => {
                    match input_event {
                        Some(Event::Key(key)) => {
                            let action = input::handle_key_event(key, &mut self.state);
                            if action == InputAction::Quit {
                                return Ok(());
                            }
                            self.handle_action(action, jobs).await;
                        }
                        Some(_) => {}
                        None => return Ok(()),
                    }
                }
                app_event = event_rx.recv() => {
                    if let Some(event) = app_event {
                        self.handle_event(event, jobs);
                    }
                }
                request = confirm_rx.recv() => {
                    if let Some((prompt, reply)) = request {
                        self.state.ask(prompt);
                        jobs.pending_reply = Some(reply);
                    }
                }
                _ = tick_interval.tick() => {
                    self.sync_scan(&jobs.scan);
                }
            }

            if self.state.should_quit {
                return Ok(());
            }
        }
    }

    /// Pull new records, statistics and progress from the engine.
    fn sync_scan(&mut self, scan: &ScanEngine) {
        let state = scan.state();
        if state == ScanState::Idle && self.state.scan_state == ScanState::Idle {
            return;
        }
        let fresh = scan.records_since(self.state.records.len());
        if !fresh.is_empty() {
            self.state.append_records(fresh);
        }
        self.state.stats = scan.stats();
        self.state.scan_state = state;
        self.state.update_progress(&scan.progress());
        if self.state.needs_issue_refresh(scan.settings().max_issues) {
            self.state.issues = scan.issues();
        }
    }

    fn handle_event(&mut self, event: events::Event, jobs: &mut Jobs) {
        match event {
            events::Event::ScanFinished {
                state, total_files, ..
            } => {
                self.sync_scan(&jobs.scan);
                let took = self
                    .state
                    .stats
                    .duration()
                    .map(human_duration)
                    .unwrap_or_default();
                self.state.message = Some(match state {
                    ScanState::Completed => {
                        format!("Scan completed: {} files in {}", total_files, took)
                    }
                    ScanState::Cancelled => format!("Scan cancelled after {} files", total_files),
                    _ => self.state.status_text.clone(),
                });
            }
            events::Event::ScanPaused | events::Event::ScanResumed => {
                self.state.scan_state = jobs.scan.state();
            }
            events::Event::RecoveryProgress { completed, total } => {
                self.state.recovery_progress = Some((completed, total));
            }
            events::Event::RecoveryFinished { succeeded, failed } => {
                self.state.recovery_progress = None;
                self.state.message = Some(format!(
                    "Recovery completed: {} succeeded, {} failed",
                    succeeded, failed
                ));
            }
            _ => {}
        }
    }

    async fn handle_action(&mut self, action: InputAction, jobs: &mut Jobs) {
        match action {
            InputAction::TogglePause => {
                let result = match jobs.scan.state() {
                    ScanState::Paused => jobs.scan.resume(),
                    _ => jobs.scan.pause(),
                };
                if let Err(e) = result {
                    self.state.message = Some(e.to_string());
                }
                self.state.scan_state = jobs.scan.state();
            }
            InputAction::Cancel => jobs.scan.cancel(),
            InputAction::SaveSession => self.save_session(&jobs.scan).await,
            InputAction::LoadSession => self.load_session(&jobs.scan).await,
            InputAction::ExportList => self.export_list(),
            InputAction::Recover => self.start_recovery(jobs),
            InputAction::ShowDetails => {
                if let Some(record) = self.state.highlighted_record() {
                    let path = record.path.clone();
                    match tokio::task::spawn_blocking(move || FileDetails::inspect(&path)).await {
                        Ok(details) => self.state.show_details(details),
                        Err(e) => tracing::error!("Details task failed: {}", e),
                    }
                }
            }
            InputAction::Answer(yes) => {
                if let Some(reply) = jobs.pending_reply.take() {
                    let _ = reply.send(yes);
                }
                self.state.answer();
            }
            InputAction::None | InputAction::Quit => {}
        }
    }

    async fn save_session(&mut self, scan: &ScanEngine) {
        if scan.state().is_active() {
            self.state.message = Some("Finish or cancel the scan before saving".into());
            return;
        }
        let Some(snapshot) = scan.snapshot() else {
            self.state.message = Some("Nothing to save yet".into());
            return;
        };
        self.state.message = Some(match self.sessions.save(&snapshot).await {
            Ok(path) => format!("Session saved to {}", path.display()),
            Err(e) => {
                tracing::error!("Session save failed: {}", e);
                format!("Save failed: {}", e)
            }
        });
    }

    async fn load_session(&mut self, scan: &ScanEngine) {
        let Some(snapshot) = self.sessions.load(&self.state.root_path).await else {
            self.state.message = Some("No saved session for this folder".into());
            return;
        };
        let records = snapshot.files.clone();
        let stats = snapshot.stats.clone();
        match scan.restore(snapshot) {
            Ok(()) => {
                let count = records.len();
                self.state.replace_records(records, stats);
                self.state.scan_state = scan.state();
                self.state.message = Some(format!("Loaded {} files from session", count));
            }
            Err(e) => self.state.message = Some(e.to_string()),
        }
    }

    fn export_list(&mut self) {
        let path = PathBuf::from(format!(
            "filerescue_files_{}.csv",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        ));
        let result = if self.state.checked.is_empty() {
            crate::export::list::export_list(&self.state.records, &path)
        } else {
            crate::export::list::export_list(&self.state.checked_records(), &path)
        };
        self.state.message = Some(match result {
            Ok(rows) => {
                tracing::info!("Exported {} rows to: {}", rows, path.display());
                format!("Exported {} files to {}", rows, path.display())
            }
            Err(e) => {
                tracing::error!("Export failed: {}", e);
                format!("Export failed: {}", e)
            }
        });
    }

    fn start_recovery(&mut self, jobs: &mut Jobs) {
        let records = self.state.checked_records();
        if records.is_empty() {
            self.state.message = Some("Select files to recover first (Space)".into());
            return;
        }

        let destination = self.settings.recovery_folder.clone();
        if let Err(e) = std::fs::create_dir_all(&destination) {
            tracing::warn!("Cannot create {}: {}", destination.display(), e);
        }
        let layout = match self.state.layout {
            LayoutChoice::Flat => Layout::Flat,
            LayoutChoice::Structured => Layout::Structured {
                scan_root: self.state.root_path.clone(),
            },
            LayoutChoice::Metadata => Layout::FlatWithMetadata,
        };

        let tx = jobs.confirm_tx.clone();
        let confirm: Arc<dyn Confirm> = Arc::new(move |name: &str, status: FileStatus| {
            let (reply_tx, reply_rx) = std::sync::mpsc::channel();
            let prompt = ConfirmPrompt {
                name: name.to_string(),
                status,
            };
            if tx.send((prompt, reply_tx)).is_err() {
                return false;
            }
            reply_rx.recv().unwrap_or(false)
        });

        let total = records.len();
        match jobs.recovery.spawn(records, destination.clone(), layout, confirm) {
            Ok(_handle) => {
                self.state.recovery_progress = Some((0, total));
                self.state.message = Some(format!(
                    "Recovering {} files to {}",
                    total,
                    destination.display()
                ));
            }
            Err(e) => self.state.message = Some(e.to_string()),
        }
    }
}
