use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use std::time::Duration;

use crate::ui::app_state::{AppState, ViewMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    None,
    Quit,
    TogglePause,
    Cancel,
    SaveSession,
    LoadSession,
    ExportList,
    Recover,
    ShowDetails,
    Answer(bool),
}

pub fn handle_key_event(key: KeyEvent, state: &mut AppState) -> InputAction {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        state.should_quit = true;
        return InputAction::Quit;
    }

    match state.view_mode {
        ViewMode::Normal => handle_normal_mode(key, state),
        ViewMode::Help => handle_help_mode(key, state),
        ViewMode::ErrorList => handle_error_list_mode(key, state),
        ViewMode::Details => handle_details_mode(key, state),
        ViewMode::Confirm => handle_confirm_mode(key),
        ViewMode::Search => handle_search_mode(key, state),
    }
}

fn handle_normal_mode(key: KeyEvent, state: &mut AppState) -> InputAction {
    state.message = None;

    // 'gg' jumps to the top
    if state.pending_g {
        state.pending_g = false;
        if key.code == KeyCode::Char('g') {
            state.go_to_first();
            return InputAction::None;
        }
    }

    match key.code {
        KeyCode::Char('q') => {
            state.should_quit = true;
            InputAction::Quit
        }
        KeyCode::Char('j') | KeyCode::Down => {
            state.move_down();
            InputAction::None
        }
        KeyCode::Char('k') | KeyCode::Up => {
            state.move_up();
            InputAction::None
        }
        KeyCode::Char('g') => {
            state.pending_g = true;
            InputAction::None
        }
        KeyCode::Char('G') => {
            state.go_to_last();
            InputAction::None
        }
        KeyCode::Char(' ') => {
            state.toggle_checked();
            InputAction::None
        }
        KeyCode::Char('a') => {
            state.toggle_all();
            InputAction::None
        }
        KeyCode::Char('f') => {
            state.toggle_folder_filter();
            InputAction::None
        }
        KeyCode::Char('t') => {
            state.cycle_status_filter();
            InputAction::None
        }
        KeyCode::Char('/') => {
            state.begin_search();
            InputAction::None
        }
        KeyCode::Char('m') => {
            state.cycle_layout();
            InputAction::None
        }
        KeyCode::Char('e') => {
            state.toggle_error_list();
            InputAction::None
        }
        KeyCode::Char('?') => {
            state.toggle_help();
            InputAction::None
        }
        KeyCode::Char('p') => InputAction::TogglePause,
        KeyCode::Char('c') => InputAction::Cancel,
        KeyCode::Char('s') => InputAction::SaveSession,
        KeyCode::Char('l') => InputAction::LoadSession,
        KeyCode::Char('x') => InputAction::ExportList,
        KeyCode::Char('R') => InputAction::Recover,
        KeyCode::Enter | KeyCode::Char('i') => InputAction::ShowDetails,
        _ => InputAction::None,
    }
}

fn handle_help_mode(key: KeyEvent, state: &mut AppState) -> InputAction {
    if matches!(key.code, KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q')) {
        state.toggle_help();
    }
    InputAction::None
}

fn handle_error_list_mode(key: KeyEvent, state: &mut AppState) -> InputAction {
    if matches!(key.code, KeyCode::Char('e') | KeyCode::Esc | KeyCode::Char('q')) {
        state.toggle_error_list();
    }
    InputAction::None
}

fn handle_details_mode(key: KeyEvent, state: &mut AppState) -> InputAction {
    if matches!(
        key.code,
        KeyCode::Enter | KeyCode::Char('i') | KeyCode::Esc | KeyCode::Char('q')
    ) {
        state.close_overlay();
    }
    InputAction::None
}

/// Typing edits the name query live; Enter keeps it, Esc drops it.
fn handle_search_mode(key: KeyEvent, state: &mut AppState) -> InputAction {
    match key.code {
        KeyCode::Enter => state.end_search(true),
        KeyCode::Esc => state.end_search(false),
        KeyCode::Backspace => state.pop_search_char(),
        KeyCode::Char(c) => state.push_search_char(c),
        _ => {}
    }
    InputAction::None
}

fn handle_confirm_mode(key: KeyEvent) -> InputAction {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => InputAction::Answer(true),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => InputAction::Answer(false),
        _ => InputAction::None,
    }
}

pub fn poll_event(timeout: Duration) -> anyhow::Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::category::Category;
    use crate::models::record::FileStatus;
    use crate::ui::app_state::ConfirmPrompt;
    use std::path::PathBuf;

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    #[test]
    fn confirm_mode_only_takes_answers() {
        let mut state = AppState::new(PathBuf::from("/"), Category::All);
        state.ask(ConfirmPrompt {
            name: "a.pdf".into(),
            status: FileStatus::Damaged,
        });
        assert_eq!(handle_key_event(key('q'), &mut state), InputAction::None);
        assert_eq!(handle_key_event(key('y'), &mut state), InputAction::Answer(true));
        assert_eq!(handle_key_event(key('n'), &mut state), InputAction::Answer(false));
    }

    #[test]
    fn normal_mode_commands() {
        let mut state = AppState::new(PathBuf::from("/"), Category::All);
        assert_eq!(handle_key_event(key('p'), &mut state), InputAction::TogglePause);
        assert_eq!(handle_key_event(key('R'), &mut state), InputAction::Recover);
        assert_eq!(handle_key_event(key('q'), &mut state), InputAction::Quit);
        assert!(state.should_quit);
    }

    #[test]
    fn search_mode_captures_letters() {
        let mut state = AppState::new(PathBuf::from("/"), Category::All);
        handle_key_event(key('/'), &mut state);
        assert_eq!(state.view_mode, ViewMode::Search);
        assert_eq!(handle_key_event(key('q'), &mut state), InputAction::None);
        assert_eq!(handle_key_event(key('p'), &mut state), InputAction::None);
        assert_eq!(state.filter.query, "qp");
        assert!(!state.should_quit);

        handle_key_event(KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE), &mut state);
        handle_key_event(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE), &mut state);
        assert_eq!(state.view_mode, ViewMode::Normal);
        assert_eq!(state.filter.query, "q");
    }
}
