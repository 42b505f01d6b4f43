use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use crate::ui::app_state::{AppState, ViewMode};
use crate::ui::widgets::file_list::{status_color, FileList, FileListItem, FileListState};
use crate::ui::widgets::help_panel::HelpPanel;
use crate::ui::widgets::progress_bar::ScanProgressBar;
use crate::ui::widgets::status_bar::StatusBar;

pub fn render(frame: &mut Frame, state: &AppState) {
    render_normal(frame, state);
    match state.view_mode {
        ViewMode::Normal | ViewMode::Search => {}
        ViewMode::Help => frame.render_widget(HelpPanel, centered_rect(60, 80, frame.area())),
        ViewMode::ErrorList => render_error_overlay(frame, state),
        ViewMode::Details => render_details_overlay(frame, state),
        ViewMode::Confirm => render_confirm_overlay(frame, state),
    }
}

fn render_normal(frame: &mut Frame, state: &AppState) {
    let area = frame.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // title
            Constraint::Length(5), // progress
            Constraint::Min(6),    // file list
            Constraint::Length(1), // status bar
            Constraint::Length(1), // key hints
        ])
        .split(area);

    render_title(frame, chunks[0], state);

    let progress_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let progress_inner = progress_block.inner(chunks[1]);
    frame.render_widget(progress_block, chunks[1]);
    frame.render_widget(
        ScanProgressBar {
            state: state.scan_state,
            percent: state.percent,
            files_seen: state.files_seen,
            records: state.records.len(),
            speed: state.scan_speed,
            status: &state.status_text,
            current_path: &state.current_scanning_path,
        },
        progress_inner,
    );

    let visible = state.visible_indices();
    let items: Vec<FileListItem> = visible
        .iter()
        .filter_map(|&i| state.records.get(i).map(|r| (i, r)))
        .map(|(i, r)| FileListItem {
            name: r.name.to_string(),
            size: r.size_bytes,
            status: r.status,
            mime_type: r.mime_type.to_string(),
            checked: state.checked.contains(&i),
        })
        .collect();

    let mut title = String::from(" Files ");
    if let Some(folder) = &state.filter.folder {
        title = format!(" Files in {} ", folder.display());
    }
    if let Some(status) = state.filter.status {
        title.push_str(&format!("[{}] ", status));
    }
    if state.view_mode == ViewMode::Search {
        title.push_str(&format!("/{}_ ", state.filter.query));
    } else if !state.filter.query.is_empty() {
        title.push_str(&format!("\"{}\" ", state.filter.query));
    }

    let file_list = FileList::new(items, state.checked.len()).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    let mut list_state = FileListState {
        selected: state.selected_index,
        offset: state.list_offset,
    };
    frame.render_stateful_widget(file_list, chunks[2], &mut list_state);

    let status = StatusBar {
        stats: &state.stats,
        error_count: state.error_count,
        layout_label: state.layout.label(),
        recovery: state.recovery_progress,
        message: state.message.as_deref(),
    };
    frame.render_widget(status, chunks[3]);

    let hint = |key: &'static str, desc: &'static str| {
        [
            Span::styled(key, Style::default().fg(Color::Yellow)),
            Span::styled(desc, Style::default().fg(Color::DarkGray)),
        ]
    };
    let mut spans = Vec::new();
    for (key, desc) in [
        (" p", ": Pause  "),
        ("c", ": Cancel  "),
        ("Space", ": Select  "),
        ("f", ": Folder  "),
        ("/", ": Search  "),
        ("R", ": Recover  "),
        ("s", ": Save  "),
        ("x", ": Export  "),
        ("?", ": Help  "),
        ("q", ": Quit"),
    ] {
        spans.extend(hint(key, desc));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), chunks[4]);
}

fn render_title(frame: &mut Frame, area: Rect, state: &AppState) {
    let title = Paragraph::new(Line::from(vec![
        Span::styled(
            " FileRescue ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            state.root_path.display().to_string(),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("  [{}]  {:?}", state.category, state.scan_state),
            Style::default().fg(Color::DarkGray),
        ),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    frame.render_widget(title, area);
}

fn render_error_overlay(frame: &mut Frame, state: &AppState) {
    let area = centered_rect(70, 60, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(Span::styled(
            format!(" {} errors found ", state.error_count),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];

    for (i, issue) in state.issues.iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(format!("  {}. ", i + 1), Style::default().fg(Color::DarkGray)),
            Span::styled(format!("[{:?}] ", issue.kind), Style::default().fg(Color::Yellow)),
            Span::styled(
                issue.path.display().to_string(),
                Style::default().fg(Color::White),
            ),
        ]));
        lines.push(Line::from(vec![
            Span::raw("     "),
            Span::styled(issue.message.as_str(), Style::default().fg(Color::DarkGray)),
        ]));
    }

    if state.issues.is_empty() {
        lines.push(Line::from(Span::styled(
            "  No errors.",
            Style::default().fg(Color::Green),
        )));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  Press e or Esc to close",
        Style::default().fg(Color::DarkGray),
    )));

    let panel = Paragraph::new(lines)
        .block(
            Block::default()
                .title(" Errors ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        )
        .style(Style::default().bg(Color::Black))
        .wrap(Wrap { trim: false });
    frame.render_widget(panel, area);
}

fn render_details_overlay(frame: &mut Frame, state: &AppState) {
    let area = centered_rect(70, 50, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = Vec::new();
    if let Some(record) = state.highlighted_record() {
        lines.push(Line::from(vec![
            Span::styled(
                format!(" {} ", record.name),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                record.status.label(),
                Style::default().fg(status_color(record.status)),
            ),
        ]));
        lines.push(Line::from(format!("   Type: {}", record.mime_type)));
        lines.push(Line::from(""));
    }
    if let Some(details) = &state.details {
        for (label, value) in details.lines() {
            lines.push(Line::from(vec![
                Span::styled(format!("   {:<11}", label), Style::default().fg(Color::Green)),
                Span::raw(value),
            ]));
        }
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  Press Enter or Esc to close",
        Style::default().fg(Color::DarkGray),
    )));

    let panel = Paragraph::new(lines)
        .block(
            Block::default()
                .title(" Details ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .style(Style::default().bg(Color::Black))
        .wrap(Wrap { trim: false });
    frame.render_widget(panel, area);
}

fn render_confirm_overlay(frame: &mut Frame, state: &AppState) {
    let Some(prompt) = &state.confirm else {
        return;
    };
    let area = centered_rect(50, 20, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::raw(format!("  File {} appears to be ", prompt.name)),
            Span::styled(
                prompt.status.label().to_lowercase(),
                Style::default().fg(status_color(prompt.status)),
            ),
            Span::raw("."),
        ]),
        Line::from("  Attempt recovery anyway?"),
        Line::from(""),
        Line::from(vec![
            Span::styled("  y", Style::default().fg(Color::Yellow)),
            Span::styled(": Yes  ", Style::default().fg(Color::DarkGray)),
            Span::styled("n", Style::default().fg(Color::Yellow)),
            Span::styled(": No", Style::default().fg(Color::DarkGray)),
        ]),
    ];

    let panel = Paragraph::new(lines)
        .block(
            Block::default()
                .title(" Warning ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        )
        .style(Style::default().bg(Color::Black))
        .wrap(Wrap { trim: false });
    frame.render_widget(panel, area);
}

/// Helper to create a centered rectangle within a given area
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
