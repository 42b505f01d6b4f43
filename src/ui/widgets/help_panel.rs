use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};

pub struct HelpPanel;

impl Widget for HelpPanel {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Clear.render(area, buf);

        let help_text = vec![
            Line::from(Span::styled(
                " FileRescue - Keyboard Shortcuts ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            section("  Scan"),
            help_line("    p           ", "Pause / resume"),
            help_line("    c           ", "Cancel scan"),
            help_line("    e           ", "Show error list"),
            Line::from(""),
            section("  Results"),
            help_line("    j / Down    ", "Move down"),
            help_line("    k / Up      ", "Move up"),
            help_line("    gg / G      ", "First / last file"),
            help_line("    Space       ", "Select file"),
            help_line("    a           ", "Select all / none"),
            help_line("    f           ", "Filter by folder of highlighted file"),
            help_line("    t           ", "Cycle status filter"),
            help_line("    /           ", "Search by name (Enter keeps, Esc clears)"),
            help_line("    Enter / i   ", "File details"),
            Line::from(""),
            section("  Actions"),
            help_line("    R           ", "Recover selected files"),
            help_line("    m           ", "Cycle recovery layout"),
            help_line("    s / l       ", "Save / load session"),
            help_line("    x           ", "Export file list (CSV)"),
            Line::from(""),
            help_line("    ?           ", "Toggle this help"),
            help_line("    q / Ctrl+C  ", "Quit"),
            Line::from(""),
            Line::from(Span::styled(
                "  Press ? or Esc to close",
                Style::default().fg(Color::DarkGray),
            )),
        ];

        let help = Paragraph::new(help_text)
            .block(
                Block::default()
                    .title(" Help ")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .style(Style::default().bg(Color::Black));
        help.render(area, buf);
    }
}

fn section(title: &str) -> Line<'_> {
    Line::from(Span::styled(
        title,
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    ))
}

fn help_line<'a>(key: &'a str, desc: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::styled(key, Style::default().fg(Color::Green)),
        Span::raw(desc),
    ])
}
