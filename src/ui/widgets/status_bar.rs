use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::models::stats::{format_count, human_readable_size, ScanStatistics};

pub struct StatusBar<'a> {
    pub stats: &'a ScanStatistics,
    pub error_count: u64,
    pub layout_label: &'a str,
    pub recovery: Option<(usize, usize)>,
    pub message: Option<&'a str>,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 1 || area.width < 10 {
            return;
        }

        if let Some(msg) = self.message {
            let line = Line::from(Span::styled(
                format!(" {}", msg),
                Style::default().fg(Color::Green),
            ));
            buf.set_line(area.x, area.y, &line, area.width);
            return;
        }

        let mut spans = Vec::new();

        if self.error_count > 0 {
            spans.push(Span::styled(
                format!(" ! {} errors (press 'e' to view) ", self.error_count),
                Style::default().fg(Color::Red),
            ));
            spans.push(Span::styled(" | ", Style::default().fg(Color::DarkGray)));
        }

        spans.push(Span::styled(
            format!(" Files: {}", format_count(self.stats.total_files)),
            Style::default().fg(Color::White),
        ));
        spans.push(Span::styled(
            format!("  Recoverable: {}", format_count(self.stats.recoverable_count)),
            Style::default().fg(Color::Green),
        ));
        spans.push(Span::styled(
            format!("  Damaged: {}", format_count(self.stats.damaged_count)),
            Style::default().fg(Color::Yellow),
        ));
        spans.push(Span::styled(
            format!("  ({})", human_readable_size(self.stats.scanned_bytes)),
            Style::default().fg(Color::DarkGray),
        ));

        let right = match self.recovery {
            Some((done, total)) => format!("Recovering {}/{} ", done, total),
            None => format!("Layout: {} ", self.layout_label),
        };
        let left_len: usize = spans.iter().map(|s| s.content.len()).sum();
        let padding = (area.width as usize).saturating_sub(left_len + right.len());
        spans.push(Span::raw(format!("{:pad$}", "", pad = padding)));
        spans.push(Span::styled(right, Style::default().fg(Color::DarkGray)));

        let line = Line::from(spans);
        buf.set_line(area.x, area.y, &line, area.width);
    }
}
