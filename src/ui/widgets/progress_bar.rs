use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::models::scan_result::ScanState;
use crate::models::stats::format_count;

pub struct ScanProgressBar<'a> {
    pub state: ScanState,
    pub percent: f64,
    pub files_seen: u64,
    pub records: usize,
    pub speed: f64,
    pub status: &'a str,
    pub current_path: &'a str,
}

impl Widget for ScanProgressBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 2 || area.width < 20 {
            return;
        }

        // Line 1: bar + percentage
        let label = format!(" {:>5.1}% ", self.percent);
        let bar_width = (area.width as usize).saturating_sub(label.len() + 2);
        let filled = ((self.percent.clamp(0.0, 100.0) / 100.0) * bar_width as f64).round() as usize;
        let bar_color = match self.state {
            ScanState::Paused => Color::Yellow,
            ScanState::Failed => Color::Red,
            ScanState::Cancelled => Color::DarkGray,
            _ => Color::Cyan,
        };
        let bar_line = Line::from(vec![
            Span::styled("[", Style::default().fg(Color::DarkGray)),
            Span::styled("=".repeat(filled), Style::default().fg(bar_color)),
            Span::raw(" ".repeat(bar_width - filled)),
            Span::styled("]", Style::default().fg(Color::DarkGray)),
            Span::styled(label, Style::default().fg(Color::White)),
        ]);
        buf.set_line(area.x, area.y, &bar_line, area.width);

        // Line 2: status and counters
        let stats_line = Line::from(vec![
            Span::styled(format!("{} ", self.status), Style::default().fg(bar_color)),
            Span::styled(
                format!(
                    "| Seen: {} | Recorded: {} | Speed: {:.0}/s",
                    format_count(self.files_seen),
                    format_count(self.records as u64),
                    self.speed,
                ),
                Style::default().fg(Color::White),
            ),
        ]);
        buf.set_line(area.x, area.y + 1, &stats_line, area.width);

        // Line 3: current directory while the worker is alive
        if area.height >= 3 && self.state.is_active() {
            let path_display =
                truncate_path(self.current_path, (area.width as usize).saturating_sub(10));
            let path_line = Line::from(vec![
                Span::styled("Current: ", Style::default().fg(Color::DarkGray)),
                Span::styled(path_display, Style::default().fg(Color::DarkGray)),
            ]);
            buf.set_line(area.x, area.y + 2, &path_line, area.width);
        }
    }
}

/// Keep the head and tail of a long path.
fn truncate_path(path: &str, max_width: usize) -> String {
    use unicode_width::UnicodeWidthStr;
    if path.width() <= max_width {
        return path.to_string();
    }
    if max_width < 6 {
        return "...".to_string();
    }
    let keep = max_width - 3;
    let tail_len = keep / 2;
    let head_len = keep - tail_len;

    let mut w = 0;
    let head_end = path
        .char_indices()
        .find(|&(_, c)| {
            w += unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
            w > head_len
        })
        .map(|(i, _)| i)
        .unwrap_or(path.len());

    w = 0;
    let tail_start = path
        .char_indices()
        .rev()
        .find(|&(_, c)| {
            w += unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
            w > tail_len
        })
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);

    format!("{}...{}", &path[..head_end], &path[tail_start..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_paths_keep_both_ends() {
        let path = "/home/user/Pictures/holiday/2019/beach/sunset.jpg";
        let short = truncate_path(path, 20);
        assert!(short.starts_with("/home/u"));
        assert!(short.ends_with("set.jpg"));
        assert!(short.contains("..."));
        assert_eq!(truncate_path("/tmp", 20), "/tmp");
    }
}
