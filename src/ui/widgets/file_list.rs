use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, StatefulWidget, Widget},
};
use unicode_width::UnicodeWidthStr;

use crate::models::record::FileStatus;
use crate::models::stats::human_readable_size;

pub struct FileListState {
    pub selected: usize,
    pub offset: usize,
}

pub struct FileList<'a> {
    items: Vec<FileListItem>,
    checked_count: usize,
    block: Option<Block<'a>>,
}

pub struct FileListItem {
    pub name: String,
    pub size: u64,
    pub status: FileStatus,
    pub mime_type: String,
    pub checked: bool,
}

impl<'a> FileList<'a> {
    pub fn new(items: Vec<FileListItem>, checked_count: usize) -> Self {
        Self {
            items,
            checked_count,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = block.into();
        self
    }
}

pub fn status_color(status: FileStatus) -> Color {
    match status {
        FileStatus::Good => Color::Green,
        FileStatus::Damaged => Color::Yellow,
        FileStatus::Corrupted => Color::Red,
    }
}

impl StatefulWidget for FileList<'_> {
    type State = FileListState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let inner = if let Some(block) = &self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };

        if inner.height < 3 || inner.width < 30 {
            return;
        }

        // Columns: "[x] name .... status  type  size"
        let status_w = 10;
        let type_w = 18usize.min(inner.width as usize / 4);
        let size_w = 11;
        let right_w = status_w + type_w + size_w + 2;

        let header = Line::from(Span::styled(
            format!(
                "     {:<name_w$}{:<status_w$}{:<type_w$}{:>size_w$}",
                "Name",
                "Status",
                "Type",
                "Size",
                name_w = (inner.width as usize).saturating_sub(right_w + 5),
            ),
            Style::default().fg(Color::DarkGray),
        ));
        buf.set_line(inner.x, inner.y, &header, inner.width);

        let list_height = (inner.height as usize).saturating_sub(2);
        if list_height == 0 {
            return;
        }

        if state.selected < state.offset {
            state.offset = state.selected;
        }
        if state.selected >= state.offset + list_height {
            state.offset = state.selected - list_height + 1;
        }

        let start = state.offset.min(self.items.len());
        let end = (state.offset + list_height).min(self.items.len());
        for (i, item) in self.items[start..end].iter().enumerate() {
            let row_y = inner.y + 1 + i as u16;
            let is_selected = start + i == state.selected;

            let checkbox = if item.checked { "[x]" } else { "[ ]" };
            let name_max = (inner.width as usize).saturating_sub(right_w + 5);
            let name = truncate(&item.name, name_max);
            let name_pad = name_max.saturating_sub(name.width());
            let mime = truncate(&item.mime_type, type_w.saturating_sub(1));

            let base = if is_selected {
                Style::default()
                    .bg(Color::DarkGray)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };

            let line = Line::from(vec![
                Span::styled(format!(" {} ", checkbox), base),
                Span::styled(format!("{}{:pad$}", name, "", pad = name_pad), base),
                Span::styled(
                    format!(" {:<w$}", item.status.label(), w = status_w - 1),
                    base.fg(status_color(item.status)),
                ),
                Span::styled(format!("{:<w$}", mime, w = type_w), base.fg(Color::Gray)),
                Span::styled(
                    format!("{:>w$}", human_readable_size(item.size), w = size_w),
                    base,
                ),
            ]);
            buf.set_line(inner.x, row_y, &line, inner.width);
        }

        let footer_y = inner.y + inner.height - 1;
        let footer = Line::from(Span::styled(
            format!(" {} files, {} selected", self.items.len(), self.checked_count),
            Style::default().fg(Color::DarkGray),
        ));
        buf.set_line(inner.x, footer_y, &footer, inner.width);
    }
}

fn truncate(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    let target = max_width.saturating_sub(3);
    let mut w = 0;
    let boundary = text
        .char_indices()
        .find(|&(_, c)| {
            w += unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
            w > target
        })
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    format!("{}...", &text[..boundary])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_width() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a_very_long_file_name.txt", 10), "a_very_...");
        assert!(truncate("写真写真写真写真.jpg", 8).width() <= 8);
    }
}
