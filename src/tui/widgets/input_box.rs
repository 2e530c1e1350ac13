use ratatui::Frame;
use ratatui::layout::{Position, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::config::Theme;
use crate::tui::widgets::color::parse_color;
use crate::tui::widgets::editor::LineEditor;

pub struct InputBox<'a> {
    pub title: &'a str,
    pub placeholder: &'a str,
    pub focused: bool,
    /// Show bullets instead of the text
    pub masked: bool,
}

impl<'a> InputBox<'a> {
    pub fn new(title: &'a str) -> Self {
        Self {
            title,
            placeholder: "",
            focused: false,
            masked: false,
        }
    }

    pub fn placeholder(mut self, placeholder: &'a str) -> Self {
        self.placeholder = placeholder;
        self
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    pub fn masked(mut self, masked: bool) -> Self {
        self.masked = masked;
        self
    }

    /// Draw `editor` into `area` (borders included). When focused the
    /// terminal cursor is placed at the edit position.
    pub fn render(self, f: &mut Frame, area: Rect, editor: &mut LineEditor, theme: &Theme) {
        let fg = parse_color(&theme.fg);
        let bg = parse_color(&theme.bg);
        let accent = parse_color(&theme.accent);
        let border_style = if self.focused {
            Style::default().fg(accent).bg(bg)
        } else {
            Style::default().fg(fg).bg(bg)
        };

        let inner_width = area.width.saturating_sub(2) as usize;
        editor.update_scroll(inner_width);

        let line = if editor.text().is_empty() && !self.focused {
            Line::from(Span::styled(
                self.placeholder.to_string(),
                Style::default().fg(fg).add_modifier(Modifier::DIM),
            ))
        } else if self.masked {
            let shown = editor.visible_text(inner_width).chars().count();
            Line::from("•".repeat(shown))
        } else {
            Line::from(editor.visible_text(inner_width))
        };

        let paragraph = Paragraph::new(line).style(Style::default().fg(fg).bg(bg)).block(
            Block::default()
                .borders(Borders::ALL)
                .title(self.title)
                .border_style(border_style),
        );
        f.render_widget(paragraph, area);

        if self.focused && area.width > 2 && area.height > 2 {
            let x = area.x + 1 + editor.visible_cursor().min(inner_width.saturating_sub(1)) as u16;
            f.set_cursor_position(Position::new(x, area.y + 1));
        }
    }
}
