use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::widgets::Paragraph;

use crate::Config;
use crate::tui::widgets::color::{get_contrast_text_color, parse_color};
use crate::utils::truncate_with_ellipsis;

const SEPARATOR: &str = " • ";
const ELLIPSIS: &str = "...";

/// One status line: the current message if there is one, otherwise as many
/// key hints as fit.
pub fn render_status_bar(f: &mut Frame, area: Rect, message: Option<&str>, key_hints: &[String], config: &Config) {
    let active_theme = config.get_active_theme();
    let max_width = area.width as usize;

    let (content, style) = match message {
        Some(message) => {
            let highlight_bg = parse_color(&active_theme.highlight_bg);
            let style = Style::default()
                .fg(get_contrast_text_color(highlight_bg))
                .bg(highlight_bg)
                .add_modifier(Modifier::BOLD);
            (truncate_with_ellipsis(message, max_width), style)
        }
        None => {
            let style = Style::default()
                .fg(parse_color(&active_theme.fg))
                .bg(parse_color(&active_theme.bg));
            (fit_hints(key_hints, max_width), style)
        }
    };

    f.render_widget(Paragraph::new(content).style(style), area);
}

/// Join hints with bullets, stopping with "..." at the first one that
/// doesn't fit
pub fn fit_hints(hints: &[String], max_width: usize) -> String {
    let mut text = String::new();
    for hint in hints {
        let candidate = if text.is_empty() {
            hint.clone()
        } else {
            format!("{}{}{}", text, SEPARATOR, hint)
        };
        if candidate.chars().count() > max_width {
            if text.is_empty() {
                return truncate_with_ellipsis(hint, max_width);
            }
            if text.chars().count() + ELLIPSIS.len() <= max_width {
                text.push_str(ELLIPSIS);
            } else {
                text = truncate_with_ellipsis(&text, max_width);
            }
            return text;
        }
        text = candidate;
    }
    text
}
