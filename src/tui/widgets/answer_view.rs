use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout as RatLayout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap};
use ratskin::RatSkin;
use std::cmp;
use termimad::minimad::Text as MinimadText;

use crate::Config;
use crate::tui::app::Answer;
use crate::tui::widgets::color::parse_color;

/// Markdown shown for an answer: the question quoted, then the reply
pub fn answer_markdown(answer: &Answer) -> String {
    format!("> {}\n\n{}\n", answer.question.trim(), answer.text.trim())
}

/// Render markdown to ratatui lines wrapped at `width`
fn markdown_lines(markdown: &str, width: u16) -> Vec<Line<'static>> {
    RatSkin::default()
        .parse(MinimadText::from(markdown), width)
        .into_iter()
        .map(|line| {
            let spans: Vec<Span<'static>> = line
                .spans
                .into_iter()
                .map(|span| Span::styled(span.content.to_string(), span.style))
                .collect();
            Line::from(spans)
        })
        .collect()
}

pub fn render_answer_view(
    f: &mut Frame,
    area: Rect,
    answer: Option<&Answer>,
    listening: bool,
    config: &Config,
    scroll_offset: usize,
) {
    if area.width < 3 || area.height < 3 {
        return;
    }
    let theme = config.get_active_theme();
    let base_style = Style::default().fg(parse_color(&theme.fg));
    let block = Block::default().borders(Borders::ALL).title("Answer");

    let Some(answer) = answer else {
        let hint = if listening {
            "Listening for your question...".to_string()
        } else {
            format!(
                "Press {} and ask something like \"what's due tomorrow?\"",
                config.key_bindings.ask
            )
        };
        let paragraph = Paragraph::new(Line::from(Span::styled(hint, base_style.add_modifier(Modifier::DIM))))
            .block(block)
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
        return;
    };

    let horizontal = RatLayout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);
    let content_area = horizontal[0];
    let scrollbar_area = horizontal[1];

    let viewport_height = area.height.saturating_sub(2) as usize;
    let text_width = content_area.width.saturating_sub(2);
    let lines = markdown_lines(&answer_markdown(answer), text_width);

    let total_lines = lines.len();
    let max_scroll = total_lines.saturating_sub(viewport_height);
    let scroll_offset = cmp::min(scroll_offset, max_scroll);
    let end_line = cmp::min(scroll_offset + viewport_height, total_lines);
    let visible = Text::from(lines[scroll_offset..end_line].to_vec());

    // trim: false keeps list indentation
    let paragraph = Paragraph::new(visible)
        .block(block)
        .style(base_style)
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, content_area);

    if total_lines > viewport_height {
        let scrollbar_inner_area = Rect::new(
            scrollbar_area.x,
            content_area.y + 1,
            scrollbar_area.width,
            content_area.height.saturating_sub(2),
        );
        let mut scrollbar_state = ScrollbarState::new(total_lines)
            .viewport_content_length(viewport_height)
            .position(scroll_offset);
        let scrollbar = Scrollbar::default()
            .orientation(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓"))
            .track_symbol(Some("│"))
            .thumb_symbol("█");
        f.render_stateful_widget(scrollbar, scrollbar_inner_area, &mut scrollbar_state);
    }
}
