use chrono::NaiveDateTime;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, List, ListItem, ListState, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState,
    StatefulWidget, Wrap,
};

use crate::Config;
use crate::models::Task;
use crate::tui::widgets::color::{get_contrast_text_color, parse_color};
use crate::utils::truncate_with_ellipsis;

/// "✓ call mom  (June 2nd, 2024 5:00 PM)", cut to `max_width`
pub fn task_line(task: &Task, max_width: usize) -> String {
    let status = if task.completed { "✓" } else { "○" };
    let line = match task.due_label() {
        Some(due) => format!("{} {}  ({})", status, task.description, due),
        None => format!("{} {}", status, task.description),
    };
    truncate_with_ellipsis(&line, max_width)
}

fn is_overdue(task: &Task, now: NaiveDateTime) -> bool {
    !task.completed && task.due_at().is_some_and(|due| due <= now)
}

pub fn render_task_list(
    f: &mut Frame,
    area: Rect,
    tasks: &[Task],
    list_state: &mut ListState,
    config: &Config,
    now: NaiveDateTime,
    focused: bool,
) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let accent = parse_color(&active_theme.accent);
    let highlight_bg = parse_color(&active_theme.highlight_bg);
    let highlight_fg = if active_theme.highlight_fg.is_empty() {
        get_contrast_text_color(highlight_bg)
    } else {
        parse_color(&active_theme.highlight_fg)
    };

    let done = tasks.iter().filter(|task| task.completed).count();
    let title = format!("Tasks ({} of {} done)", done, tasks.len());
    let border_style = if focused {
        Style::default().fg(accent)
    } else {
        Style::default().fg(fg_color)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(border_style);

    if tasks.is_empty() {
        let hint = Paragraph::new(Line::from(Span::styled(
            format!("No tasks yet. Press {} to add one.", config.key_bindings.new_task),
            Style::default().fg(fg_color).add_modifier(Modifier::DIM),
        )))
        .block(block)
        .wrap(Wrap { trim: true });
        f.render_widget(hint, area);
        return;
    }

    let list_areas = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);
    let list_area = list_areas[0];
    let scrollbar_area = list_areas[1];

    let max_width = list_area.width.saturating_sub(2) as usize;
    let items: Vec<ListItem> = tasks
        .iter()
        .map(|task| {
            let style = if task.completed {
                Style::default().fg(fg_color).add_modifier(Modifier::CROSSED_OUT | Modifier::DIM)
            } else if is_overdue(task, now) {
                Style::default().fg(accent).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(fg_color)
            };
            ListItem::new(Line::from(Span::styled(task_line(task, max_width), style)))
        })
        .collect();
    let total_items = items.len();

    let list = List::new(items)
        .block(block)
        .style(Style::default().fg(fg_color))
        .highlight_style(Style::default().fg(highlight_fg).bg(highlight_bg));
    StatefulWidget::render(list, list_area, f.buffer_mut(), list_state);

    let visible_items = list_area.height.saturating_sub(2) as usize;
    if total_items > visible_items && visible_items > 0 {
        let scrollbar_inner_area = Rect::new(
            scrollbar_area.x,
            list_area.y + 1,
            scrollbar_area.width,
            list_area.height.saturating_sub(2),
        );
        let mut scrollbar_state = ScrollbarState::new(total_items)
            .viewport_content_length(visible_items)
            .position(list_state.offset());
        let scrollbar = Scrollbar::default()
            .orientation(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓"))
            .track_symbol(Some("│"))
            .thumb_symbol("█");
        f.render_stateful_widget(scrollbar, scrollbar_inner_area, &mut scrollbar_state);
    }
}
