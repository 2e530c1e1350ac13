use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::Config;
use crate::reminders::Alarm;
use crate::tui::widgets::color::{get_contrast_text_color, parse_color};
use crate::tui::widgets::popup::popup_area_with_height;
use crate::utils::{format_due_timestamp, format_key_binding_for_display};

pub fn alert_lines(alarm: &Alarm, waiting: usize, stop_key: &str, sound_playing: bool) -> Vec<String> {
    let mut lines = vec![
        alarm.description.clone(),
        format!("Due: {}", format_due_timestamp(alarm.due)),
        String::new(),
    ];
    if waiting > 0 {
        lines.push(format!("{} more waiting", waiting));
    }
    if sound_playing {
        lines.push(format!("{}: stop sound • Enter: dismiss", format_key_binding_for_display(stop_key)));
    } else {
        lines.push("Enter: dismiss".to_string());
    }
    lines
}

/// The oldest undismissed reminder, drawn over everything else
pub fn render_alert(f: &mut Frame, area: Rect, alerts: &[Alarm], sound_playing: bool, config: &Config) {
    let Some(alarm) = alerts.first() else {
        return;
    };
    let theme = config.get_active_theme();
    let accent = parse_color(&theme.accent);
    let style = Style::default().fg(get_contrast_text_color(accent)).bg(accent);

    let lines: Vec<Line> = alert_lines(alarm, alerts.len() - 1, &config.key_bindings.stop_alarm, sound_playing)
        .into_iter()
        .enumerate()
        .map(|(index, text)| {
            if index == 0 {
                Line::from(Span::styled(text, style.add_modifier(Modifier::BOLD)))
            } else {
                Line::from(Span::styled(text, style))
            }
        })
        .collect();

    let popup = popup_area_with_height(area, 60, lines.len() as u16 + 2);
    f.render_widget(Clear, popup);
    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Task Due!")
                .title_alignment(Alignment::Center)
                .style(style),
        )
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, popup);
}
