use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::Config;
use crate::tui::widgets::color::parse_color;
use crate::tui::widgets::popup::popup_area;
use crate::utils::format_key_binding_for_display as key;

pub fn render_help(f: &mut Frame, area: Rect, config: &Config) {
    let active_theme = config.get_active_theme();
    let style = Style::default()
        .fg(parse_color(&active_theme.fg))
        .bg(parse_color(&active_theme.bg));

    let popup_area = popup_area(area, 60, 80);
    f.render_widget(Clear, popup_area);

    let paragraph = Paragraph::new(build_help_text(config))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Help - Key Bindings")
                .title_alignment(Alignment::Center)
                .style(style),
        )
        .style(style)
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, popup_area);
}

pub fn build_help_text(config: &Config) -> String {
    let keys = &config.key_bindings;
    let mut text = String::new();

    text.push_str("Tasks:\n");
    text.push_str(&format!("  {} / {}: Move up/down\n", key(&keys.list_up), key(&keys.list_down)));
    text.push_str(&format!("  {}: New task (\"call mom tomorrow at 5pm\")\n", key(&keys.new_task)));
    text.push_str(&format!("  {}: Mark done / not done\n", key(&keys.toggle_complete)));
    text.push_str(&format!("  {}: Edit description and due time\n", key(&keys.edit)));
    text.push_str(&format!("  {}: Delete\n", key(&keys.delete)));
    text.push_str(&format!("  {}: Reload from the server\n", key(&keys.refresh)));
    text.push('\n');

    text.push_str("Questions:\n");
    text.push_str(&format!("  {}: Ask about your tasks\n", key(&keys.ask)));
    text.push_str("  PageUp / PageDown: Scroll the answer\n");
    text.push('\n');

    text.push_str("Voice and reminders:\n");
    text.push_str(&format!("  {}: Speak a task, or a question while asking\n", key(&keys.listen)));
    text.push_str(&format!("  {}: Stop the alarm sound\n", key(&keys.stop_alarm)));
    text.push_str("  Enter: Dismiss a due alert\n");
    text.push('\n');

    text.push_str("Typing:\n");
    text.push_str("  Enter: Submit • Esc: Back to the list • Tab: Switch input\n");
    text.push_str(&format!(
        "  {} / {}: Undo / clear line\n",
        key("Ctrl+z"),
        key("Ctrl+u")
    ));
    text.push('\n');

    text.push_str("General:\n");
    text.push_str(&format!("  {}: Sign out\n", key(&keys.sign_out)));
    text.push_str(&format!("  {}: Show/hide help\n", key(&keys.help)));
    text.push_str(&format!("  {}: Quit\n", key(&keys.quit)));

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_follows_configured_bindings() {
        let mut config = Config::default();
        config.key_bindings.listen = "F5".to_string();
        let text = build_help_text(&config);
        assert!(text.contains("F5: Speak a task"));
        assert!(text.contains("q: Quit"));
    }
}
