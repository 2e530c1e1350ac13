use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::Config;
use crate::auth::MIN_PASSWORD_LEN;
use crate::tui::app::{AuthField, AuthForm, EditField, EditForm};
use crate::tui::widgets::color::parse_color;
use crate::tui::widgets::input_box::InputBox;
use crate::tui::widgets::popup::popup_area_with_height;

/// Email, password, one error line, one hint line, plus borders
const AUTH_FORM_HEIGHT: u16 = 3 + 3 + 1 + 1 + 2;
/// Three fields, error and hint lines, plus borders
const EDIT_FORM_HEIGHT: u16 = 3 * 3 + 1 + 1 + 2;

fn form_rows(area: Rect, fields: usize) -> Vec<Rect> {
    let mut constraints: Vec<Constraint> = (0..fields).map(|_| Constraint::Length(3)).collect();
    constraints.push(Constraint::Length(1)); // Error
    constraints.push(Constraint::Length(1)); // Hint
    Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area)
        .to_vec()
}

fn render_frame(f: &mut Frame, area: Rect, title: &str, config: &Config) -> Rect {
    let theme = config.get_active_theme();
    let style = Style::default().fg(parse_color(&theme.fg)).bg(parse_color(&theme.bg));
    f.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_alignment(Alignment::Center)
        .style(style);
    let inner = block.inner(area);
    f.render_widget(block, area);
    inner
}

fn render_error_and_hint(f: &mut Frame, error_area: Rect, hint_area: Rect, error: Option<&str>, hint: &str, config: &Config) {
    let theme = config.get_active_theme();
    if let Some(error) = error {
        let paragraph = Paragraph::new(Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(parse_color(&theme.accent)).add_modifier(Modifier::BOLD),
        )))
        .wrap(Wrap { trim: true });
        f.render_widget(paragraph, error_area);
    }
    let paragraph = Paragraph::new(Line::from(Span::styled(
        hint.to_string(),
        Style::default().fg(parse_color(&theme.fg)).add_modifier(Modifier::DIM),
    )));
    f.render_widget(paragraph, hint_area);
}

pub fn render_auth_form(f: &mut Frame, area: Rect, form: &mut AuthForm, config: &Config) {
    let theme = config.get_active_theme();
    let popup = popup_area_with_height(area, 60, AUTH_FORM_HEIGHT);
    let title = if form.creating_account { "Create Account" } else { "Sign In" };
    let inner = render_frame(f, popup, title, config);
    let rows = form_rows(inner, 2);

    let field = form.current_field();
    InputBox::new("Email")
        .placeholder("you@example.com")
        .focused(field == AuthField::Email)
        .render(f, rows[0], &mut form.email, &theme);
    let password_title = if form.creating_account {
        format!("Password (at least {} characters)", MIN_PASSWORD_LEN)
    } else {
        "Password".to_string()
    };
    InputBox::new(&password_title)
        .focused(field == AuthField::Password)
        .masked(true)
        .render(f, rows[1], &mut form.password, &theme);

    let hint = if form.creating_account {
        "Enter: create account • Tab: next field • F2: sign in instead • Ctrl+c: quit"
    } else {
        "Enter: sign in • Tab: next field • F2: create an account • Ctrl+c: quit"
    };
    render_error_and_hint(f, rows[2], rows[3], form.error.as_deref(), hint, config);
}

pub fn render_edit_form(f: &mut Frame, area: Rect, form: &mut EditForm, config: &Config) {
    let theme = config.get_active_theme();
    let popup = popup_area_with_height(area, 70, EDIT_FORM_HEIGHT);
    let inner = render_frame(f, popup, "Edit Task", config);
    let rows = form_rows(inner, 3);

    InputBox::new("Description")
        .focused(form.field == EditField::Description)
        .render(f, rows[0], &mut form.description, &theme);
    InputBox::new("Due date (YYYY-MM-DD)")
        .placeholder("none")
        .focused(form.field == EditField::DueDate)
        .render(f, rows[1], &mut form.due_date, &theme);
    InputBox::new("Due time (HH:MM)")
        .placeholder("none")
        .focused(form.field == EditField::DueTime)
        .render(f, rows[2], &mut form.due_time, &theme);

    render_error_and_hint(
        f,
        rows[3],
        rows[4],
        form.error.as_deref(),
        "Enter: save • Tab: next field • Esc: cancel",
        config,
    );
}
