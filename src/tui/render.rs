use ratatui::Frame;
use ratatui::layout::Alignment;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::tui::app::{ListenTarget, Mode};
use crate::tui::widgets::{
    alert::render_alert,
    answer_view::render_answer_view,
    color::parse_color,
    confirm_delete::render_confirm_delete,
    form::{render_auth_form, render_edit_form},
    help::render_help,
    input_box::InputBox,
    status_bar::render_status_bar,
    task_list::render_task_list,
};
use crate::tui::{App, Layout};
use crate::utils::{format_key_binding_for_display as key, now_local};

pub fn render(f: &mut Frame, app: &mut App, layout: &Layout) {
    let config = &app.services.config;
    let theme = config.get_active_theme();
    let fg_color = parse_color(&theme.fg);
    let bg_color = parse_color(&theme.bg);

    let outer_block = Block::default()
        .borders(Borders::ALL)
        .title("gogodo")
        .title_alignment(Alignment::Center)
        .style(Style::default().fg(fg_color).bg(bg_color));
    f.render_widget(outer_block, f.area());

    f.render_widget(Paragraph::new(header_line(app)), layout.header_area);

    if app.ui.mode == Mode::SignIn {
        render_auth_form(f, layout.inner_area, &mut app.auth_form, &app.services.config);
        render_status_bar(
            f,
            layout.status_area,
            app.status.message.as_deref(),
            &[],
            &app.services.config,
        );
        return;
    }

    let mode = app.ui.mode;
    InputBox::new(if app.listening == Some(ListenTarget::NewTask) { "New task (listening...)" } else { "New task" })
        .placeholder("e.g. call mom tomorrow at 5pm")
        .focused(mode == Mode::NewTask)
        .render(f, layout.task_input_area, &mut app.inputs.task, &theme);
    InputBox::new(if app.listening == Some(ListenTarget::Ask) { "Ask (listening...)" } else { "Ask" })
        .placeholder("e.g. what's due this week?")
        .focused(mode == Mode::Ask)
        .render(f, layout.query_area, &mut app.inputs.query, &theme);

    render_task_list(
        f,
        layout.list_area,
        app.services.store.list(),
        &mut app.ui.list_state,
        &app.services.config,
        now_local(),
        mode == Mode::View,
    );
    render_answer_view(
        f,
        layout.answer_area,
        app.answer.as_ref(),
        app.listening == Some(ListenTarget::Ask),
        &app.services.config,
        app.ui.answer_scroll,
    );

    let hints = key_hints(app);
    render_status_bar(
        f,
        layout.status_area,
        app.status.message.as_deref(),
        &hints,
        &app.services.config,
    );

    match mode {
        Mode::Edit => {
            if let Some(form) = app.modals.edit_form.as_mut() {
                render_edit_form(f, layout.inner_area, form, &app.services.config);
            }
        }
        Mode::Help => render_help(f, layout.inner_area, &app.services.config),
        _ => {}
    }

    if let Some(task) = &app.modals.delete_confirmation {
        render_confirm_delete(
            f,
            layout.inner_area,
            task,
            app.modals.delete_modal_selection,
            &app.services.config,
        );
    }

    render_alert(
        f,
        layout.inner_area,
        &app.alerts,
        app.alarm.is_playing(),
        &app.services.config,
    );
}

fn header_line(app: &App) -> Line<'static> {
    let theme = app.services.config.get_active_theme();
    let accent = Style::default().fg(parse_color(&theme.accent)).add_modifier(Modifier::BOLD);
    let plain = Style::default().fg(parse_color(&theme.fg));

    let context = app.services.auth.context();
    let mut spans = if context.loading {
        vec![Span::styled("Loading...", plain)]
    } else {
        match context.principal {
            Some(principal) => vec![Span::styled("Signed in as ", plain), Span::styled(principal.email, accent)],
            None => vec![Span::styled("Not signed in", plain)],
        }
    };
    if app.alarm.is_playing() {
        spans.push(Span::styled("  ♪ alarm", accent));
    }
    if !app.alarm.is_available() {
        spans.push(Span::styled("  (no audio player, alarms are silent)", plain.add_modifier(Modifier::DIM)));
    }
    if !app.services.speaker.is_enabled() && app.services.config.voice.enabled {
        spans.push(Span::styled("  (no speech output found)", plain.add_modifier(Modifier::DIM)));
    }
    Line::from(spans)
}

fn key_hints(app: &App) -> Vec<String> {
    let keys = &app.services.config.key_bindings;
    match app.ui.mode {
        Mode::NewTask | Mode::Ask => vec![
            "Enter: Submit".to_string(),
            "Esc: Back".to_string(),
            "Tab: Switch input".to_string(),
            format!("{}: Speak", key(&keys.listen)),
        ],
        _ => vec![
            format!("{}: New", key(&keys.new_task)),
            format!("{}: Ask", key(&keys.ask)),
            format!("{}: Done", key(&keys.toggle_complete)),
            format!("{}: Edit", key(&keys.edit)),
            format!("{}: Delete", key(&keys.delete)),
            format!("{}: Speak", key(&keys.listen)),
            format!("{}: Help", key(&keys.help)),
            format!("{}: Quit", key(&keys.quit)),
        ],
    }
}
