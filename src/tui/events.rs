use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode, size as terminal_size,
};
use futures_util::StreamExt;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::KeyBindings;
use crate::reminders::ReminderScheduler;
use crate::tui::App;
use crate::tui::app::{ListenTarget, Mode};
use crate::tui::error::TuiError;
use crate::tui::layout::Layout;
use crate::tui::widgets::editor::LineEditor;
use crate::utils::{ParsedKeyBinding, has_primary_modifier, parse_key_binding};
use crate::voice::Recognition;

/// Restores the terminal even when the loop panics, so the user's shell is
/// never left in raw mode or on the alternate screen.
struct TerminalGuard {
    raw_mode_enabled: bool,
    alternate_screen_enabled: bool,
}

impl TerminalGuard {
    fn new() -> Result<Self, TuiError> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;
        Ok(Self {
            raw_mode_enabled: true,
            alternate_screen_enabled: true,
        })
    }

    /// Restore on normal exit; the guard does nothing on drop afterwards
    fn restore(&mut self) -> Result<(), TuiError> {
        if self.raw_mode_enabled {
            disable_raw_mode()?;
            self.raw_mode_enabled = false;
        }
        if self.alternate_screen_enabled {
            execute!(io::stdout(), LeaveAlternateScreen)?;
            self.alternate_screen_enabled = false;
        }
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        // Already unwinding or exiting; errors have nowhere to go
        if self.raw_mode_enabled {
            let _ = disable_raw_mode();
        }
        if self.alternate_screen_enabled {
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
        }
    }
}

/// Configured key bindings, parsed once at startup
pub struct KeyMap {
    pub quit: ParsedKeyBinding,
    pub new_task: ParsedKeyBinding,
    pub ask: ParsedKeyBinding,
    pub edit: ParsedKeyBinding,
    pub delete: ParsedKeyBinding,
    pub toggle_complete: ParsedKeyBinding,
    pub list_up: ParsedKeyBinding,
    pub list_down: ParsedKeyBinding,
    pub listen: ParsedKeyBinding,
    pub stop_alarm: ParsedKeyBinding,
    pub refresh: ParsedKeyBinding,
    pub sign_out: ParsedKeyBinding,
    pub help: ParsedKeyBinding,
}

impl KeyMap {
    pub fn from_config(bindings: &KeyBindings) -> Result<Self, TuiError> {
        let parse = |name: &str, value: &str| {
            parse_key_binding(value).map_err(|e| TuiError::KeyBindingError(format!("{}: {}", name, e)))
        };
        Ok(Self {
            quit: parse("quit", &bindings.quit)?,
            new_task: parse("new_task", &bindings.new_task)?,
            ask: parse("ask", &bindings.ask)?,
            edit: parse("edit", &bindings.edit)?,
            delete: parse("delete", &bindings.delete)?,
            toggle_complete: parse("toggle_complete", &bindings.toggle_complete)?,
            list_up: parse("list_up", &bindings.list_up)?,
            list_down: parse("list_down", &bindings.list_down)?,
            listen: parse("listen", &bindings.listen)?,
            stop_alarm: parse("stop_alarm", &bindings.stop_alarm)?,
            refresh: parse("refresh", &bindings.refresh)?,
            sign_out: parse("sign_out", &bindings.sign_out)?,
            help: parse("help", &bindings.help)?,
        })
    }
}

type VoiceResults = mpsc::UnboundedSender<(ListenTarget, Recognition)>;

pub async fn run_event_loop(mut app: App) -> Result<(), TuiError> {
    // Checked before entering the alternate screen so the message stays visible
    let (width, height) = terminal_size()?;
    let min_width_with_border = Layout::MIN_WIDTH + 2;
    let min_height_with_border = Layout::MIN_HEIGHT + 2;
    if width < min_width_with_border || height < min_height_with_border {
        return Err(TuiError::RenderError(format!(
            "Terminal size too small. Current: {}x{}, Minimum required: {}x{}. Please resize your terminal window.",
            width, height, min_width_with_border, min_height_with_border
        )));
    }

    let keys = KeyMap::from_config(&app.services.config.key_bindings)?;

    let mut guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    let mut events = EventStream::new();
    let mut auth_changes = app.services.auth.subscribe();
    let (mut scheduler, mut alarms) = ReminderScheduler::new();
    let (voice_tx, mut voice_rx) = mpsc::unbounded_channel();
    let mut tick = tokio::time::interval(Duration::from_millis(250));

    loop {
        app.sync_reminders(&mut scheduler);
        app.check_status_message_timeout();

        let size = terminal.size()?;
        let layout = Layout::calculate(Rect::new(0, 0, size.width, size.height));
        terminal.draw(|f| crate::tui::render::render(f, &mut app, &layout))?;

        // Drawn once with the busy message; now do the slow part
        if app.pending.is_some() {
            app.run_pending().await;
            continue;
        }

        tokio::select! {
            event = events.next() => match event {
                // Press only; Windows also reports releases
                Some(Ok(Event::Key(key_event))) if key_event.kind == KeyEventKind::Press => {
                    if handle_key_event(&mut app, &keys, key_event, &voice_tx)? {
                        break;
                    }
                }
                // Resize and the rest just trigger the redraw above
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
            Some(alarm) = alarms.recv() => {
                if scheduler.is_current(&alarm) {
                    app.raise_alert(alarm);
                }
            }
            Some((target, recognition)) = voice_rx.recv() => app.handle_recognition(target, recognition),
            changed = auth_changes.changed() => {
                if changed.is_ok() {
                    app.on_auth_changed().await;
                }
            }
            _ = tick.tick() => {}
        }
    }

    scheduler.disarm_all();
    app.stop_alarm();
    app.services.speaker.cancel();
    guard.restore()?;
    Ok(())
}

/// Returns true when the user asked to quit
pub fn handle_key_event(
    app: &mut App,
    keys: &KeyMap,
    key_event: KeyEvent,
    voice: &VoiceResults,
) -> Result<bool, TuiError> {
    if key_event.code == KeyCode::Char('c') && key_event.modifiers.contains(KeyModifiers::CONTROL) {
        return Ok(true);
    }

    // Due alerts sit above everything else until dismissed
    if !app.alerts.is_empty() {
        handle_alert(app, keys, key_event);
        return Ok(false);
    }
    if app.modals.delete_confirmation.is_some() {
        handle_delete_confirmation_modal(app, key_event);
        return Ok(false);
    }

    match app.ui.mode {
        Mode::SignIn => handle_sign_in_mode(app, key_event),
        Mode::View => return handle_view_mode(app, keys, key_event, voice),
        Mode::NewTask => handle_input_mode(app, keys, key_event, voice, ListenTarget::NewTask),
        Mode::Ask => handle_input_mode(app, keys, key_event, voice, ListenTarget::Ask),
        Mode::Edit => handle_edit_mode(app, key_event),
        Mode::Help => handle_help_mode(app, keys, key_event),
    }
    Ok(false)
}

fn handle_alert(app: &mut App, keys: &KeyMap, key_event: KeyEvent) {
    if matches_key_event(key_event, &keys.stop_alarm) {
        app.stop_alarm();
        return;
    }
    if matches!(key_event.code, KeyCode::Enter | KeyCode::Esc) {
        app.dismiss_alert();
    }
}

fn handle_delete_confirmation_modal(app: &mut App, key_event: KeyEvent) {
    match key_event.code {
        KeyCode::Up | KeyCode::Down | KeyCode::Left | KeyCode::Right | KeyCode::Tab => {
            app.modals.delete_modal_selection = 1 - app.modals.delete_modal_selection.min(1);
        }
        KeyCode::Enter => app.confirm_delete(),
        KeyCode::Char('y') => {
            app.modals.delete_modal_selection = 0;
            app.confirm_delete();
        }
        KeyCode::Esc | KeyCode::Char('n') => {
            app.modals.delete_confirmation = None;
            app.modals.delete_modal_selection = 0;
        }
        _ => {}
    }
}

fn handle_sign_in_mode(app: &mut App, key_event: KeyEvent) {
    match key_event.code {
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => app.auth_form.switch_field(),
        KeyCode::F(2) => app.auth_form.toggle_account_mode(),
        KeyCode::Enter => app.submit_auth_form(),
        _ => {
            handle_text_input(app.auth_form.current_editor(), key_event);
        }
    }
}

fn handle_view_mode(
    app: &mut App,
    keys: &KeyMap,
    key_event: KeyEvent,
    voice: &VoiceResults,
) -> Result<bool, TuiError> {
    if matches_key_event(key_event, &keys.quit) {
        return Ok(true);
    }

    if matches_key_event(key_event, &keys.list_up) || key_event.code == KeyCode::Up {
        app.move_selection_up();
    } else if matches_key_event(key_event, &keys.list_down) || key_event.code == KeyCode::Down {
        app.move_selection_down();
    } else if matches_key_event(key_event, &keys.new_task) {
        app.ui.mode = Mode::NewTask;
    } else if matches_key_event(key_event, &keys.ask) {
        app.ui.mode = Mode::Ask;
    } else if matches_key_event(key_event, &keys.edit) {
        app.enter_edit_mode();
    } else if matches_key_event(key_event, &keys.delete) {
        app.request_delete();
    } else if matches_key_event(key_event, &keys.toggle_complete) {
        app.toggle_selected();
    } else if matches_key_event(key_event, &keys.listen) {
        let recognizer = app.services.recognizer.clone();
        app.start_listening(ListenTarget::NewTask, recognizer, voice.clone());
    } else if matches_key_event(key_event, &keys.stop_alarm) {
        app.stop_alarm();
    } else if matches_key_event(key_event, &keys.refresh) {
        app.queue(crate::tui::app::PendingAction::Refresh);
    } else if matches_key_event(key_event, &keys.sign_out) {
        // The auth watcher in the loop clears the list and the alerts
        app.services.auth.sign_out();
    } else if matches_key_event(key_event, &keys.help) {
        app.ui.mode = Mode::Help;
    } else {
        match key_event.code {
            KeyCode::PageUp => app.ui.answer_scroll = app.ui.answer_scroll.saturating_sub(5),
            KeyCode::PageDown => app.ui.answer_scroll = app.ui.answer_scroll.saturating_add(5),
            _ => {}
        }
    }
    Ok(false)
}

/// The task and question inputs
fn handle_input_mode(
    app: &mut App,
    keys: &KeyMap,
    key_event: KeyEvent,
    voice: &VoiceResults,
    target: ListenTarget,
) {
    if matches_key_event(key_event, &keys.listen) {
        let recognizer = app.services.recognizer.clone();
        app.start_listening(target, recognizer, voice.clone());
        return;
    }

    match key_event.code {
        KeyCode::Esc => app.ui.mode = Mode::View,
        KeyCode::Enter => app.submit_input(target),
        KeyCode::Tab | KeyCode::BackTab => {
            app.ui.mode = match target {
                ListenTarget::NewTask => Mode::Ask,
                ListenTarget::Ask => Mode::NewTask,
            };
        }
        _ => {
            let editor = match target {
                ListenTarget::NewTask => &mut app.inputs.task,
                ListenTarget::Ask => &mut app.inputs.query,
            };
            handle_text_input(editor, key_event);
        }
    }
}

fn handle_edit_mode(app: &mut App, key_event: KeyEvent) {
    let Some(form) = app.modals.edit_form.as_mut() else {
        app.ui.mode = Mode::View;
        return;
    };
    match key_event.code {
        KeyCode::Esc => app.exit_edit_mode(),
        KeyCode::Enter => app.submit_edit_form(),
        KeyCode::Tab | KeyCode::Down => form.next_field(),
        KeyCode::BackTab | KeyCode::Up => form.previous_field(),
        _ => {
            if handle_text_input(form.current_editor(), key_event) {
                form.error = None;
            }
        }
    }
}

fn handle_help_mode(app: &mut App, keys: &KeyMap, key_event: KeyEvent) {
    if key_event.code == KeyCode::Esc || matches_key_event(key_event, &keys.help) {
        app.ui.mode = Mode::View;
    }
}

/// Shared line-editing keys. Returns true when the text changed.
fn handle_text_input(editor: &mut LineEditor, key_event: KeyEvent) -> bool {
    let primary = has_primary_modifier(key_event.modifiers);
    match key_event.code {
        KeyCode::Char('z') if primary => editor.undo(),
        KeyCode::Char('u') if primary => {
            editor.set_text("");
            true
        }
        KeyCode::Char(ch) if !primary => {
            editor.insert_char(ch);
            true
        }
        KeyCode::Backspace => {
            editor.delete_char();
            true
        }
        KeyCode::Delete => {
            editor.delete_forward();
            true
        }
        KeyCode::Left if primary => {
            editor.move_cursor_word_left();
            false
        }
        KeyCode::Right if primary => {
            editor.move_cursor_word_right();
            false
        }
        KeyCode::Left => {
            editor.move_cursor_left();
            false
        }
        KeyCode::Right => {
            editor.move_cursor_right();
            false
        }
        KeyCode::Home => {
            editor.move_cursor_home();
            false
        }
        KeyCode::End => {
            editor.move_cursor_end();
            false
        }
        _ => false,
    }
}

fn matches_key_event(key_event: KeyEvent, binding: &ParsedKeyBinding) -> bool {
    if binding.requires_ctrl != has_primary_modifier(key_event.modifiers) {
        return false;
    }
    binding.key_code == key_event.code
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn default_bindings_parse() {
        let keys = KeyMap::from_config(&KeyBindings::default()).unwrap();
        assert_eq!(keys.toggle_complete.key_code, KeyCode::Char(' '));
        assert_eq!(keys.listen.key_code, KeyCode::F(3));
        assert!(keys.sign_out.requires_ctrl);
    }

    #[test]
    fn bad_binding_names_the_action() {
        let bindings = KeyBindings {
            listen: "Hyper+x".to_string(),
            ..KeyBindings::default()
        };
        match KeyMap::from_config(&bindings) {
            Err(TuiError::KeyBindingError(message)) => assert!(message.starts_with("listen")),
            _ => panic!("expected a key binding error"),
        }
    }

    #[test]
    fn ctrl_bindings_need_the_modifier() {
        let binding = parse_key_binding("Ctrl+o").unwrap();
        assert!(!matches_key_event(key(KeyCode::Char('o')), &binding));
        assert!(matches_key_event(
            KeyEvent::new(KeyCode::Char('o'), KeyModifiers::CONTROL),
            &binding
        ));
    }

    #[test]
    fn text_input_edits_and_reports_changes() {
        let mut editor = LineEditor::new();
        assert!(handle_text_input(&mut editor, key(KeyCode::Char('a'))));
        assert!(!handle_text_input(&mut editor, key(KeyCode::Left)));
        assert!(handle_text_input(&mut editor, key(KeyCode::Char('b'))));
        assert_eq!(editor.text(), "ba");
        assert!(handle_text_input(
            &mut editor,
            KeyEvent::new(KeyCode::Char('z'), KeyModifiers::CONTROL)
        ));
        assert_eq!(editor.text(), "a");
    }
}
