use ratatui::widgets::ListState;
use std::cmp;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

use crate::alarm::AlarmPlayer;
use crate::flows::{self, CreateOutcome};
use crate::models::Task;
use crate::reminders::{Alarm, ReminderScheduler, still_due};
use crate::services::Services;
use crate::tui::widgets::editor::LineEditor;
use crate::utils::{get_current_date_string, parse_date, parse_time};
use crate::voice::{Recognition, SpeechRecognizer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Nobody is signed in; the auth form owns the keyboard
    SignIn,
    View,
    NewTask,
    Ask,
    Edit,
    Help,
}

/// Which input a voice transcript is meant for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenTarget {
    NewTask,
    Ask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthField {
    Email,
    Password,
}

#[derive(Debug, Clone, Default)]
pub struct AuthForm {
    pub field: Option<AuthField>,
    pub email: LineEditor,
    pub password: LineEditor,
    /// Sign up instead of sign in
    pub creating_account: bool,
    pub error: Option<String>,
}

impl AuthForm {
    pub fn current_field(&self) -> AuthField {
        self.field.unwrap_or(AuthField::Email)
    }

    pub fn switch_field(&mut self) {
        self.field = Some(match self.current_field() {
            AuthField::Email => AuthField::Password,
            AuthField::Password => AuthField::Email,
        });
    }

    pub fn current_editor(&mut self) -> &mut LineEditor {
        match self.current_field() {
            AuthField::Email => &mut self.email,
            AuthField::Password => &mut self.password,
        }
    }

    pub fn toggle_account_mode(&mut self) {
        self.creating_account = !self.creating_account;
        self.error = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Description,
    DueDate,
    DueTime,
}

#[derive(Debug, Clone)]
pub struct EditForm {
    pub task_id: String,
    pub field: EditField,
    pub description: LineEditor,
    pub due_date: LineEditor,
    pub due_time: LineEditor,
    pub error: Option<String>,
}

impl EditForm {
    pub fn for_task(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            field: EditField::Description,
            description: LineEditor::from_string(task.description.clone()),
            due_date: LineEditor::from_string(task.due_date.clone().unwrap_or_default()),
            due_time: LineEditor::from_string(task.due_time.clone().unwrap_or_default()),
            error: None,
        }
    }

    pub fn next_field(&mut self) {
        self.field = match self.field {
            EditField::Description => EditField::DueDate,
            EditField::DueDate => EditField::DueTime,
            EditField::DueTime => EditField::Description,
        };
    }

    pub fn previous_field(&mut self) {
        self.field = match self.field {
            EditField::Description => EditField::DueTime,
            EditField::DueDate => EditField::Description,
            EditField::DueTime => EditField::DueDate,
        };
    }

    pub fn current_editor(&mut self) -> &mut LineEditor {
        match self.field {
            EditField::Description => &mut self.description,
            EditField::DueDate => &mut self.due_date,
            EditField::DueTime => &mut self.due_time,
        }
    }

    /// Apply the form to `existing`. Empty date/time fields clear them;
    /// anything else must parse.
    pub fn to_task(&self, existing: &Task) -> Result<Task, String> {
        let description = self.description.text().trim();
        if description.is_empty() {
            return Err("Description cannot be empty".to_string());
        }

        let due_date = match self.due_date.text().trim() {
            "" => None,
            date => {
                parse_date(date).map_err(|_| format!("Invalid date '{}', use YYYY-MM-DD", date))?;
                Some(date.to_string())
            }
        };
        let due_time = match self.due_time.text().trim() {
            "" => None,
            time => {
                let parsed = parse_time(time).map_err(|_| format!("Invalid time '{}', use HH:MM", time))?;
                Some(parsed.format("%H:%M").to_string())
            }
        };

        Ok(Task {
            description: description.to_string(),
            due_date,
            due_time,
            ..existing.clone()
        })
    }
}

/// Remote work queued by a key press. The loop draws once (so the busy
/// message shows) before running it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    SignIn { email: String, password: String, create: bool },
    CreateTask(String),
    Ask(String),
    ToggleComplete(String),
    SaveEdit(Task),
    Delete(String),
    Refresh,
}

impl PendingAction {
    pub fn busy_message(&self) -> &'static str {
        match self {
            PendingAction::SignIn { create: true, .. } => "Creating account...",
            PendingAction::SignIn { .. } => "Signing in...",
            PendingAction::CreateTask(_) => "Adding task...",
            PendingAction::Ask(_) => "Thinking...",
            PendingAction::ToggleComplete(_) | PendingAction::SaveEdit(_) => "Saving...",
            PendingAction::Delete(_) => "Deleting...",
            PendingAction::Refresh => "Refreshing...",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UiState {
    pub mode: Mode,
    pub selected_index: usize,
    pub list_state: ListState,
    pub answer_scroll: usize,
}

#[derive(Debug, Clone, Default)]
pub struct InputState {
    pub task: LineEditor,
    pub query: LineEditor,
}

#[derive(Debug, Clone)]
pub struct Answer {
    pub question: String,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct ModalState {
    pub delete_confirmation: Option<Task>,
    pub delete_modal_selection: usize,
    pub edit_form: Option<EditForm>,
}

#[derive(Debug, Clone, Default)]
pub struct StatusState {
    pub message: Option<String>,
    pub message_time: Option<Instant>,
}

pub struct App {
    pub services: Services,
    pub alarm: AlarmPlayer,
    pub ui: UiState,
    pub inputs: InputState,
    pub auth_form: AuthForm,
    pub answer: Option<Answer>,
    /// Alarms that fired and have not been dismissed, oldest first
    pub alerts: Vec<Alarm>,
    pub modals: ModalState,
    pub status: StatusState,
    pub pending: Option<PendingAction>,
    pub listening: Option<ListenTarget>,
    armed_revision: Option<u64>,
}

impl App {
    pub fn new(services: Services) -> Self {
        let alarm = AlarmPlayer::from_config(&services.config.alarm, &services.config.get_data_dir());
        let mode = if services.auth.current().is_some() {
            Mode::View
        } else {
            Mode::SignIn
        };

        let mut app = Self {
            services,
            alarm,
            ui: UiState {
                mode,
                selected_index: 0,
                list_state: ListState::default(),
                answer_scroll: 0,
            },
            inputs: InputState::default(),
            auth_form: AuthForm::default(),
            answer: None,
            alerts: Vec::new(),
            modals: ModalState::default(),
            status: StatusState::default(),
            pending: None,
            listening: None,
            armed_revision: None,
        };
        app.sync_list_state();
        app
    }

    pub fn tasks(&self) -> &[Task] {
        self.services.store.list()
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.tasks().get(self.ui.selected_index)
    }

    pub fn sync_list_state(&mut self) {
        let len = self.tasks().len();
        self.ui.selected_index = cmp::min(self.ui.selected_index, len.saturating_sub(1));
        self.ui
            .list_state
            .select(if len == 0 { None } else { Some(self.ui.selected_index) });
    }

    pub fn move_selection_up(&mut self) {
        if self.ui.selected_index > 0 {
            self.ui.selected_index -= 1;
            self.sync_list_state();
        }
    }

    pub fn move_selection_down(&mut self) {
        if self.ui.selected_index + 1 < self.tasks().len() {
            self.ui.selected_index += 1;
            self.sync_list_state();
        }
    }

    pub fn set_status_message(&mut self, message: String) {
        self.status.message = Some(message);
        self.status.message_time = Some(Instant::now());
    }

    pub fn clear_status_message(&mut self) {
        self.status.message = None;
        self.status.message_time = None;
    }

    /// Clear the status message after 3 seconds. A queued action keeps its
    /// busy message up.
    pub fn check_status_message_timeout(&mut self) {
        const STATUS_MESSAGE_TIMEOUT_SECS: u64 = 3;
        if self.pending.is_some() {
            return;
        }
        if let Some(time) = self.status.message_time {
            if time.elapsed().as_secs() >= STATUS_MESSAGE_TIMEOUT_SECS {
                self.clear_status_message();
            }
        }
    }

    /// Queue a remote action and show its busy message
    pub fn queue(&mut self, action: PendingAction) {
        self.set_status_message(action.busy_message().to_string());
        self.pending = Some(action);
    }

    /// When the task list changed since the last call: silence the alarm,
    /// drop every armed timer and arm the current list again.
    pub fn sync_reminders(&mut self, scheduler: &mut ReminderScheduler) -> bool {
        let revision = self.services.store.revision();
        if self.armed_revision == Some(revision) {
            return false;
        }
        self.alarm.stop();
        let armed = scheduler.rearm(self.services.store.list());
        tracing::debug!("Task list revision {}: {} reminder(s) armed", revision, armed);
        self.armed_revision = Some(revision);
        self.sync_list_state();
        true
    }

    /// A reminder fired. Alarms for tasks that were completed, rescheduled,
    /// deleted or signed out since arming are dropped.
    pub fn raise_alert(&mut self, alarm: Alarm) -> bool {
        if !still_due(&alarm, self.services.store.list()) {
            tracing::debug!("Dropping stale reminder for {}", alarm.task_id);
            return false;
        }
        tracing::info!("Task due: {}", alarm.description);
        self.alerts.push(alarm);
        self.alarm.start();
        true
    }

    pub fn stop_alarm(&mut self) {
        self.alarm.stop();
    }

    /// Close the oldest alert. The sound keeps going until stopped.
    pub fn dismiss_alert(&mut self) {
        if !self.alerts.is_empty() {
            self.alerts.remove(0);
        }
    }

    /// Sign-in state changed somewhere (form, sign-out key, failed refresh)
    pub async fn on_auth_changed(&mut self) {
        let principal = self.services.sync_principal().await;
        match principal {
            Some(principal) => {
                if self.ui.mode == Mode::SignIn {
                    self.ui.mode = Mode::View;
                    self.auth_form = AuthForm::default();
                    self.set_status_message(format!("Signed in as {}", principal.email));
                }
            }
            None => {
                self.ui.mode = Mode::SignIn;
                self.alarm.stop();
                self.alerts.clear();
                self.answer = None;
                self.inputs = InputState::default();
                self.modals = ModalState::default();
            }
        }
        self.sync_list_state();
    }

    pub fn start_listening(
        &mut self,
        target: ListenTarget,
        recognizer: Arc<dyn SpeechRecognizer>,
        results: mpsc::UnboundedSender<(ListenTarget, Recognition)>,
    ) {
        if self.listening.is_some() {
            return;
        }
        if !recognizer.is_available() {
            self.set_status_message("Voice input is off: set voice.recognizer_command".to_string());
            return;
        }
        self.listening = Some(target);
        self.ui.mode = match target {
            ListenTarget::NewTask => Mode::NewTask,
            ListenTarget::Ask => Mode::Ask,
        };
        self.set_status_message("Listening...".to_string());
        tokio::spawn(async move {
            let recognition = recognizer.listen_once().await;
            let _ = results.send((target, recognition));
        });
    }

    /// Route a finished listening session. Transcripts are submitted right
    /// away, as if typed and confirmed.
    pub fn handle_recognition(&mut self, target: ListenTarget, recognition: Recognition) {
        self.listening = None;
        match recognition {
            Recognition::Transcript(text) => {
                match target {
                    ListenTarget::NewTask => self.inputs.task.set_text(&text),
                    ListenTarget::Ask => self.inputs.query.set_text(&text),
                }
                self.submit_input(target);
            }
            Recognition::Error(code) if code == "no-speech" => {
                self.clear_status_message();
            }
            Recognition::Error(code) => {
                tracing::warn!("Speech recognition error: {}", code);
                self.set_status_message(format!("Speech recognition error: {}", code));
            }
        }
    }

    /// Enter in the task or question input
    pub fn submit_input(&mut self, target: ListenTarget) {
        match target {
            ListenTarget::NewTask => {
                let text = self.inputs.task.text().trim().to_string();
                if text.is_empty() {
                    return;
                }
                self.inputs.task.clear();
                self.queue(PendingAction::CreateTask(text));
            }
            ListenTarget::Ask => {
                let question = self.inputs.query.text().trim().to_string();
                if question.is_empty() {
                    return;
                }
                self.queue(PendingAction::Ask(question));
            }
        }
    }

    pub fn submit_auth_form(&mut self) {
        let email = self.auth_form.email.text().trim().to_string();
        let password = self.auth_form.password.text().to_string();
        self.auth_form.error = None;
        self.queue(PendingAction::SignIn {
            email,
            password,
            create: self.auth_form.creating_account,
        });
    }

    pub fn enter_edit_mode(&mut self) {
        if let Some(task) = self.selected_task() {
            self.modals.edit_form = Some(EditForm::for_task(task));
            self.ui.mode = Mode::Edit;
        }
    }

    pub fn exit_edit_mode(&mut self) {
        self.modals.edit_form = None;
        self.ui.mode = Mode::View;
    }

    pub fn submit_edit_form(&mut self) {
        let Some(form) = self.modals.edit_form.as_mut() else {
            return;
        };
        let Some(existing) = self.services.store.get(&form.task_id).cloned() else {
            self.exit_edit_mode();
            return;
        };
        match form.to_task(&existing) {
            Ok(task) => {
                self.exit_edit_mode();
                self.queue(PendingAction::SaveEdit(task));
            }
            Err(message) => form.error = Some(message),
        }
    }

    pub fn request_delete(&mut self) {
        if let Some(task) = self.selected_task().cloned() {
            self.modals.delete_confirmation = Some(task);
            self.modals.delete_modal_selection = 0;
        }
    }

    pub fn confirm_delete(&mut self) {
        if let Some(task) = self.modals.delete_confirmation.take() {
            if self.modals.delete_modal_selection == 0 {
                self.queue(PendingAction::Delete(task.id));
            }
        }
        self.modals.delete_modal_selection = 0;
    }

    pub fn toggle_selected(&mut self) {
        if let Some(task) = self.selected_task() {
            let id = task.id.clone();
            self.queue(PendingAction::ToggleComplete(id));
        }
    }

    /// Run the queued action, if any
    pub async fn run_pending(&mut self) {
        let Some(action) = self.pending.take() else {
            return;
        };
        self.clear_status_message();

        if !matches!(action, PendingAction::SignIn { .. }) {
            // Refresh an expired id token before touching the store
            self.services.sync_principal().await;
        }

        match action {
            PendingAction::SignIn { email, password, create } => {
                let result = if create {
                    self.services.auth.sign_up(&email, &password).await
                } else {
                    self.services.auth.sign_in(&email, &password).await
                };
                if let Err(e) = result {
                    self.auth_form.error = Some(e.to_string());
                }
            }
            PendingAction::CreateTask(text) => self.create_task(&text).await,
            PendingAction::Ask(question) => {
                let text = self
                    .services
                    .assistant
                    .answer_or_error(&question, self.services.store.list())
                    .await;
                if !text.starts_with("Error:") {
                    self.inputs.query.clear();
                }
                self.services.speak(&text);
                self.ui.answer_scroll = 0;
                self.answer = Some(Answer { question, text });
            }
            PendingAction::ToggleComplete(id) => {
                let Some(completed) = self.services.store.get(&id).map(|task| !task.completed) else {
                    return;
                };
                match self.services.store.update(&id, Task::toggled).await {
                    Ok(_) => {
                        let state = if completed { "completed" } else { "incomplete" };
                        self.services.speak(&format!("marked task as {}", state));
                    }
                    Err(e) => self.set_status_message(format!("Failed to update task: {}", e)),
                }
            }
            PendingAction::SaveEdit(task) => {
                let id = task.id.clone();
                let description = task.description.clone();
                match self.services.store.update(&id, move |_| task).await {
                    Ok(true) => {
                        self.set_status_message("Task updated".to_string());
                        self.services.speak(&format!("updated {}", description));
                    }
                    Ok(false) => self.set_status_message("Task no longer exists".to_string()),
                    Err(e) => self.set_status_message(format!("Failed to update task: {}", e)),
                }
            }
            PendingAction::Delete(id) => {
                let description = self.services.store.get(&id).map(|task| task.description.clone());
                match self.services.store.delete(&id).await {
                    Ok(()) => {
                        let description = description.unwrap_or_default();
                        self.set_status_message(format!("Deleted: {}", description));
                        self.services.speak(&format!("deleted {}", description));
                    }
                    Err(e) => self.set_status_message(format!("Failed to delete task: {}", e)),
                }
            }
            PendingAction::Refresh => {
                if self.services.store.reload().await {
                    self.set_status_message("Tasks refreshed".to_string());
                } else {
                    self.set_status_message("Refresh failed; showing saved tasks".to_string());
                }
            }
        }
        self.sync_list_state();
    }

    async fn create_task(&mut self, text: &str) {
        let policy = self.services.config.tasks.extract_failure_policy;
        let today = get_current_date_string();
        let outcome = flows::create_task(
            &mut self.services.store,
            &self.services.assistant,
            text,
            &today,
            policy,
        )
        .await;

        match outcome {
            Ok(None) => {}
            Ok(Some(CreateOutcome::NotStored)) => {
                self.set_status_message("Task was not saved".to_string());
            }
            Ok(Some(outcome)) => {
                if let CreateOutcome::CreatedUndated(_, e) = &outcome {
                    self.set_status_message(format!("No due date read ({}); task added without one", e));
                } else {
                    self.set_status_message("Task created successfully".to_string());
                }
                if let Some(task) = outcome.task() {
                    let spoken = format!("added {}", task.description);
                    let id = task.id.clone();
                    self.services.speak(&spoken);
                    if let Some(index) = self.tasks().iter().position(|t| t.id == id) {
                        self.ui.selected_index = index;
                    }
                }
            }
            Err(e) => {
                self.inputs.task.set_text(text);
                self.set_status_message(format!("Task not added, could not read a due date: {}", e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> Task {
        Task {
            id: "-Na".to_string(),
            description: "call mom".to_string(),
            due_date: Some("2024-06-02".to_string()),
            due_time: Some("17:00".to_string()),
            completed: false,
        }
    }

    #[test]
    fn edit_form_round_trips_an_unchanged_task() {
        let form = EditForm::for_task(&task());
        assert_eq!(form.to_task(&task()).unwrap(), task());
    }

    #[test]
    fn edit_form_clears_blank_schedule_and_normalizes_time() {
        let mut form = EditForm::for_task(&task());
        form.due_date.clear();
        form.due_time.set_text("9:05");
        let edited = form.to_task(&task()).unwrap();
        assert_eq!(edited.due_date, None);
        assert_eq!(edited.due_time.as_deref(), Some("09:05"));
    }

    #[test]
    fn edit_form_rejects_bad_input() {
        let mut form = EditForm::for_task(&task());
        form.due_date.set_text("June 2nd");
        assert!(form.to_task(&task()).unwrap_err().contains("Invalid date"));

        let mut form = EditForm::for_task(&task());
        form.description.set_text("   ");
        assert!(form.to_task(&task()).is_err());
    }

    #[test]
    fn edit_fields_cycle() {
        let mut form = EditForm::for_task(&task());
        form.next_field();
        assert_eq!(form.field, EditField::DueDate);
        form.previous_field();
        form.previous_field();
        assert_eq!(form.field, EditField::DueTime);
    }

    #[test]
    fn auth_form_switches_fields_and_modes() {
        let mut form = AuthForm::default();
        assert_eq!(form.current_field(), AuthField::Email);
        form.switch_field();
        form.current_editor().insert_char('x');
        assert_eq!(form.password.text(), "x");

        form.error = Some("bad".to_string());
        form.toggle_account_mode();
        assert!(form.creating_account);
        assert!(form.error.is_none());
    }
}
