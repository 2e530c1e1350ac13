use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use thiserror::Error;

use crate::auth::AuthError;
use crate::flows::{self, CreateOutcome};
use crate::llm::LlmError;
use crate::models::{DailySchedule, Task};
use crate::services::{ServiceError, Services};
use crate::store::StoreError;
use crate::utils::{get_current_date_string, parse_date, parse_time};

#[derive(Parser)]
#[command(name = "gogodo")]
#[command(about = "A to-do list that understands \"tomorrow at 5pm\" and reminds you on time")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Use development mode (uses separate dev config/database)
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch interactive TUI (default if no subcommand)
    Tui,
    /// Create an account
    SignUp {
        email: String,
        /// Password (read from stdin when omitted)
        #[arg(long, env = "GOGODO_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Sign in and remember the session
    SignIn {
        email: String,
        /// Password (read from stdin when omitted)
        #[arg(long, env = "GOGODO_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget the saved session
    SignOut,
    /// Show who is signed in
    Whoami,
    /// Add a task; the due date and time are read from the text
    Add {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// List tasks
    List {
        /// Only tasks whose description contains this text
        #[arg(long)]
        search: Option<String>,
        /// Hide completed tasks
        #[arg(long)]
        pending: bool,
    },
    /// Mark a task as completed
    Done {
        id: String,
        /// Mark as incomplete instead
        #[arg(long)]
        undo: bool,
    },
    /// Change a task's description or schedule
    Edit {
        id: String,
        /// New description
        text: Vec<String>,
        /// New due date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
        /// New due time (HH:MM, 24-hour)
        #[arg(long)]
        time: Option<String>,
        /// Remove the due date and time
        #[arg(long, conflicts_with_all = ["date", "time"])]
        clear_due: bool,
    },
    /// Delete a task
    Delete { id: String },
    /// Ask a question about your tasks
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Suggest reminder times for a task based on the rest of your schedule
    Suggest { id: String },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Service(#[from] ServiceError),
    #[error("{0}")]
    Auth(#[from] AuthError),
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("{0}")]
    Llm(#[from] LlmError),
    #[error("Not signed in. Run `gogodo sign-in <email>` first.")]
    NotSignedIn,
    #[error("No task with id {0}")]
    UnknownTask(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),
    #[error("Task was not saved; see the log for details")]
    NotSaved,
}

fn read_password(password: Option<String>) -> Result<String, CliError> {
    if let Some(password) = password {
        return Ok(password);
    }
    print!("Password: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn require_sign_in(services: &Services) -> Result<(), CliError> {
    match services.store.owner() {
        Some(_) => Ok(()),
        None => Err(CliError::NotSignedIn),
    }
}

fn find_task(services: &Services, id: &str) -> Result<Task, CliError> {
    services
        .store
        .get(id)
        .cloned()
        .ok_or_else(|| CliError::UnknownTask(id.to_string()))
}

pub fn format_task_line(task: &Task) -> String {
    let mark = if task.completed { "x" } else { " " };
    match task.due_label() {
        Some(due) => format!("[{}] {}  {}  (due {})", mark, task.id, task.description, due),
        None => format!("[{}] {}  {}", mark, task.id, task.description),
    }
}

pub async fn handle_sign_up(
    services: &mut Services,
    email: String,
    password: Option<String>,
) -> Result<(), CliError> {
    let password = read_password(password)?;
    let principal = services.auth.sign_up(&email, &password).await?;
    services.sync_principal().await;
    println!("Account created for {}", principal.email);
    Ok(())
}

pub async fn handle_sign_in(
    services: &mut Services,
    email: String,
    password: Option<String>,
) -> Result<(), CliError> {
    let password = read_password(password)?;
    let principal = services.auth.sign_in(&email, &password).await?;
    services.sync_principal().await;
    println!("Signed in as {}", principal.email);
    Ok(())
}

pub async fn handle_sign_out(services: &mut Services) -> Result<(), CliError> {
    services.auth.sign_out();
    services.sync_principal().await;
    println!("Signed out");
    Ok(())
}

pub fn handle_whoami(services: &Services) -> Result<(), CliError> {
    match services.auth.current() {
        Some(principal) => println!("{} ({})", principal.email, principal.uid),
        None => println!("Not signed in"),
    }
    Ok(())
}

pub async fn handle_add(services: &mut Services, text: Vec<String>) -> Result<(), CliError> {
    require_sign_in(services)?;
    let text = text.join(" ");
    let policy = services.config.tasks.extract_failure_policy;
    let today = get_current_date_string();

    let outcome = flows::create_task(&mut services.store, &services.assistant, &text, &today, policy).await?;
    match outcome {
        None => Err(CliError::InvalidInput("Task description is empty".to_string())),
        Some(CreateOutcome::NotStored) => Err(CliError::NotSaved),
        Some(outcome) => {
            if let CreateOutcome::CreatedUndated(_, e) = &outcome {
                eprintln!("Could not read a due date ({}); task added without one", e);
            }
            if let Some(task) = outcome.task() {
                println!("Task created successfully: {}", format_task_line(task));
                let spoken = format!("added {}", task.description);
                services.speak_and_wait(&spoken).await;
            }
            Ok(())
        }
    }
}

pub fn handle_list(services: &Services, search: Option<String>, pending: bool) -> Result<(), CliError> {
    require_sign_in(services)?;
    let tasks: Vec<&Task> = services
        .store
        .list()
        .iter()
        .filter(|task| !pending || !task.completed)
        .filter(|task| search.as_deref().is_none_or(|q| task.matches_search(q)))
        .collect();

    if tasks.is_empty() {
        println!("No tasks");
    }
    for task in tasks {
        println!("{}", format_task_line(task));
    }
    Ok(())
}

pub async fn handle_done(services: &mut Services, id: String, undo: bool) -> Result<(), CliError> {
    require_sign_in(services)?;
    find_task(services, &id)?;
    let completed = !undo;
    services
        .store
        .update(&id, |task| Task {
            completed,
            ..task.clone()
        })
        .await?;
    let state = if completed { "completed" } else { "incomplete" };
    println!("Marked task as {}", state);
    services.speak_and_wait(&format!("marked task as {}", state)).await;
    Ok(())
}

/// Stored dates are always `YYYY-MM-DD`
fn normalize_date(date: &str) -> Result<String, CliError> {
    parse_date(date)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|e| CliError::InvalidInput(format!("Invalid date '{}': {}", date, e)))
}

/// Stored times are always 24-hour `HH:MM`
fn normalize_time(time: &str) -> Result<String, CliError> {
    parse_time(time)
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|e| CliError::InvalidInput(format!("Invalid time '{}': {}", time, e)))
}

pub async fn handle_edit(
    services: &mut Services,
    id: String,
    text: Vec<String>,
    date: Option<String>,
    time: Option<String>,
    clear_due: bool,
) -> Result<(), CliError> {
    require_sign_in(services)?;
    let existing = find_task(services, &id)?;

    let date = date.as_deref().map(normalize_date).transpose()?;
    let time = time.as_deref().map(normalize_time).transpose()?;

    let description = text.join(" ").trim().to_string();
    let description = if description.is_empty() {
        existing.description.clone()
    } else {
        description
    };

    let updated = Task {
        description,
        due_date: if clear_due { None } else { date.or(existing.due_date.clone()) },
        due_time: if clear_due { None } else { time.or(existing.due_time.clone()) },
        ..existing
    };
    let spoken = format!("updated {}", updated.description);
    let line = format_task_line(&updated);
    services.store.update(&id, move |_| updated).await?;
    println!("Task updated: {}", line);
    services.speak_and_wait(&spoken).await;
    Ok(())
}

pub async fn handle_delete(services: &mut Services, id: String) -> Result<(), CliError> {
    require_sign_in(services)?;
    let task = find_task(services, &id)?;
    services.store.delete(&id).await?;
    println!("Deleted: {}", task.description);
    services.speak_and_wait(&format!("deleted {}", task.description)).await;
    Ok(())
}

pub async fn handle_ask(services: &mut Services, question: Vec<String>) -> Result<(), CliError> {
    require_sign_in(services)?;
    let question = question.join(" ");
    let answer = services
        .assistant
        .answer_or_error(&question, services.store.list())
        .await;
    termimad::print_text(&answer);
    services.speak_and_wait(&answer).await;
    Ok(())
}

pub async fn handle_suggest(services: &mut Services, id: String) -> Result<(), CliError> {
    require_sign_in(services)?;
    let task = find_task(services, &id)?;
    let others: Vec<Task> = services
        .store
        .list()
        .iter()
        .filter(|other| other.id != task.id)
        .cloned()
        .collect();
    let schedule = DailySchedule::from_tasks(&others);

    let times = services
        .assistant
        .suggest_reminder_times(&task.description, task.due_date.as_deref(), &schedule)
        .await?;
    if times.is_empty() {
        println!("No suggestions");
    }
    for time in times {
        println!("{}", time);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_multi_word_text() {
        let cli = Cli::try_parse_from(["gogodo", "add", "buy", "milk", "tomorrow"]).unwrap();
        match cli.command {
            Some(Commands::Add { text }) => assert_eq!(text.join(" "), "buy milk tomorrow"),
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn clear_due_conflicts_with_date() {
        assert!(Cli::try_parse_from(["gogodo", "edit", "-Na", "--clear-due", "--date", "2024-06-02"]).is_err());
    }

    #[test]
    fn no_subcommand_means_tui() {
        let cli = Cli::try_parse_from(["gogodo", "--dev"]).unwrap();
        assert!(cli.dev);
        assert!(cli.command.is_none());
    }

    #[test]
    fn task_lines_show_due_and_completion() {
        let task = Task {
            id: "-Na".to_string(),
            description: "call mom".to_string(),
            due_date: Some("2024-06-02".to_string()),
            due_time: Some("17:00".to_string()),
            completed: true,
        };
        assert_eq!(format_task_line(&task), "[x] -Na  call mom  (due June 2nd, 2024 5:00 PM)");
    }

    #[test]
    fn edited_due_parts_are_stored_canonically() {
        assert_eq!(normalize_time("9:05").unwrap(), "09:05");
        assert_eq!(normalize_time("17:00:30").unwrap(), "17:00");
        assert_eq!(normalize_date(" 2024-06-02 ").unwrap(), "2024-06-02");
        assert!(matches!(normalize_time("5pm"), Err(CliError::InvalidInput(_))));
        assert!(matches!(normalize_date("June 2"), Err(CliError::InvalidInput(_))));
    }
}
