//! Task creation from free text, shared by the CLI and the TUI.

use crate::assistant::{Assistant, ExtractDateTimeInput, ExtractDateTimeOutput};
use crate::config::ExtractFailurePolicy;
use crate::llm::LlmError;
use crate::models::{NewTask, Task};
use crate::store::TaskStore;

/// Result of turning a line of text into a stored task
#[derive(Debug)]
pub enum CreateOutcome {
    /// Stored with whatever schedule the model found
    Created(Task),
    /// Extraction failed and the task was stored without a schedule
    CreatedUndated(Task, LlmError),
    /// Nothing was stored (no user signed in or the remote write failed)
    NotStored,
}

impl CreateOutcome {
    pub fn task(&self) -> Option<&Task> {
        match self {
            CreateOutcome::Created(task) | CreateOutcome::CreatedUndated(task, _) => Some(task),
            CreateOutcome::NotStored => None,
        }
    }
}

/// Extract the due date and time from `text` and add the task.
///
/// Blank text is ignored (`Ok(None)`). When extraction fails the policy
/// decides: `Undated` stores the task without a schedule, `Abort` returns
/// the error and stores nothing.
pub async fn create_task(
    store: &mut TaskStore,
    assistant: &Assistant,
    text: &str,
    today: &str,
    policy: ExtractFailurePolicy,
) -> Result<Option<CreateOutcome>, LlmError> {
    let description = text.trim();
    if description.is_empty() {
        return Ok(None);
    }

    let input = ExtractDateTimeInput {
        task_description: description.to_string(),
        current_date: today.to_string(),
    };

    let (extracted, failure) = match assistant.extract_date_time(&input).await {
        Ok(extracted) => (extracted, None),
        Err(e) => match policy {
            ExtractFailurePolicy::Undated => {
                tracing::warn!("Date extraction failed, adding task without a due date: {}", e);
                (ExtractDateTimeOutput::default(), Some(e))
            }
            ExtractFailurePolicy::Abort => {
                tracing::error!("Date extraction failed, task not added: {}", e);
                return Err(e);
            }
        },
    };

    let new_task = NewTask {
        description: description.to_string(),
        due_date: extracted.due_date,
        due_time: extracted.due_time,
        completed: extracted.completed,
    };

    let outcome = match (store.add(new_task).await, failure) {
        (Some(task), None) => CreateOutcome::Created(task),
        (Some(task), Some(e)) => CreateOutcome::CreatedUndated(task, e),
        (None, _) => CreateOutcome::NotStored,
    };
    Ok(Some(outcome))
}
