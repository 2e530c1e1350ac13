use serde::{Deserialize, Serialize};

use super::{Assistant, parse_json_reply};
use crate::llm::LlmError;
use crate::utils::{parse_date, parse_time};

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that extracts date and time information from task descriptions.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractDateTimeInput {
    pub task_description: String,
    /// Today's local date, YYYY-MM-DD
    pub current_date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractDateTimeOutput {
    pub due_date: Option<String>,
    pub due_time: Option<String>,
    pub completed: bool,
}

/// What the model sends back, before normalisation
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawExtraction {
    #[serde(default)]
    due_date: Option<serde_json::Value>,
    #[serde(default)]
    due_time: Option<serde_json::Value>,
    #[serde(default)]
    completed: Option<bool>,
}

fn build_prompt(input: &ExtractDateTimeInput) -> String {
    let today = &input.current_date;
    format!(
        "Today's date is: {today}\n\n\
         Given a task description, extract:\n\
         - the due date (in YYYY-MM-DD format)\n\
         - the due time (in HH:MM 24-hour format)\n\n\
         Rules:\n\
         - If the description uses words like \"today\", \"tomorrow\", or \"yesterday\":\n  \
           - \"today\" = {today}\n  \
           - \"tomorrow\" = one day after {today}\n  \
           - \"yesterday\" = one day before {today}\n\
         - If no year is mentioned, use the year from {today}.\n\
         - If no date or time is found, leave that field out.\n\
         - Respond with a JSON object: {{\"dueDate\": \"YYYY-MM-DD\", \"dueTime\": \"HH:MM\"}}. \
         If neither is found, respond with {{}}.\n\n\
         Task Description: {}",
        input.task_description
    )
}

fn as_text(value: Option<serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        _ => None,
    }
}

/// `2024-06-02` or the date part of `2024-06-02T17:00:00`
fn normalize_date(raw: &str) -> Option<String> {
    let date_part = raw.get(..10)?;
    parse_date(date_part)
        .ok()
        .map(|date| date.format("%Y-%m-%d").to_string())
}

/// `17:00`, `17:00:00`, or the time part of an ISO timestamp, as HH:MM
fn normalize_time(raw: &str) -> Option<String> {
    let raw = raw.rsplit_once('T').map_or(raw, |(_, time)| time);
    parse_time(raw)
        .ok()
        .or_else(|| raw.get(..5).and_then(|hhmm| parse_time(hhmm).ok()))
        .map(|time| time.format("%H:%M").to_string())
}

fn normalize(raw: RawExtraction) -> ExtractDateTimeOutput {
    let date_text = as_text(raw.due_date);
    let time_text = as_text(raw.due_time);

    let due_date = date_text.as_deref().and_then(normalize_date);
    // A full timestamp in dueDate also carries the time
    let due_time = time_text.as_deref().and_then(normalize_time).or_else(|| {
        date_text
            .as_deref()
            .filter(|d| d.contains('T'))
            .and_then(normalize_time)
    });

    ExtractDateTimeOutput {
        due_date,
        due_time,
        completed: raw.completed.unwrap_or(false),
    }
}

impl Assistant {
    /// Ask the model for the due date and time mentioned in a task description.
    /// Model failures are returned to the caller untouched.
    pub async fn extract_date_time(
        &self,
        input: &ExtractDateTimeInput,
    ) -> Result<ExtractDateTimeOutput, LlmError> {
        let reply = self.ask(SYSTEM_PROMPT, build_prompt(input), true).await?;
        let raw: RawExtraction = parse_json_reply(&reply)?;
        let output = normalize(raw);
        tracing::info!(
            "Extracted due {:?} {:?} from {:?}",
            output.due_date,
            output.due_time,
            input.task_description
        );
        Ok(output)
    }
}
