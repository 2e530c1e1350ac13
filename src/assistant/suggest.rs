use serde::Deserialize;

use super::{Assistant, parse_json_reply};
use crate::llm::LlmError;
use crate::models::DailySchedule;
use crate::utils::parse_time;

const SYSTEM_PROMPT: &str = "You are an AI assistant that suggests optimal reminder times for tasks \
     based on their description and the user's daily schedule.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuggestReply {
    #[serde(default)]
    suggested_reminder_times: Vec<String>,
}

fn build_prompt(description: &str, due_date: Option<&str>, schedule: &DailySchedule) -> String {
    let mut prompt = format!(
        "Task Description: {}\nDue Date: {}\n\n\
         Consider the user's typical daily schedule to avoid suggesting times when they are \
         likely busy. Here is the schedule:\n\n",
        description,
        due_date.unwrap_or("not set")
    );
    for (slot, activity) in schedule.entries() {
        prompt.push_str(&format!("- Time: {}, Activity: {}\n", slot, activity));
    }
    prompt.push_str(
        "\nSuggest at least 3 reminder times that would be optimal for the user to remember \
         to do the task. Return the times in 24-hour format.\n\
         Do not suggest times that conflict with the user's schedule.\n\
         Respond with a JSON object: {\"suggestedReminderTimes\": [\"HH:MM\", ...]}",
    );
    prompt
}

impl Assistant {
    /// Reminder times (HH:MM) the model considers free in `schedule`.
    /// Entries that are not times are dropped.
    pub async fn suggest_reminder_times(
        &self,
        description: &str,
        due_date: Option<&str>,
        schedule: &DailySchedule,
    ) -> Result<Vec<String>, LlmError> {
        let reply = self
            .ask(SYSTEM_PROMPT, build_prompt(description, due_date, schedule), true)
            .await?;
        let parsed: SuggestReply = parse_json_reply(&reply)?;
        Ok(parsed
            .suggested_reminder_times
            .iter()
            .filter_map(|time| parse_time(time).ok())
            .map(|time| time.format("%H:%M").to_string())
            .collect())
    }
}
