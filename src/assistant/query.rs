use serde::Deserialize;

use super::{Assistant, parse_json_reply};
use crate::llm::LlmError;
use crate::models::Task;
use crate::utils::format_due_for_prompt;

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that answers questions about the user's tasks.";

#[derive(Debug, Deserialize)]
struct AnswerReply {
    answer: String,
}

fn build_prompt(question: &str, tasks: &[Task]) -> String {
    let mut prompt = String::from("Here are the user's tasks:\n");
    if tasks.is_empty() {
        prompt.push_str("(no tasks)\n");
    }
    for task in tasks {
        prompt.push_str(&format!(
            "- Description: {}, Due Date: {}, Completed: {}\n",
            task.description,
            format_due_for_prompt(task.due_date.as_deref(), task.due_time.as_deref()),
            task.completed
        ));
    }
    prompt.push_str(
        "\nDue dates are already human readable (for example April 14, 2025 10:00 AM); \
         keep that style in the answer.\n\
         Respond with a JSON object: {\"answer\": \"...\"}\n",
    );
    prompt.push_str(&format!("Question: {}", question.trim()));
    prompt
}

impl Assistant {
    /// Answer a free-form question about `tasks`. The whole list goes to the
    /// model; nothing is filtered or ranked locally.
    pub async fn answer_task_query(&self, question: &str, tasks: &[Task]) -> Result<String, LlmError> {
        let reply = self.ask(SYSTEM_PROMPT, build_prompt(question, tasks), true).await?;
        match parse_json_reply::<AnswerReply>(&reply) {
            Ok(parsed) => Ok(parsed.answer),
            // Some replies come back as prose despite the JSON request
            Err(_) => Ok(reply.trim().to_string()),
        }
    }

    /// Like [`Assistant::answer_task_query`] but never fails: errors become
    /// an answer of the form `Error: <message>`.
    pub async fn answer_or_error(&self, question: &str, tasks: &[Task]) -> String {
        match self.answer_task_query(question, tasks).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!("Error answering task query: {}", e);
                format!("Error: {}", e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lists_every_task_with_readable_due_dates() {
        let tasks = vec![
            Task {
                id: "-Na".to_string(),
                description: "dentist".to_string(),
                due_date: Some("2025-04-14".to_string()),
                due_time: Some("10:00".to_string()),
                completed: false,
            },
            Task {
                id: "-Nb".to_string(),
                description: "read a book".to_string(),
                due_date: None,
                due_time: None,
                completed: true,
            },
        ];
        let prompt = build_prompt("what's next?", &tasks);
        assert!(prompt.contains("- Description: dentist, Due Date: April 14, 2025 10:00 AM, Completed: false"));
        assert!(prompt.contains("- Description: read a book, Due Date: no due date, Completed: true"));
        assert!(prompt.ends_with("Question: what's next?"));
        assert!(!prompt.contains("-Na"));
    }
}
