use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::utils::{format_due_timestamp, parse_date, parse_time};

/// A task as held in memory. The id is the remote record key and is
/// never part of the stored record itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>, // YYYY-MM-DD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_time: Option<String>, // HH:MM, 24-hour
    #[serde(default)]
    pub completed: bool,
}

/// A task that has not been assigned an id yet. This is also the exact
/// shape written to the remote store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_time: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

impl NewTask {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    /// Attach the id handed out by the remote store
    pub fn with_id(self, id: String) -> Task {
        Task {
            id,
            description: self.description,
            due_date: self.due_date,
            due_time: self.due_time,
            completed: self.completed,
        }
    }
}

impl Task {
    /// The stored record for this task (everything except the id)
    pub fn record(&self) -> NewTask {
        NewTask {
            description: self.description.clone(),
            due_date: self.due_date.clone(),
            due_time: self.due_time.clone(),
            completed: self.completed,
        }
    }

    /// Due timestamp in local wall-clock time.
    /// Only defined when both the date and the time are present and parse.
    pub fn due_at(&self) -> Option<NaiveDateTime> {
        let date = parse_date(self.due_date.as_deref()?).ok()?;
        let time = parse_time(self.due_time.as_deref()?).ok()?;
        Some(date.and_time(time))
    }

    /// Short due text for lists: the full timestamp when both parts are
    /// set, otherwise whatever part is present as stored.
    pub fn due_label(&self) -> Option<String> {
        if let Some(due) = self.due_at() {
            return Some(format_due_timestamp(due));
        }
        match (self.due_date.as_deref(), self.due_time.as_deref()) {
            (None, None) => None,
            (date, time) => Some([date, time].into_iter().flatten().collect::<Vec<_>>().join(" ")),
        }
    }

    pub fn toggled(&self) -> Task {
        Task {
            completed: !self.completed,
            ..self.clone()
        }
    }

    pub fn matches_search(&self, query: &str) -> bool {
        self.description.to_lowercase().contains(&query.to_lowercase())
    }
}

/// Derived view over the task list: one time slot and one activity per task.
/// Only used as prompt context when asking for reminder-time suggestions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySchedule {
    pub time_slots: Vec<String>,
    pub activities: Vec<String>,
}

impl DailySchedule {
    pub const UNSCHEDULED: &'static str = "unscheduled";

    pub fn from_tasks(tasks: &[Task]) -> Self {
        let time_slots = tasks
            .iter()
            .map(|task| {
                task.due_time
                    .clone()
                    .unwrap_or_else(|| Self::UNSCHEDULED.to_string())
            })
            .collect();
        let activities = tasks.iter().map(|task| task.description.clone()).collect();
        Self {
            time_slots,
            activities,
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.time_slots
            .iter()
            .map(String::as_str)
            .zip(self.activities.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(date: Option<&str>, time: Option<&str>) -> Task {
        Task {
            id: "-Nabc".to_string(),
            description: "water plants".to_string(),
            due_date: date.map(str::to_string),
            due_time: time.map(str::to_string),
            completed: false,
        }
    }

    #[test]
    fn record_uses_camel_case_and_omits_missing_schedule() {
        let record = NewTask {
            description: "call mom".to_string(),
            due_date: Some("2024-06-02".to_string()),
            due_time: None,
            completed: false,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["dueDate"], "2024-06-02");
        assert!(json.get("dueTime").is_none());
        assert!(json.get("id").is_none());
        assert_eq!(json["completed"], false);
    }

    #[test]
    fn missing_completed_flag_reads_as_false() {
        let record: NewTask = serde_json::from_str(r#"{"description":"pay rent"}"#).unwrap();
        assert!(!record.completed);
        assert!(record.due_date.is_none());
    }

    #[test]
    fn due_at_requires_both_date_and_time() {
        assert!(task(Some("2024-06-02"), None).due_at().is_none());
        assert!(task(None, Some("17:00")).due_at().is_none());
        assert!(task(Some("not a date"), Some("17:00")).due_at().is_none());

        let due = task(Some("2024-06-02"), Some("17:00")).due_at().unwrap();
        assert_eq!(due.to_string(), "2024-06-02 17:00:00");
    }

    #[test]
    fn due_label_prefers_the_full_timestamp() {
        assert_eq!(
            task(Some("2024-06-02"), Some("17:00")).due_label().as_deref(),
            Some("June 2nd, 2024 5:00 PM")
        );
        assert_eq!(task(Some("2024-06-02"), None).due_label().as_deref(), Some("2024-06-02"));
        assert!(task(None, None).due_label().is_none());
    }

    #[test]
    fn with_id_keeps_every_field() {
        let created = NewTask {
            description: "gym".to_string(),
            due_date: Some("2024-06-03".to_string()),
            due_time: Some("07:30".to_string()),
            completed: true,
        }
        .with_id("-Nxyz".to_string());
        assert_eq!(created.id, "-Nxyz");
        assert_eq!(created.record().due_time.as_deref(), Some("07:30"));
        assert!(created.completed);
    }

    #[test]
    fn daily_schedule_pairs_slots_with_activities() {
        let tasks = vec![task(Some("2024-06-02"), Some("09:00")), task(None, None)];
        let schedule = DailySchedule::from_tasks(&tasks);
        assert_eq!(schedule.time_slots, vec!["09:00", DailySchedule::UNSCHEDULED]);
        assert_eq!(schedule.activities.len(), 2);
        assert_eq!(schedule.entries().count(), 2);
    }
}
