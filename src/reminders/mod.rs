//! Due-time reminders: one one-shot timer per future, incomplete task that
//! has both a due date and a due time.
//!
//! The schedule is never patched. Whenever the task list changes the caller
//! throws every timer away and arms a fresh set from the new snapshot.

use chrono::NaiveDateTime;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::models::Task;
use crate::utils;

/// A reminder due to fire after `delay`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alarm {
    pub task_id: String,
    pub description: String,
    pub due: NaiveDateTime,
    pub delay: Duration,
    /// Arming round this alarm belongs to
    pub(crate) generation: u64,
}

/// Alarms for `tasks` as seen at `now`. Tasks without a full schedule,
/// already completed, or due at or before `now` get none.
pub fn plan_alarms(tasks: &[Task], now: NaiveDateTime) -> Vec<Alarm> {
    tasks
        .iter()
        .filter(|task| !task.completed)
        .filter_map(|task| {
            let due = task.due_at()?;
            let delay = (due - now).to_std().ok().filter(|d| !d.is_zero())?;
            Some(Alarm {
                task_id: task.id.clone(),
                description: task.description.clone(),
                due,
                delay,
                generation: 0,
            })
        })
        .collect()
}

/// Whether `alarm` still matches the task list: the task exists, is not
/// completed, and is still due at the same moment.
pub fn still_due(alarm: &Alarm, tasks: &[Task]) -> bool {
    tasks
        .iter()
        .find(|task| task.id == alarm.task_id)
        .is_some_and(|task| !task.completed && task.due_at() == Some(alarm.due))
}

/// Arms tokio timers for planned alarms. Fired alarms arrive on the receiver
/// returned by [`ReminderScheduler::new`].
pub struct ReminderScheduler {
    sender: mpsc::UnboundedSender<Alarm>,
    timers: Vec<JoinHandle<()>>,
    generation: u64,
}

impl ReminderScheduler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Alarm>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender,
                timers: Vec::new(),
                generation: 0,
            },
            receiver,
        )
    }

    /// Disarm everything and arm one timer per alarm planned from `tasks`
    pub fn rearm(&mut self, tasks: &[Task]) -> usize {
        self.rearm_at(tasks, utils::now_local())
    }

    pub fn rearm_at(&mut self, tasks: &[Task], now: NaiveDateTime) -> usize {
        self.disarm_all();
        for mut alarm in plan_alarms(tasks, now) {
            alarm.generation = self.generation;
            tracing::debug!("Reminder for {} in {:?}", alarm.task_id, alarm.delay);
            let sender = self.sender.clone();
            self.timers.push(tokio::spawn(async move {
                tokio::time::sleep(alarm.delay).await;
                // The receiver is gone once the UI has shut down
                let _ = sender.send(alarm);
            }));
        }
        self.timers.len()
    }

    /// Abort every timer. Alarms that already fired but are still queued on
    /// the receiver become stale, see [`ReminderScheduler::is_current`].
    pub fn disarm_all(&mut self) {
        self.generation += 1;
        for timer in self.timers.drain(..) {
            timer.abort();
        }
    }

    /// False for alarms armed before the last disarm
    pub fn is_current(&self, alarm: &Alarm) -> bool {
        alarm.generation == self.generation
    }

    /// Timers that have not fired yet
    pub fn armed_count(&self) -> usize {
        self.timers.iter().filter(|timer| !timer.is_finished()).count()
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        self.disarm_all();
    }
}
