pub mod alarm;
pub mod assistant;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod flows;
pub mod llm;
pub mod logging;
pub mod models;
pub mod reminders;
pub mod services;
pub mod store;
pub mod tui;
pub mod utils;
pub mod voice;

pub use config::Config;
pub use database::Database;
pub use models::{DailySchedule, NewTask, Task};
pub use services::Services;
pub use utils::Profile;
