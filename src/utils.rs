use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use crossterm::event::{KeyCode, KeyModifiers};
use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

/// Profile mode for the application (dev or prod)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Dev,
    Prod,
}

impl Profile {
    fn app_name(self) -> &'static str {
        match self {
            Profile::Dev => "gogodo-dev",
            Profile::Prod => "gogodo",
        }
    }
}

/// Configuration directory for the given profile
pub fn get_config_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "gogodo", profile.app_name())
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Data directory (database, log file, alarm sound) for the given profile
pub fn get_data_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "gogodo", profile.app_name())
        .map(|dirs| dirs.data_dir().to_path_buf())
}

/// Expand `~` in a path string to the user's home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Parse a date string in ISO 8601 format (YYYY-MM-DD)
pub fn parse_date(date_str: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
}

/// Parse a 24-hour time of day. Seconds are accepted and ignored.
pub fn parse_time(time_str: &str) -> Result<NaiveTime, chrono::ParseError> {
    let time_str = time_str.trim();
    NaiveTime::parse_from_str(time_str, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(time_str, "%H:%M:%S"))
}

/// Today's local date as YYYY-MM-DD
pub fn get_current_date_string() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

pub fn now_local() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

/// Long form used in reminder alerts and the task list: "June 2nd, 2024 5:00 PM"
pub fn format_due_timestamp(due: NaiveDateTime) -> String {
    let day = due.day();
    format!(
        "{} {}{}, {} {}",
        due.format("%B"),
        day,
        ordinal_suffix(day),
        due.year(),
        due.format("%-I:%M %p")
    )
}

/// Human-readable due value handed to the language model: "April 14, 2025 10:00 AM".
/// Falls back to the raw strings when they don't parse.
pub fn format_due_for_prompt(due_date: Option<&str>, due_time: Option<&str>) -> String {
    let date = due_date.and_then(|d| parse_date(d).ok());
    let time = due_time.and_then(|t| parse_time(t).ok());
    match (date, time) {
        (Some(date), Some(time)) => date.and_time(time).format("%B %-d, %Y %-I:%M %p").to_string(),
        (Some(date), None) => date.format("%B %-d, %Y").to_string(),
        (None, Some(time)) => time.format("%-I:%M %p").to_string(),
        (None, None) => match (due_date, due_time) {
            (None, None) => "no due date".to_string(),
            (d, t) => [d, t].into_iter().flatten().collect::<Vec<_>>().join(" "),
        },
    }
}

/// Cheap sanity check applied before credentials go to the identity provider
pub fn looks_like_email(value: &str) -> bool {
    let value = value.trim();
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// Truncate to `max_width` characters, marking the cut with "..."
pub fn truncate_with_ellipsis(text: &str, max_width: usize) -> String {
    if text.chars().count() <= max_width {
        return text.to_string();
    }
    text.chars().take(max_width.saturating_sub(3)).collect::<String>() + "..."
}

/// Parsed key binding information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKeyBinding {
    pub key_code: KeyCode,
    pub requires_ctrl: bool,
}

/// Ctrl on Windows/Linux; Ctrl or Option/Alt on macOS
pub fn has_primary_modifier(modifiers: KeyModifiers) -> bool {
    #[cfg(target_os = "macos")]
    {
        modifiers.contains(KeyModifiers::CONTROL) || modifiers.contains(KeyModifiers::ALT)
    }

    #[cfg(not(target_os = "macos"))]
    {
        modifiers.contains(KeyModifiers::CONTROL)
    }
}

/// Show "Opt+" instead of "Ctrl+" on macOS
pub fn format_key_binding_for_display(key_binding: &str) -> String {
    #[cfg(target_os = "macos")]
    {
        key_binding.replace("Ctrl+", "Opt+")
    }

    #[cfg(not(target_os = "macos"))]
    {
        key_binding.to_string()
    }
}

/// Parse a binding from config: "q", "Enter", "F3", "Ctrl+d"
pub fn parse_key_binding(key_str: &str) -> Result<ParsedKeyBinding, String> {
    let key_str = key_str.trim();
    let (requires_ctrl, key_part) = match key_str.strip_prefix("Ctrl+") {
        Some(rest) => (true, rest),
        None => (false, key_str),
    };
    Ok(ParsedKeyBinding {
        key_code: parse_key_code(key_part)?,
        requires_ctrl,
    })
}

fn parse_key_code(key_str: &str) -> Result<KeyCode, String> {
    let code = match key_str {
        "Enter" => KeyCode::Enter,
        "Esc" | "Escape" => KeyCode::Esc,
        "Backspace" => KeyCode::Backspace,
        "Tab" => KeyCode::Tab,
        "Space" | " " => KeyCode::Char(' '),
        "Left" => KeyCode::Left,
        "Right" => KeyCode::Right,
        "Up" => KeyCode::Up,
        "Down" => KeyCode::Down,
        "Home" => KeyCode::Home,
        "End" => KeyCode::End,
        "PageUp" => KeyCode::PageUp,
        "PageDown" => KeyCode::PageDown,
        "Delete" => KeyCode::Delete,
        "Insert" => KeyCode::Insert,
        _ => {
            if let Some(n) = key_str.strip_prefix('F').and_then(|n| n.parse::<u8>().ok()) {
                if (1..=12).contains(&n) {
                    return Ok(KeyCode::F(n));
                }
            }
            let mut chars = key_str.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => KeyCode::Char(c),
                _ => return Err(format!("Unknown key binding: {}", key_str)),
            }
        }
    };
    Ok(code)
}
