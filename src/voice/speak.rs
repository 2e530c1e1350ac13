use std::path::PathBuf;
use tokio::process::{Child, Command};

use crate::config::VoiceConfig;

/// Voice name fragments that tend to pick a natural-sounding voice
const NATURAL_VOICE_HINTS: [&str; 4] = ["female", "samantha", "zira", "google us english"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineKind {
    /// macOS `say`
    Say,
    /// `espeak-ng` or `espeak`
    Espeak,
}

#[derive(Debug, Clone)]
struct Engine {
    program: PathBuf,
    kind: EngineKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    /// Extra text matched by the voice heuristic (locale, gender)
    pub description: String,
}

/// First voice whose name or description contains one of `preferences`,
/// then one of the built-in hints. Matching is case-insensitive.
pub fn pick_voice<'a>(voices: &'a [Voice], preferences: &[String]) -> Option<&'a Voice> {
    preferences
        .iter()
        .map(|p| p.to_lowercase())
        .chain(NATURAL_VOICE_HINTS.iter().map(|h| h.to_string()))
        .filter(|hint| !hint.is_empty())
        .find_map(|hint| {
            voices.iter().find(|voice| {
                voice.name.to_lowercase().contains(&hint)
                    || voice.description.to_lowercase().contains(&hint)
            })
        })
}

/// `say -v ?` prints `Name   locale   # sample sentence`
fn parse_say_voices(output: &str) -> Vec<Voice> {
    output
        .lines()
        .filter_map(|line| {
            let (head, _) = line.split_once('#').unwrap_or((line, ""));
            let mut columns = head.split("  ").map(str::trim).filter(|c| !c.is_empty());
            let name = columns.next()?;
            Some(Voice {
                name: name.to_string(),
                description: columns.collect::<Vec<_>>().join(" "),
            })
        })
        .collect()
}

/// `espeak --voices` prints a table: Pty Language Age/Gender VoiceName File ...
fn parse_espeak_voices(output: &str) -> Vec<Voice> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let columns: Vec<&str> = line.split_whitespace().collect();
            let language = columns.get(1)?;
            let gender = columns.get(2)?;
            let name = columns.get(3)?;
            let gender = if gender.ends_with('F') { "female" } else { "male" };
            Some(Voice {
                name: name.to_string(),
                description: format!("{} {}", language, gender),
            })
        })
        .collect()
}

/// Speaks short confirmations and answers. A new utterance cancels the one
/// in progress.
pub struct Speaker {
    engine: Option<Engine>,
    voice: Option<String>,
    current: Option<Child>,
}

impl Speaker {
    pub fn disabled() -> Self {
        Self {
            engine: None,
            voice: None,
            current: None,
        }
    }

    /// Find a synthesis program and choose a voice
    pub async fn detect(config: &VoiceConfig) -> Self {
        if !config.enabled {
            tracing::info!("Speech output disabled in config");
            return Self::disabled();
        }

        let engine = if cfg!(target_os = "macos") {
            which::which("say").ok().map(|program| Engine {
                program,
                kind: EngineKind::Say,
            })
        } else {
            ["espeak-ng", "espeak"]
                .iter()
                .find_map(|name| which::which(name).ok())
                .map(|program| Engine {
                    program,
                    kind: EngineKind::Espeak,
                })
        };

        let Some(engine) = engine else {
            tracing::warn!("Speech synthesis is not supported: no say/espeak found");
            return Self::disabled();
        };

        let voices = list_voices(&engine).await;
        if voices.is_empty() {
            tracing::warn!("No speech synthesis voices available");
        }
        let voice = pick_voice(&voices, &config.preferred_voices).map(|v| v.name.clone());
        match &voice {
            Some(name) => tracing::info!("Using preferred voice: {}", name),
            None => tracing::info!("Using default voice"),
        }

        Self {
            engine: Some(engine),
            voice,
            current: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.engine.is_some()
    }

    pub fn cancel(&mut self) {
        if let Some(mut child) = self.current.take() {
            if let Err(e) = child.start_kill() {
                tracing::debug!("Previous utterance already finished: {}", e);
            }
        }
    }

    /// Start speaking `text` and return right away. The utterance is killed
    /// by the next `speak` or `cancel`, or when the speaker is dropped.
    pub fn speak(&mut self, text: &str) {
        self.current = self.spawn_utterance(text);
    }

    /// Speak `text` and wait until the engine is done. For one-shot
    /// commands that exit right after narrating.
    pub async fn speak_and_wait(&mut self, text: &str) {
        let Some(mut child) = self.spawn_utterance(text) else {
            return;
        };
        match child.wait().await {
            Ok(status) if !status.success() => {
                tracing::warn!("Speech synthesis exited with {}", status)
            }
            Ok(_) => {}
            Err(e) => tracing::error!("Error in speech synthesis: {}", e),
        }
    }

    fn spawn_utterance(&mut self, text: &str) -> Option<Child> {
        let program = self.engine.as_ref().map(|engine| engine.program.clone())?;
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        self.cancel();

        let mut cmd = Command::new(&program);
        if let Some(voice) = &self.voice {
            cmd.arg("-v").arg(voice);
        }
        cmd.arg("--")
            .arg(text)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true);

        match cmd.spawn() {
            Ok(child) => Some(child),
            Err(e) => {
                tracing::error!("Error in speech synthesis: {}", e);
                None
            }
        }
    }
}

async fn list_voices(engine: &Engine) -> Vec<Voice> {
    let mut cmd = Command::new(&engine.program);
    match engine.kind {
        EngineKind::Say => cmd.arg("-v").arg("?"),
        EngineKind::Espeak => cmd.arg("--voices"),
    };
    match cmd.output().await {
        Ok(output) if output.status.success() => {
            let text = String::from_utf8_lossy(&output.stdout);
            match engine.kind {
                EngineKind::Say => parse_say_voices(&text),
                EngineKind::Espeak => parse_espeak_voices(&text),
            }
        }
        Ok(output) => {
            tracing::warn!("Listing voices failed with {}", output.status);
            Vec::new()
        }
        Err(e) => {
            tracing::warn!("Listing voices failed: {}", e);
            Vec::new()
        }
    }
}
