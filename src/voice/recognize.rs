use async_trait::async_trait;
use tokio::process::Command;

use super::{Recognition, SpeechRecognizer};

/// Runs a user-supplied command that records one utterance and prints the
/// transcript on stdout, e.g. a whisper.cpp wrapper script.
pub struct CommandRecognizer {
    command: Option<String>,
}

impl CommandRecognizer {
    pub fn new(command: Option<String>) -> Self {
        let command = command.filter(|c| !c.trim().is_empty());
        if command.is_none() {
            tracing::info!("Speech recognition disabled: no recognizer_command configured");
        }
        Self { command }
    }
}

/// Map a finished recognizer run to a [`Recognition`]
pub fn interpret_output(success: bool, stdout: &str) -> Recognition {
    if !success {
        return Recognition::Error("recognizer-failed".to_string());
    }
    let transcript = stdout.split_whitespace().collect::<Vec<_>>().join(" ");
    if transcript.is_empty() {
        Recognition::Error("no-speech".to_string())
    } else {
        Recognition::Transcript(transcript)
    }
}

#[async_trait]
impl SpeechRecognizer for CommandRecognizer {
    fn is_available(&self) -> bool {
        self.command.is_some()
    }

    async fn listen_once(&self) -> Recognition {
        let Some(command) = &self.command else {
            return Recognition::Error("not-supported".to_string());
        };

        #[cfg(windows)]
        let mut cmd = {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(command);
            cmd
        };
        #[cfg(not(windows))]
        let mut cmd = {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command);
            cmd
        };

        let output = cmd
            .stdin(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .output()
            .await;

        match output {
            Ok(output) => {
                let result = interpret_output(
                    output.status.success(),
                    &String::from_utf8_lossy(&output.stdout),
                );
                if let Recognition::Error(code) = &result {
                    tracing::warn!("Speech recognition error: {} ({})", code, output.status);
                }
                result
            }
            Err(e) => {
                tracing::error!("Failed to start speech recognizer: {}", e);
                Recognition::Error("recognizer-failed".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_is_collapsed_into_one_transcript() {
        assert_eq!(
            interpret_output(true, "  buy milk\n tomorrow at 5pm \n"),
            Recognition::Transcript("buy milk tomorrow at 5pm".to_string())
        );
    }

    #[test]
    fn empty_output_is_no_speech() {
        assert_eq!(interpret_output(true, " \n"), Recognition::Error("no-speech".to_string()));
    }

    #[test]
    fn failed_run_is_an_error_even_with_output() {
        assert_eq!(
            interpret_output(false, "partial"),
            Recognition::Error("recognizer-failed".to_string())
        );
    }

    #[tokio::test]
    async fn unconfigured_recognizer_is_not_supported() {
        let recognizer = CommandRecognizer::new(Some("   ".to_string()));
        assert!(!recognizer.is_available());
        assert_eq!(recognizer.listen_once().await, Recognition::Error("not-supported".to_string()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_stdout_becomes_the_transcript() {
        let recognizer = CommandRecognizer::new(Some("echo call mom tonight".to_string()));
        assert_eq!(
            recognizer.listen_once().await,
            Recognition::Transcript("call mom tonight".to_string())
        );
    }
}
