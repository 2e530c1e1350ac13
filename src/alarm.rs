use std::f32::consts::TAU;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;
use tokio::task::JoinHandle;

use crate::config::AlarmConfig;

const SAMPLE_RATE: u32 = 22_050;
const PLAYERS: [&str; 3] = ["afplay", "paplay", "aplay"];

#[derive(Debug, Error)]
pub enum AlarmError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to write alarm sound: {0}")]
    Wav(#[from] hound::Error),
}

/// Write the built-in alarm (three short 880 Hz beeps) to `dir/alarm.wav`
/// unless it already exists.
pub fn install_alarm_sound(dir: &Path) -> Result<PathBuf, AlarmError> {
    let path = dir.join("alarm.wav");
    if path.exists() {
        return Ok(path);
    }
    std::fs::create_dir_all(dir)?;

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec)?;

    let beep = SAMPLE_RATE as usize / 5;
    let gap = SAMPLE_RATE as usize / 10;
    for _ in 0..3 {
        for n in 0..beep {
            let t = n as f32 / SAMPLE_RATE as f32;
            let sample = (t * 880.0 * TAU).sin() * 0.6 * i16::MAX as f32;
            writer.write_sample(sample as i16)?;
        }
        for _ in 0..gap {
            writer.write_sample(0i16)?;
        }
    }
    // Pause before the next loop
    for _ in 0..(SAMPLE_RATE as usize / 2) {
        writer.write_sample(0i16)?;
    }
    writer.finalize()?;

    Ok(path)
}

/// Loops the alarm sound through an external audio player until stopped
pub struct AlarmPlayer {
    player: Option<PathBuf>,
    sound: PathBuf,
    playing: Option<JoinHandle<()>>,
}

impl AlarmPlayer {
    /// Pick the sound file and the audio player. Alarms are silent (but still
    /// shown) when no player is available.
    pub fn from_config(config: &AlarmConfig, data_dir: &Path) -> Self {
        let sound = match &config.sound_path {
            Some(path) => crate::utils::expand_path(path),
            None => install_alarm_sound(data_dir).unwrap_or_else(|e| {
                tracing::warn!("Failed to install alarm sound: {}", e);
                data_dir.join("alarm.wav")
            }),
        };

        let player = if !config.enabled {
            None
        } else {
            match &config.player {
                Some(player) => which::which(player).ok(),
                None => PLAYERS.iter().find_map(|name| which::which(name).ok()),
            }
        };

        match &player {
            Some(path) => tracing::info!("Alarm player: {}", path.display()),
            None => tracing::warn!("No audio player found, alarms will be silent"),
        }

        Self {
            player,
            sound,
            playing: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.player.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.playing.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Start looping. A second call while playing does nothing.
    pub fn start(&mut self) {
        if self.is_playing() {
            return;
        }
        let Some(player) = self.player.clone() else {
            return;
        };
        let sound = self.sound.clone();
        self.playing = Some(tokio::spawn(async move {
            loop {
                let status = Command::new(&player)
                    .arg(&sound)
                    .stdout(std::process::Stdio::null())
                    .stderr(std::process::Stdio::null())
                    .kill_on_drop(true)
                    .status()
                    .await;
                match status {
                    Ok(status) if status.success() => {}
                    Ok(status) => {
                        tracing::warn!("Alarm player exited with {}", status);
                        break;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to run alarm player: {}", e);
                        break;
                    }
                }
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.playing.take() {
            task.abort();
        }
    }
}

impl Drop for AlarmPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_sound_is_a_mono_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = install_alarm_sound(dir.path()).unwrap();
        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.spec().sample_rate, SAMPLE_RATE);
        assert!(reader.duration() > SAMPLE_RATE);

        // Installing again keeps the existing file
        assert_eq!(install_alarm_sound(dir.path()).unwrap(), path);
    }

    #[tokio::test]
    async fn disabled_alarm_never_plays() {
        let dir = tempfile::tempdir().unwrap();
        let config = AlarmConfig {
            enabled: false,
            ..AlarmConfig::default()
        };
        let mut player = AlarmPlayer::from_config(&config, dir.path());
        assert!(!player.is_available());
        player.start();
        assert!(!player.is_playing());
        player.stop();
    }
}
