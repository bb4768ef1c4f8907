//! Text-to-speech side channel.

use std::process::{Command, Stdio};
use std::thread;

use tracing::{info, warn};

use golfer_core::game::rig::Announcer;

/// Pipes commentary to an external TTS command, fire and forget. A missing
/// or failing speech program never reaches the game loop.
pub struct SpeechAnnouncer {
    program: String,
    args: Vec<String>,
}

impl SpeechAnnouncer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Announcer for SpeechAnnouncer {
    fn say(&self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        info!(text, "speaking");
        let spawned = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            Ok(mut child) => {
                // Reap in the background; the game loop never waits on audio.
                thread::spawn(move || {
                    let _ = child.wait();
                });
            }
            Err(err) => warn!(program = %self.program, error = %err, "tts unavailable"),
        }
    }
}
