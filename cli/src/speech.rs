use gemini_chat::SpeechSink;
use std::process::{Command, Stdio};
use std::thread;
use tracing::{debug, warn};

/// Speaks replies by handing them to an external program (`espeak`, `say`, ...)
#[derive(Debug, Clone)]
pub struct CommandSpeechSink {
    program: String,
}

impl CommandSpeechSink {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl SpeechSink for CommandSpeechSink {
    fn speak(&self, text: &str) {
        let spawned = Command::new(&self.program)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                warn!(program = %self.program, error = %e, "Failed to start speech program");
                return;
            }
        };
        debug!(program = %self.program, pid = child.id(), "Speaking reply");

        // Playback runs alongside the chat; a watcher thread reaps it
        let program = self.program.clone();
        thread::spawn(move || match child.wait() {
            Ok(status) if !status.success() => {
                warn!(program = %program, status = %status, "Speech program failed")
            }
            Ok(_) => {}
            Err(e) => warn!(program = %program, error = %e, "Failed to wait for speech program"),
        });
    }
}

/// Used when TTS is toggled on without a configured program
#[derive(Debug, Clone, Copy)]
pub struct SilentSpeechSink;

impl SpeechSink for SilentSpeechSink {
    fn speak(&self, _text: &str) {
        debug!("No tts_command configured, reply not spoken");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{Duration, Instant};

    /// Children of this process that exited but were never waited on
    #[cfg(target_os = "linux")]
    fn zombie_children() -> usize {
        let me = std::process::id().to_string();
        let Ok(entries) = fs::read_dir("/proc") else {
            return 0;
        };
        entries
            .filter_map(|entry| fs::read_to_string(entry.ok()?.path().join("stat")).ok())
            .filter(|stat| {
                // "pid (comm) state ppid ..."; comm may contain spaces
                let Some((_, rest)) = stat.rsplit_once(')') else {
                    return false;
                };
                let mut fields = rest.split_whitespace();
                fields.next() == Some("Z") && fields.next() == Some(me.as_str())
            })
            .count()
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_spoken_replies_are_reaped() {
        let sink = CommandSpeechSink::new("true");
        for _ in 0..5 {
            sink.speak("hello");
        }

        let deadline = Instant::now() + Duration::from_secs(5);
        while zombie_children() > 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(50));
        }
        assert_eq!(zombie_children(), 0);
    }

    #[test]
    fn test_missing_program_is_not_fatal() {
        let sink = CommandSpeechSink::new("definitely-not-a-speech-program-xyz");
        sink.speak("hello");
    }
}
