//! Text-to-speech narration for cooking mode.
//!
//! One utterance at a time: `speak` interrupts whatever is playing. Speech
//! runs in the background and the speaking/idle state is published on a
//! `watch` channel, so callers never wait on audio.

use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::process::Command;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

use crate::config::NarrationConfig;
use crate::error::NarrationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrationState {
    Idle,
    Speaking,
}

pub trait Narrator: Send + Sync {
    /// Start speaking `text`, cancelling any utterance in flight.
    fn speak(&self, text: &str);

    /// Stop speaking immediately.
    fn cancel(&self);

    fn subscribe(&self) -> watch::Receiver<NarrationState>;

    fn is_speaking(&self) -> bool {
        *self.subscribe().borrow() == NarrationState::Speaking
    }
}

/// Build the narrator described by the config.
pub fn from_config(config: &NarrationConfig) -> Arc<dyn Narrator> {
    if config.enabled {
        info!("Narration via '{}'", config.command);
        Arc::new(CommandNarrator::new(&config.command, config.args.clone()))
    } else {
        info!("Narration disabled");
        Arc::new(SilentNarrator::new())
    }
}

struct Shared {
    state: watch::Sender<NarrationState>,
    // Bumped on every speak/cancel; a finishing utterance only reports
    // Idle if it is still the current one.
    generation: AtomicU64,
}

/// Speaks through an external TTS command (`espeak-ng`, `spd-say --wait`,
/// ...), passing the text as the final argument.
pub struct CommandNarrator {
    command: String,
    args: Vec<String>,
    shared: Arc<Shared>,
    stop: Mutex<Option<oneshot::Sender<()>>>,
}

impl CommandNarrator {
    pub fn new(command: &str, args: Vec<String>) -> Self {
        let (state, _) = watch::channel(NarrationState::Idle);
        Self {
            command: command.to_string(),
            args,
            shared: Arc::new(Shared {
                state,
                generation: AtomicU64::new(0),
            }),
            stop: Mutex::new(None),
        }
    }

    fn stop_current(&self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(stop) = self.stop.lock().unwrap_or_else(|e| e.into_inner()).take() {
            let _ = stop.send(());
        }
    }

    fn spawn_speech(&self, text: &str) -> Result<(), NarrationError> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| NarrationError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        let generation = self.shared.generation.load(Ordering::SeqCst);
        let (stop_tx, stop_rx) = oneshot::channel();
        *self.stop.lock().unwrap_or_else(|e| e.into_inner()) = Some(stop_tx);
        self.shared.state.send_replace(NarrationState::Speaking);

        let shared = self.shared.clone();
        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => match status {
                    Ok(status) if !status.success() => warn!("Speech command exited with {status}"),
                    Err(e) => warn!("Speech command failed: {e}"),
                    Ok(_) => {}
                },
                _ = stop_rx => {
                    if let Err(e) = child.kill().await {
                        debug!("Failed to stop speech command: {e}");
                    }
                }
            }

            if shared.generation.load(Ordering::SeqCst) == generation {
                shared.state.send_replace(NarrationState::Idle);
            }
        });

        Ok(())
    }
}

impl Narrator for CommandNarrator {
    fn speak(&self, text: &str) {
        self.stop_current();

        let text = text.trim();
        if text.is_empty() {
            self.shared.state.send_replace(NarrationState::Idle);
            return;
        }

        let preview: String = text.chars().take(60).collect();
        debug!("Speaking: \"{preview}\"");

        if let Err(e) = self.spawn_speech(text) {
            warn!("{e}");
            self.shared.state.send_replace(NarrationState::Idle);
        }
    }

    fn cancel(&self) {
        self.stop_current();
        self.shared.state.send_replace(NarrationState::Idle);
    }

    fn subscribe(&self) -> watch::Receiver<NarrationState> {
        self.shared.state.subscribe()
    }
}

/// Narrator used when narration is turned off in the config.
pub struct SilentNarrator {
    state: watch::Sender<NarrationState>,
}

impl SilentNarrator {
    pub fn new() -> Self {
        let (state, _) = watch::channel(NarrationState::Idle);
        Self { state }
    }
}

impl Narrator for SilentNarrator {
    fn speak(&self, _text: &str) {}

    fn cancel(&self) {}

    fn subscribe(&self) -> watch::Receiver<NarrationState> {
        self.state.subscribe()
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::sync::Mutex;

    use tokio::sync::watch;

    use super::{NarrationState, Narrator};

    /// Records every utterance instead of playing it.
    pub struct RecordingNarrator {
        spoken: Mutex<Vec<String>>,
        cancels: Mutex<usize>,
        state: watch::Sender<NarrationState>,
    }

    impl RecordingNarrator {
        pub fn new() -> Self {
            let (state, _) = watch::channel(NarrationState::Idle);
            Self {
                spoken: Mutex::new(Vec::new()),
                cancels: Mutex::new(0),
                state,
            }
        }

        pub fn spoken(&self) -> Vec<String> {
            self.spoken.lock().unwrap().clone()
        }

        pub fn cancels(&self) -> usize {
            *self.cancels.lock().unwrap()
        }

        /// Simulate the utterance finishing on its own.
        pub fn finish(&self) {
            self.state.send_replace(NarrationState::Idle);
        }
    }

    impl Narrator for RecordingNarrator {
        fn speak(&self, text: &str) {
            self.spoken.lock().unwrap().push(text.to_string());
            self.state.send_replace(NarrationState::Speaking);
        }

        fn cancel(&self) {
            *self.cancels.lock().unwrap() += 1;
            self.state.send_replace(NarrationState::Idle);
        }

        fn subscribe(&self) -> watch::Receiver<NarrationState> {
            self.state.subscribe()
        }
    }
}
