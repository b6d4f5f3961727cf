//! Cooking mode: step-by-step instructions with narration and timers.
//!
//! A session walks a recipe's instructions, speaking each step as it comes
//! up. Steps that mention a duration ("Simmer for 10 minutes") can run a
//! countdown timer which sounds an alarm at zero. Any step change cancels
//! the timer.
//!
//! `run` drives a session from a command channel and a one-second tick:
//!
//! Absent → Running ⇄ Paused
//!             ↓
//!          Expired

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::alarm::Alarm;
use crate::error::CookingError;
use crate::narrator::{NarrationState, Narrator};
use crate::recipe::Recipe;
use crate::time_parser::parse_duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    pub remaining_secs: u64,
    pub running: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Absent,
    Paused,
    Running,
    Expired,
}

impl std::fmt::Display for TimerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absent => write!(f, "ABSENT"),
            Self::Paused => write!(f, "PAUSED"),
            Self::Running => write!(f, "RUNNING"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// What a one-second tick did to the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    Counted,
    Expired,
}

pub struct CookingSession {
    recipe: Recipe,
    durations: Vec<Option<u64>>,
    step: usize,
    muted: bool,
    timer: Option<Timer>,
    narrator: Arc<dyn Narrator>,
    alarm: Box<dyn Alarm>,
}

impl CookingSession {
    /// Enter cooking mode at step 0 and start narrating it.
    pub fn start(
        recipe: Recipe,
        narrator: Arc<dyn Narrator>,
        alarm: Box<dyn Alarm>,
    ) -> Result<Self, CookingError> {
        if recipe.instructions.is_empty() {
            return Err(CookingError::NoInstructions);
        }

        let durations = recipe
            .instructions
            .iter()
            .map(|step| parse_duration(step))
            .collect();

        info!(
            "Cooking mode: {} ({} steps)",
            recipe.name,
            recipe.instructions.len()
        );

        let session = Self {
            recipe,
            durations,
            step: 0,
            muted: false,
            timer: None,
            narrator,
            alarm,
        };
        session.narrate_current();
        Ok(session)
    }

    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn step_count(&self) -> usize {
        self.recipe.instructions.len()
    }

    pub fn instruction(&self) -> &str {
        &self.recipe.instructions[self.step]
    }

    /// Timer duration mentioned in the current step, in seconds.
    pub fn step_duration(&self) -> Option<u64> {
        self.durations[self.step]
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_speaking(&self) -> bool {
        !self.muted && self.narrator.is_speaking()
    }

    pub fn narration_updates(&self) -> watch::Receiver<NarrationState> {
        self.narrator.subscribe()
    }

    pub fn timer(&self) -> Option<Timer> {
        self.timer
    }

    pub fn timer_phase(&self) -> TimerPhase {
        match self.timer {
            None => TimerPhase::Absent,
            Some(t) if t.remaining_secs == 0 => TimerPhase::Expired,
            Some(t) if t.running => TimerPhase::Running,
            Some(_) => TimerPhase::Paused,
        }
    }

    /// Advance one step. Returns false on the last step.
    pub fn next_step(&mut self) -> bool {
        if self.step + 1 >= self.step_count() {
            return false;
        }
        self.go_to(self.step + 1);
        true
    }

    /// Go back one step. Returns false on the first step.
    pub fn prev_step(&mut self) -> bool {
        if self.step == 0 {
            return false;
        }
        self.go_to(self.step - 1);
        true
    }

    fn go_to(&mut self, step: usize) {
        self.cancel_timer();
        self.step = step;
        debug!("Step {}/{}", step + 1, self.step_count());
        self.narrate_current();
    }

    /// Flip mute. Muting silences narration at once; unmuting repeats the
    /// current step. Returns the new muted state.
    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        if self.muted {
            self.narrator.cancel();
        } else {
            self.narrate_current();
        }
        info!("Narration {}", if self.muted { "muted" } else { "unmuted" });
        self.muted
    }

    /// Start the countdown for the current step. Returns its length in
    /// seconds.
    pub fn start_timer(&mut self) -> Result<u64, CookingError> {
        if self.timer.is_some() {
            return Err(CookingError::TimerActive);
        }
        let secs = self.step_duration().ok_or(CookingError::NoDuration)?;

        self.timer = Some(Timer {
            remaining_secs: secs,
            running: secs > 0,
        });
        info!("Timer: ABSENT → RUNNING ({secs}s)");

        if secs == 0 {
            self.sound_alarm();
        }
        Ok(secs)
    }

    /// Count down one second if the timer is running.
    pub fn tick(&mut self) -> TickOutcome {
        let Some(timer) = self.timer.as_mut() else {
            return TickOutcome::Idle;
        };
        if !timer.running || timer.remaining_secs == 0 {
            return TickOutcome::Idle;
        }

        timer.remaining_secs -= 1;
        if timer.remaining_secs > 0 {
            return TickOutcome::Counted;
        }

        timer.running = false;
        info!("Timer: RUNNING → EXPIRED");
        self.sound_alarm();
        TickOutcome::Expired
    }

    /// Pause a running timer or resume a paused one. Returns false when
    /// there is nothing to toggle (no timer, or already expired).
    pub fn pause_resume_timer(&mut self) -> bool {
        let Some(timer) = self.timer.as_mut() else {
            return false;
        };
        if timer.remaining_secs == 0 {
            return false;
        }
        timer.running = !timer.running;
        debug!("Timer {}", if timer.running { "resumed" } else { "paused" });
        true
    }

    /// Clear the timer. Returns false if there was none.
    pub fn cancel_timer(&mut self) -> bool {
        let had_timer = self.timer.take().is_some();
        if had_timer {
            debug!("Timer cancelled");
        }
        had_timer
    }

    fn narrate_current(&self) {
        if !self.muted {
            self.narrator.speak(self.instruction());
        }
    }

    fn sound_alarm(&self) {
        if let Err(e) = self.alarm.sound() {
            warn!("Timer alarm failed: {e}");
        }
    }
}

impl Drop for CookingSession {
    fn drop(&mut self) {
        self.narrator.cancel();
        debug!("Left cooking mode");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookingCommand {
    Next,
    Prev,
    ToggleMute,
    StartTimer,
    PauseResume,
    CancelTimer,
    Exit,
}

impl CookingCommand {
    /// Parse a line of keyboard input. A bare space is pause/resume, an
    /// empty line moves on.
    pub fn parse(input: &str) -> Option<Self> {
        let line = input.trim_end_matches(['\r', '\n']);
        if !line.is_empty() && line.trim().is_empty() {
            return Some(Self::PauseResume);
        }
        let cmd = match input.trim().to_lowercase().as_str() {
            "n" | "next" | "" => Self::Next,
            "p" | "prev" | "back" => Self::Prev,
            "m" | "mute" => Self::ToggleMute,
            "t" | "timer" | "start" => Self::StartTimer,
            "space" | "pause" | "resume" => Self::PauseResume,
            "c" | "cancel" => Self::CancelTimer,
            "q" | "quit" | "exit" => Self::Exit,
            _ => return None,
        };
        Some(cmd)
    }
}

/// Something visible changed; the host should re-render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookingEvent {
    Started,
    Step,
    Mute,
    Timer,
    TimerExpired,
    Narration,
    Rejected(CookingError),
}

/// Drive a session until `Exit` or until the command channel closes.
///
/// Commands and ticks are handled one at a time. The session is dropped on
/// return, which stops narration.
pub async fn run<F>(
    mut session: CookingSession,
    mut commands: mpsc::Receiver<CookingCommand>,
    mut on_event: F,
) where
    F: FnMut(&CookingSession, CookingEvent),
{
    let period = Duration::from_secs(1);
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut narration = session.narration_updates();

    on_event(&session, CookingEvent::Started);

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    debug!("Cooking input closed");
                    break;
                };
                let event = match command {
                    CookingCommand::Exit => break,
                    CookingCommand::Next => session.next_step().then_some(CookingEvent::Step),
                    CookingCommand::Prev => session.prev_step().then_some(CookingEvent::Step),
                    CookingCommand::ToggleMute => {
                        session.toggle_mute();
                        Some(CookingEvent::Mute)
                    }
                    CookingCommand::StartTimer => match session.start_timer() {
                        Ok(_) => {
                            ticker.reset();
                            Some(if session.timer_phase() == TimerPhase::Expired {
                                CookingEvent::TimerExpired
                            } else {
                                CookingEvent::Timer
                            })
                        }
                        Err(e) => Some(CookingEvent::Rejected(e)),
                    },
                    CookingCommand::PauseResume => {
                        let toggled = session.pause_resume_timer();
                        if toggled && session.timer_phase() == TimerPhase::Running {
                            ticker.reset();
                        }
                        toggled.then_some(CookingEvent::Timer)
                    }
                    CookingCommand::CancelTimer => {
                        session.cancel_timer().then_some(CookingEvent::Timer)
                    }
                };
                if let Some(event) = event {
                    on_event(&session, event);
                }
            }
            _ = ticker.tick() => {
                match session.tick() {
                    TickOutcome::Idle => {}
                    TickOutcome::Counted => on_event(&session, CookingEvent::Timer),
                    TickOutcome::Expired => on_event(&session, CookingEvent::TimerExpired),
                }
            }
            Ok(()) = narration.changed() => {
                on_event(&session, CookingEvent::Narration);
            }
        }
    }

    info!("Exiting cooking mode at step {}/{}", session.step() + 1, session.step_count());
}
