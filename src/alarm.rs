//! Audible cue for an expired cooking timer.
//!
//! The tone is synthesised with rodio on a short-lived thread so the
//! cooking loop never blocks on audio.

use std::thread;
use std::time::Duration;

use rodio::source::{SineWave, Source};
use rodio::{OutputStreamBuilder, Sink};
use tracing::{debug, info, warn};

use crate::config::AlarmConfig;
use crate::error::AlarmError;

pub trait Alarm: Send + Sync {
    fn sound(&self) -> Result<(), AlarmError>;
}

pub fn from_config(config: &AlarmConfig) -> Box<dyn Alarm> {
    if config.enabled {
        Box::new(ToneAlarm::new(config))
    } else {
        info!("Timer alarm disabled");
        Box::new(SilentAlarm)
    }
}

pub struct ToneAlarm {
    frequency_hz: f32,
    beeps: u32,
    beep: Duration,
}

impl ToneAlarm {
    pub fn new(config: &AlarmConfig) -> Self {
        Self {
            frequency_hz: config.frequency_hz,
            beeps: config.beeps.max(1),
            beep: Duration::from_millis(config.beep_ms),
        }
    }
}

impl Alarm for ToneAlarm {
    fn sound(&self) -> Result<(), AlarmError> {
        let (frequency, beeps, beep) = (self.frequency_hz, self.beeps, self.beep);
        thread::Builder::new()
            .name("timer-alarm".into())
            .spawn(move || {
                if let Err(e) = play_tone(frequency, beeps, beep) {
                    warn!("Timer alarm failed: {e}");
                }
            })?;
        Ok(())
    }
}

fn play_tone(frequency: f32, beeps: u32, beep: Duration) -> Result<(), AlarmError> {
    let stream = OutputStreamBuilder::open_default_stream()
        .map_err(|e| AlarmError::Output(e.to_string()))?;
    let sink = Sink::connect_new(stream.mixer());

    for i in 0..beeps {
        let gap = if i == 0 { Duration::ZERO } else { beep };
        let tone = SineWave::new(frequency)
            .take_duration(beep)
            .amplify(0.25)
            .delay(gap);
        sink.append(tone);
    }

    sink.sleep_until_end();
    debug!("Alarm played ({beeps} beeps at {frequency}Hz)");
    Ok(())
}

pub struct SilentAlarm;

impl Alarm for SilentAlarm {
    fn sound(&self) -> Result<(), AlarmError> {
        Ok(())
    }
}
