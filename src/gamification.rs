//! Points and daily cooking streaks.
//!
//! Stats live in a single record under `smartchef_gamification`. The streak
//! is never expired in the background: a stale `lastUsed` date is corrected
//! when the record is loaded.

use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::storage::{self, Storage, GAMIFICATION_KEY};

/// Source of "now" for streak bookkeeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GamificationStats {
    pub points: u64,
    pub streak: u32,
    #[serde(rename = "lastUsed")]
    pub last_used: Option<DateTime<Local>>,
}

/// How a previous use relates to today, by calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LastUse {
    Never,
    Today,
    Yesterday,
    Lapsed,
}

fn classify(last_used: Option<DateTime<Local>>, today: NaiveDate) -> LastUse {
    let Some(last) = last_used else {
        return LastUse::Never;
    };
    match today.signed_duration_since(last.date_naive()).num_days() {
        0 => LastUse::Today,
        1 => LastUse::Yesterday,
        _ => LastUse::Lapsed,
    }
}

pub struct Ledger {
    stats: GamificationStats,
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
}

impl Ledger {
    /// Load stats from storage, resetting a lapsed streak to 0.
    ///
    /// Missing or unreadable records start from zero. `last_used` is kept
    /// as-is; the next `register_use` restarts the streak at 1.
    pub fn load(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        let mut stats = match storage::load_json::<GamificationStats>(&*storage, GAMIFICATION_KEY) {
            Ok(Some(stats)) => stats,
            Ok(None) => GamificationStats::default(),
            Err(e) => {
                warn!("Could not load gamification stats: {e}, starting fresh");
                GamificationStats::default()
            }
        };

        match classify(stats.last_used, clock.now().date_naive()) {
            LastUse::Never => stats.streak = 0,
            LastUse::Lapsed if stats.streak > 0 => {
                info!("Streak of {} days lapsed", stats.streak);
                stats.streak = 0;
            }
            _ => {}
        }

        debug!("Loaded stats: {} points, {}-day streak", stats.points, stats.streak);
        Self { stats, storage, clock }
    }

    pub fn stats(&self) -> GamificationStats {
        self.stats
    }

    pub fn add_points(&mut self, points: u64) -> GamificationStats {
        self.stats.points = self.stats.points.saturating_add(points);
        debug!("+{points} points (total {})", self.stats.points);
        self.persist();
        self.stats
    }

    /// Record a recipe-generating action for today's streak.
    pub fn register_use(&mut self) -> GamificationStats {
        let now = self.clock.now();

        self.stats.streak = match classify(self.stats.last_used, now.date_naive()) {
            LastUse::Today => self.stats.streak,
            LastUse::Yesterday => self.stats.streak.saturating_add(1),
            LastUse::Never | LastUse::Lapsed => 1,
        };
        self.stats.last_used = Some(now);

        info!("Streak: {} day(s)", self.stats.streak);
        self.persist();
        self.stats
    }

    fn persist(&self) {
        if let Err(e) = storage::save_json(&*self.storage, GAMIFICATION_KEY, &self.stats) {
            warn!("Could not save gamification stats: {e}");
        }
    }
}
