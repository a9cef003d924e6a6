use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Settings snapshot driving one writing session.
///
/// The engine copies this at session start (and again on a settings-driven
/// reset); mid-session edits to the underlying config never leak into a
/// running countdown except through the reconciliation path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Writing phase length in seconds.
    pub write_secs: u32,
    /// Break phase length in seconds.
    pub break_secs: u32,
    /// Number of writing cycles in a full session.
    pub total_cycles: u32,
    /// Resume from stored progress on mount instead of starting clean.
    pub preserve_progress: bool,
    /// Whether haptic pulses should be requested at phase boundaries.
    pub haptics_enabled: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            write_secs: 15 * 60,
            break_secs: 5 * 60,
            total_cycles: 3,
            preserve_progress: true,
            haptics_enabled: true,
        }
    }
}

/// Calendar date identifying one journaling session.
///
/// Progress records are namespaced by this key, so sessions on different
/// dates never collide in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey(NaiveDate);

impl SessionKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// The key for today's session, in local time.
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Namespaced key under which progress records are stored.
    pub fn storage_key(&self) -> String {
        format!("progress:{self}")
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for SessionKey {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(NaiveDate::parse_from_str(s, "%Y-%m-%d")?))
    }
}
