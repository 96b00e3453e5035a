use serde::{Deserialize, Serialize};

use crate::error::{Result, StorageLinkError};

/// Pub/sub heartbeat settings.
///
/// `fails` is the number of missed heartbeats before the server considers
/// the connection dead (1 to 6); `time` is the heartbeat period in seconds
/// (10 to 60). Both are validated on construction and on every setter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    active: bool,
    fails: u8,
    time: u8,
}

impl Heartbeat {
    pub const MIN_FAILS: u8 = 1;
    pub const MAX_FAILS: u8 = 6;
    pub const MIN_TIME: u8 = 10;
    pub const MAX_TIME: u8 = 60;

    pub fn new(active: bool, fails: u8, time: u8) -> Result<Self> {
        let mut heartbeat = Self::default();
        heartbeat.set_active(active);
        heartbeat.set_fails(fails)?;
        heartbeat.set_time(time)?;
        Ok(heartbeat)
    }

    pub fn active(&self) -> bool {
        self.active
    }

    pub fn fails(&self) -> u8 {
        self.fails
    }

    pub fn time(&self) -> u8 {
        self.time
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn set_fails(&mut self, fails: u8) -> Result<()> {
        if !(Self::MIN_FAILS..=Self::MAX_FAILS).contains(&fails) {
            return Err(StorageLinkError::ValidationError(format!(
                "Parameter 'fails' must be between {} and {}.",
                Self::MIN_FAILS,
                Self::MAX_FAILS
            )));
        }
        self.fails = fails;
        Ok(())
    }

    pub fn set_time(&mut self, time: u8) -> Result<()> {
        if !(Self::MIN_TIME..=Self::MAX_TIME).contains(&time) {
            return Err(StorageLinkError::ValidationError(format!(
                "Parameter 'time' must be between {} and {}.",
                Self::MIN_TIME,
                Self::MAX_TIME
            )));
        }
        self.time = time;
        Ok(())
    }
}

impl Default for Heartbeat {
    /// Inactive, 3 fails, 15 seconds.
    fn default() -> Self {
        Self {
            active: false,
            fails: 3,
            time: 15,
        }
    }
}
