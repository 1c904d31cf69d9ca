//! Sensor inputs: read-only values supplied by the host (growth, monitoring).

use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// A snapshot of everything the core reads from the outside world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensors {
    /// Mood, 0..=100.
    pub mood: u32,
    /// Satiation, 0..=100 (low means hungry).
    pub hunger: u32,
    /// Minutes since the user last did anything at all.
    pub inactive_minutes: u32,
    /// Whether study monitoring is running.
    pub is_monitoring: bool,
    /// Growth level.
    pub level: u32,
    /// Minutes spent studying today.
    pub today_study_minutes: u32,
    /// Minutes spent slacking off today.
    pub today_idle_minutes: u32,
    /// Free-form personality descriptor produced by the growth subsystem.
    #[serde(default)]
    pub personality: String,
}

impl Default for Sensors {
    fn default() -> Self {
        Self {
            mood: 50,
            hunger: 100,
            inactive_minutes: 0,
            is_monitoring: false,
            level: 1,
            today_study_minutes: 0,
            today_idle_minutes: 0,
            personality: String::new(),
        }
    }
}

/// Anything that can produce a fresh sensor snapshot.
pub trait SensorSource: Send + Sync {
    fn read(&self) -> Sensors;
}

/// A sensor source the host updates in place.
#[derive(Debug, Default)]
pub struct SharedSensors {
    inner: RwLock<Sensors>,
}

impl SharedSensors {
    pub fn new(initial: Sensors) -> Self {
        Self {
            inner: RwLock::new(initial),
        }
    }

    /// Apply an in-place update.
    pub fn update(&self, f: impl FnOnce(&mut Sensors)) {
        if let Ok(mut guard) = self.inner.write() {
            f(&mut guard);
        }
    }
}

impl SensorSource for SharedSensors {
    fn read(&self) -> Sensors {
        self.inner
            .read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_sensors_update_is_visible() {
        let sensors = SharedSensors::default();
        sensors.update(|s| s.mood = 85);
        assert_eq!(sensors.read().mood, 85);
        assert_eq!(sensors.read().hunger, 100);
    }
}
