use serde::Deserialize;

use super::scheduler_interval::SchedulerInterval;

/// What the sampling loop does after a tick overran its period.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MissedTick {
    /// Fire the missed ticks back to back until the schedule is caught up.
    #[default]
    Burst,
    /// Restart the period from the moment the late tick finished.
    Delay,
    /// Drop missed ticks and wait for the next aligned one.
    Skip,
}

impl From<MissedTick> for tokio::time::MissedTickBehavior {
    fn from(val: MissedTick) -> Self {
        match val {
            MissedTick::Burst => tokio::time::MissedTickBehavior::Burst,
            MissedTick::Delay => tokio::time::MissedTickBehavior::Delay,
            MissedTick::Skip => tokio::time::MissedTickBehavior::Skip,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[readonly::make]
pub struct SamplerSettings {
    pub interval: SchedulerInterval,
    #[serde(default)]
    pub missed_tick: MissedTick,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            interval: SchedulerInterval::Seconds(10),
            missed_tick: MissedTick::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[readonly::make]
pub struct TriggerSettings {
    #[serde(default = "default_trigger_enabled")]
    pub enabled: bool,
    pub window: SchedulerInterval,
    pub capture_window: SchedulerInterval,
}

fn default_trigger_enabled() -> bool {
    true
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            enabled: default_trigger_enabled(),
            window: SchedulerInterval::Seconds(60),
            capture_window: SchedulerInterval::Seconds(10),
        }
    }
}
