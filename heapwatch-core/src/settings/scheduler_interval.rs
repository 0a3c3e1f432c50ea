use std::time::Duration;

use serde::Deserialize;
use serde::{de::Error, Deserializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerInterval {
    Seconds(u32),
    Minutes(u32),
    Hours(u32),
}

impl SchedulerInterval {
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.len() < 2 {
            return Err(format!("Invalid interval '{s}', expected e.g. 10s, 5m or 1h"));
        }
        let unit_start = s.char_indices().last().map(|(i, _)| i).unwrap_or(0);
        let (num, unit) = s.split_at(unit_start);
        let num: u32 = num
            .parse()
            .map_err(|e| format!("Invalid interval '{s}': {e}"))?;

        match unit {
            "s" => Ok(SchedulerInterval::Seconds(num)),
            "m" => Ok(SchedulerInterval::Minutes(num)),
            "h" => Ok(SchedulerInterval::Hours(num)),
            _ => Err(format!("Invalid time unit in interval '{s}'")),
        }
    }

    pub fn is_zero(&self) -> bool {
        Duration::from(*self).is_zero()
    }
}

impl<'de> Deserialize<'de> for SchedulerInterval {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        SchedulerInterval::parse(&s).map_err(D::Error::custom)
    }
}

impl From<SchedulerInterval> for Duration {
    fn from(val: SchedulerInterval) -> Self {
        match val {
            SchedulerInterval::Seconds(s) => Duration::from_secs(s as u64),
            SchedulerInterval::Minutes(m) => Duration::from_secs(m as u64 * 60),
            SchedulerInterval::Hours(h) => Duration::from_secs(h as u64 * 3600),
        }
    }
}
