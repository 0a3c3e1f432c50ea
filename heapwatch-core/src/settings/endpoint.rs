use serde::Deserialize;

use super::scheduler_interval::SchedulerInterval;

#[derive(Debug, Deserialize, Clone)]
#[readonly::make]
pub struct EndpointSettings {
    pub request_timeout: SchedulerInterval,
    pub snapshot_timeout: SchedulerInterval,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    pub username: Option<String>,
    pub password: Option<String>,
}

fn default_max_retries() -> usize {
    2
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            request_timeout: SchedulerInterval::Seconds(5),
            snapshot_timeout: SchedulerInterval::Minutes(10),
            max_retries: default_max_retries(),
            username: None,
            password: None,
        }
    }
}
