use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Time between ingest acceptance and the optimistic `Embedded` status.
    pub embed_delay: Duration,
    pub health_interval: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            embed_delay: Duration::from_millis(400),
            health_interval: Duration::from_secs(30),
        }
    }
}
