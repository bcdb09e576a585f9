//! # roomsense-adapter-simulator
//!
//! Deterministic motion simulator for demo runs: walks through the configured
//! presence sensors, reporting presence then absence on a fixed cadence, all
//! through the hub port. No randomness; a demo run is reproducible.
//!
//! ## Dependency rule
//! Depends on `roomsense-app` (port traits) and `roomsense-domain` only.

use std::time::Duration;

use roomsense_app::ports::hub::Hub;
use roomsense_domain::entity::EntityId;
use roomsense_domain::state::{Attributes, STATE_OFF, STATE_ON};
use tracing::{debug, info, warn};

/// Cycles presence sensors on and off, one write per step.
///
/// Each sensor gets an `"on"` step followed by an `"off"` step before the
/// walker moves on to the next one.
pub struct MotionSimulator<H> {
    hub: H,
    sensors: Vec<EntityId>,
    step: Duration,
}

impl<H: Hub> MotionSimulator<H> {
    pub fn new(hub: H, sensors: Vec<EntityId>, step: Duration) -> Self {
        Self { hub, sensors, step }
    }

    /// Run until the task is dropped.
    pub async fn run(self) {
        if self.sensors.is_empty() {
            info!("motion simulator has no sensors to drive");
            return;
        }
        info!(
            sensors = self.sensors.len(),
            step_secs = self.step.as_secs(),
            "motion simulator starting"
        );
        let mut interval = tokio::time::interval(self.step);
        // The first tick completes immediately; consume it so the first
        // write happens a full step after startup.
        interval.tick().await;

        let mut index = 0;
        let mut present = true;
        loop {
            interval.tick().await;
            let sensor = &self.sensors[index];
            let state = if present { STATE_ON } else { STATE_OFF };
            debug!(sensor = %sensor, state, "simulated motion");
            if let Err(error) = self.hub.set_state(sensor, state, Attributes::new()).await {
                warn!(sensor = %sensor, %error, "simulated motion write failed");
            }
            if !present {
                index = (index + 1) % self.sensors.len();
            }
            present = !present;
        }
    }
}
