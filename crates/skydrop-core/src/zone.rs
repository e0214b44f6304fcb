// ── Zone entity ──
//
// One watering circuit under a controller. A zone holds two snapshots:
// configuration (from `all.config`) and live state (from `water.state`).
// Properties are derived from those snapshots without I/O; commands go
// through `ZoneControl`, which borrows the owning controller.

use std::fmt;

use skydrop_api::models::{ZoneData, ZonePatch, ZoneStateData};

use crate::controller::Controller;
use crate::converge::Convergence;
use crate::error::CoreError;

/// An irrigation zone. Identity is `(controller_id, id)`.
#[derive(Debug, Clone)]
pub struct Zone {
    id: u32,
    controller_id: String,
    config: ZoneData,
    state: ZoneStateData,
}

impl Zone {
    pub(crate) fn new(controller_id: String, id: u32, config: ZoneData) -> Self {
        Self {
            id,
            controller_id,
            config,
            state: ZoneStateData::default(),
        }
    }

    pub(crate) fn apply_config(&mut self, config: ZoneData) {
        self.config = config;
    }

    pub(crate) fn apply_state(&mut self, state: ZoneStateData) {
        self.state = state;
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Id of the owning controller.
    pub fn controller_id(&self) -> &str {
        &self.controller_id
    }

    /// Configured name, or `"Zone {id}"` when the server has none.
    pub fn name(&self) -> String {
        self.config
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .map_or_else(|| format!("Zone {}", self.id), str::to_owned)
    }

    pub fn enabled(&self) -> bool {
        self.config.on.unwrap_or(false)
    }

    /// Watering duration in minutes.
    pub fn duration(&self) -> u32 {
        self.config.duration.unwrap_or(0)
    }

    pub fn watering(&self) -> bool {
        self.state.zone_watering.unwrap_or(false)
    }

    /// Minutes left in the current watering run.
    pub fn time_remaining(&self) -> u32 {
        self.state.time_remaining.unwrap_or(0)
    }

    pub fn status(&self) -> Option<&str> {
        self.config.status.as_deref()
    }

    pub fn plants(&self) -> Vec<&str> {
        split_list(self.config.plant.as_deref())
    }

    pub fn shade(&self) -> Option<&str> {
        self.config.shade.as_deref()
    }

    pub fn slope(&self) -> Option<&str> {
        self.config.slope.as_deref()
    }

    pub fn sprinklers(&self) -> Vec<&str> {
        split_list(self.config.sprinkler.as_deref())
    }

    /// Last configuration snapshot.
    pub fn config(&self) -> &ZoneData {
        &self.config
    }

    /// Last live-state snapshot.
    pub fn state(&self) -> &ZoneStateData {
        &self.state
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" [", self.name())?;
        if self.watering() {
            write!(f, "on: {}m", self.time_remaining())?;
        } else {
            f.write_str("off")?;
        }
        write!(f, "] ({} Zone {})", self.controller_id, self.id)
    }
}

fn split_list(raw: Option<&str>) -> Vec<&str> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

// ── Zone commands ───────────────────────────────────────────────────

/// Command handle for one zone, borrowing its controller.
///
/// Obtained from [`Controller::zone_control`].
pub struct ZoneControl<'a> {
    controller: &'a mut Controller,
    zone_id: u32,
}

impl<'a> ZoneControl<'a> {
    pub(crate) fn new(controller: &'a mut Controller, zone_id: u32) -> Self {
        Self {
            controller,
            zone_id,
        }
    }

    /// The zone as last observed.
    pub fn zone(&self) -> Option<&Zone> {
        self.controller.zone(self.zone_id)
    }

    /// Refresh the owning controller, which re-reads this zone too.
    pub async fn refresh(&mut self) -> Result<(), CoreError> {
        self.controller.refresh().await
    }

    pub async fn start_watering(&mut self) -> Result<bool, CoreError> {
        self.controller.start_watering(self.zone_id).await
    }

    pub async fn stop_watering(&mut self) -> Result<bool, CoreError> {
        self.controller.stop_watering().await
    }

    pub async fn enable(&mut self) -> Result<Convergence, CoreError> {
        self.controller
            .configure_zone(self.zone_id, ZonePatch::on(true))
            .await
    }

    pub async fn disable(&mut self) -> Result<Convergence, CoreError> {
        self.controller
            .configure_zone(self.zone_id, ZonePatch::on(false))
            .await
    }

    /// Set the watering duration in minutes.
    pub async fn set_duration(&mut self, minutes: u32) -> Result<Convergence, CoreError> {
        self.controller
            .configure_zone(self.zone_id, ZonePatch::duration(minutes))
            .await
    }
}
