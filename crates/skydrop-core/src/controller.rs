// ── Controller entity ──
//
// One physical irrigation controller and the zones under it. Refreshes
// merge server snapshots into the existing entities in place: zones are
// created on first sight and never dropped. Configuration writes go
// through the convergence engine in `converge.rs`.

use std::sync::Arc;

use skydrop_api::ApiClient;
use skydrop_api::models::{ControllerData, ControllerPatch, WriteAck, ZonePatch, ZoneStateData};
use tracing::debug;

use crate::config::ConvergencePolicy;
use crate::converge::{self, ConfigPatch, ConfigTarget, Convergence};
use crate::error::CoreError;
use crate::zone::{Zone, ZoneControl};

/// A Skydrop controller discovered on the account.
///
/// Shares the session's [`ApiClient`] with its siblings; mutation needs
/// `&mut self`, so refreshes and writes on one controller are serialized
/// by the borrow checker.
#[derive(Debug)]
pub struct Controller {
    id: String,
    name: Option<String>,
    api: Arc<ApiClient>,
    policy: ConvergencePolicy,
    config: ControllerData,
    zone_states: Vec<ZoneStateData>,
    zones: Vec<Zone>,
}

impl Controller {
    pub(crate) fn new(
        id: String,
        name: Option<String>,
        api: Arc<ApiClient>,
        policy: ConvergencePolicy,
    ) -> Self {
        Self {
            id,
            name,
            api,
            policy,
            config: ControllerData::default(),
            zone_states: Vec::new(),
            zones: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name, from discovery until a configuration snapshot names it.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.config.on.unwrap_or(false)
    }

    /// Last configuration snapshot.
    pub fn config(&self) -> &ControllerData {
        &self.config
    }

    /// Last zone-state list the server reported successfully.
    pub fn zone_states(&self) -> &[ZoneStateData] {
        &self.zone_states
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn zone(&self, zone_id: u32) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id() == zone_id)
    }

    /// Command handle for a known zone.
    pub fn zone_control(&mut self, zone_id: u32) -> Option<ZoneControl<'_>> {
        self.zone(zone_id)?;
        Some(ZoneControl::new(self, zone_id))
    }

    pub fn convergence_policy(&self) -> ConvergencePolicy {
        self.policy
    }

    pub fn set_convergence_policy(&mut self, policy: ConvergencePolicy) {
        self.policy = policy;
    }

    fn describe(&self) -> String {
        format!("controller {}", self.id)
    }

    // ── Refresh ──────────────────────────────────────────────────────

    /// Refresh configuration, then live state. State entries attach to
    /// zones, so the configuration pass has to create them first.
    pub async fn refresh(&mut self) -> Result<(), CoreError> {
        self.refresh_data().await?;
        self.refresh_state().await
    }

    /// Fetch `all.config` and merge it into the controller and its zones.
    pub async fn refresh_data(&mut self) -> Result<(), CoreError> {
        let resp = self.api.get_all_config(&self.id).await?;

        if let Some(data) = resp.controller_data {
            if let Some(name) = &data.name {
                self.name = Some(name.clone());
            }
            self.config = data;
        }

        for zone_data in resp.zones_data.unwrap_or_default() {
            let Some(zone_id) = zone_data.zone_num.filter(|n| *n != 0) else {
                continue;
            };
            match find_zone_mut(&mut self.zones, zone_id) {
                Some(zone) => zone.apply_config(zone_data),
                None => {
                    debug!(controller = %self.id, zone_id, "discovered zone");
                    self.zones.push(Zone::new(self.id.clone(), zone_id, zone_data));
                }
            }
        }

        Ok(())
    }

    /// Fetch `water.state` and apply it to known zones.
    ///
    /// An unsuccessful response keeps the cached zone-state list and
    /// re-applies it.
    pub async fn refresh_state(&mut self) -> Result<(), CoreError> {
        let resp = self.api.get_water_state(&self.id).await?;

        match resp.into_zone_states() {
            Some(states) => self.zone_states = states,
            None => debug!(controller = %self.id, "water state unavailable; keeping cached zone states"),
        }

        for state in &self.zone_states {
            let Some(zone_id) = state.zone_id.filter(|n| *n != 0) else {
                continue;
            };
            if let Some(zone) = find_zone_mut(&mut self.zones, zone_id) {
                zone.apply_state(state.clone());
            }
        }

        Ok(())
    }

    // ── Watering commands ────────────────────────────────────────────

    /// Start watering a zone. `Ok(false)` means the service did not accept
    /// the command.
    pub async fn start_watering(&mut self, zone_id: u32) -> Result<bool, CoreError> {
        let ack = self.api.water_zone(&self.id, zone_id).await?;
        if !ack.is_accepted() {
            return Ok(false);
        }
        self.refresh_state().await?;
        Ok(true)
    }

    /// Stop all watering on this controller.
    pub async fn stop_watering(&mut self) -> Result<bool, CoreError> {
        let ack = self.api.stop_watering(&self.id).await?;
        if !ack.is_accepted() {
            return Ok(false);
        }
        self.refresh_state().await?;
        Ok(true)
    }

    // ── Configuration writes ─────────────────────────────────────────

    pub async fn enable(&mut self) -> Result<Convergence, CoreError> {
        self.configure(ControllerPatch::on(true)).await
    }

    pub async fn disable(&mut self) -> Result<Convergence, CoreError> {
        self.configure(ControllerPatch::on(false)).await
    }

    pub async fn set_name(&mut self, name: impl Into<String>) -> Result<Convergence, CoreError> {
        self.configure(ControllerPatch::name(name)).await
    }

    /// Write controller fields and wait for them to read back.
    pub async fn configure(&mut self, patch: ControllerPatch) -> Result<Convergence, CoreError> {
        let policy = self.policy;
        converge::apply(&mut ControllerTarget(self), &patch, policy).await
    }

    /// Write zone fields and wait for them to read back.
    pub async fn configure_zone(
        &mut self,
        zone_id: u32,
        patch: ZonePatch,
    ) -> Result<Convergence, CoreError> {
        if self.zone(zone_id).is_none() {
            return Err(CoreError::ZoneNotFound {
                controller: self.id.clone(),
                zone: zone_id,
            });
        }
        let policy = self.policy;
        let mut target = ZoneTarget {
            controller: self,
            zone_id,
        };
        converge::apply(&mut target, &patch, policy).await
    }
}

fn find_zone_mut(zones: &mut [Zone], zone_id: u32) -> Option<&mut Zone> {
    zones.iter_mut().find(|z| z.id() == zone_id)
}

// ── Convergence targets ─────────────────────────────────────────────

struct ControllerTarget<'a>(&'a mut Controller);

impl ConfigTarget for ControllerTarget<'_> {
    type Patch = ControllerPatch;

    fn describe(&self) -> String {
        self.0.describe()
    }

    async fn submit(&self, patch: &ControllerPatch) -> Result<WriteAck, CoreError> {
        Ok(self.0.api.put_controller_config(&self.0.id, patch).await?)
    }

    async fn reload(&mut self) -> Result<(), CoreError> {
        self.0.refresh_data().await
    }

    fn pending(&self, patch: &ControllerPatch) -> Vec<&'static str> {
        patch.pending_fields(&self.0.config)
    }
}

struct ZoneTarget<'a> {
    controller: &'a mut Controller,
    zone_id: u32,
}

impl ConfigTarget for ZoneTarget<'_> {
    type Patch = ZonePatch;

    fn describe(&self) -> String {
        format!("zone {} of {}", self.zone_id, self.controller.describe())
    }

    async fn submit(&self, patch: &ZonePatch) -> Result<WriteAck, CoreError> {
        let c = &self.controller;
        Ok(c.api.put_zone_config(&c.id, self.zone_id, patch).await?)
    }

    async fn reload(&mut self) -> Result<(), CoreError> {
        self.controller.refresh_data().await
    }

    fn pending(&self, patch: &ZonePatch) -> Vec<&'static str> {
        match self.controller.zone(self.zone_id) {
            Some(zone) => patch.pending_fields(zone.config()),
            None => patch.pending_fields(&Default::default()),
        }
    }
}
