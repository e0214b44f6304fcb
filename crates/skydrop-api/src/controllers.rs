// Controller endpoints
//
// Discovery, configuration and live-state reads, watering commands, and
// configuration writes. All paths are relative to the API root.

use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{
    AllConfigResponse, CommandAck, ControllerIdsResponse, ControllerPatch,
    DefaultControllerResponse, WaterStateResponse, WriteAck, ZonePatch,
};

impl ApiClient {
    // ── Discovery ────────────────────────────────────────────────────

    /// List every controller on the account.
    ///
    /// `GET users/get.controller.ids`
    pub async fn list_controller_ids(&self) -> Result<ControllerIdsResponse, Error> {
        let url = self.api_url("users/get.controller.ids")?;
        debug!("listing controller ids");
        self.get(url).await
    }

    /// The account's default (single) controller.
    ///
    /// `GET users/default.controller.id`
    pub async fn default_controller_id(&self) -> Result<DefaultControllerResponse, Error> {
        let url = self.api_url("users/default.controller.id")?;
        debug!("fetching default controller id");
        self.get(url).await
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Controller and zone configuration.
    ///
    /// `GET controllers/{id}/all.config`
    pub async fn get_all_config(&self, controller_id: &str) -> Result<AllConfigResponse, Error> {
        let url = self.api_url(&format!("controllers/{controller_id}/all.config"))?;
        self.get(url).await
    }

    /// Live watering state of every zone.
    ///
    /// `GET controllers/{id}/water.state`
    pub async fn get_water_state(&self, controller_id: &str) -> Result<WaterStateResponse, Error> {
        let url = self.api_url(&format!("controllers/{controller_id}/water.state"))?;
        self.get(url).await
    }

    // ── Watering commands ────────────────────────────────────────────

    /// Start watering one zone.
    ///
    /// `POST controllers/{id}/zones/{zone}/water.zone`
    pub async fn water_zone(&self, controller_id: &str, zone_id: u32) -> Result<CommandAck, Error> {
        let url = self.api_url(&format!(
            "controllers/{controller_id}/zones/{zone_id}/water.zone"
        ))?;
        debug!(controller_id, zone_id, "starting zone watering");
        self.post(url).await
    }

    /// Stop whatever the controller is watering.
    ///
    /// `POST controllers/{id}/water.stop`
    pub async fn stop_watering(&self, controller_id: &str) -> Result<CommandAck, Error> {
        let url = self.api_url(&format!("controllers/{controller_id}/water.stop"))?;
        debug!(controller_id, "stopping watering");
        self.post(url).await
    }

    // ── Configuration writes ─────────────────────────────────────────

    /// Write controller-level configuration fields.
    ///
    /// `PUT controllers/{id}/controller.config`
    pub async fn put_controller_config(
        &self,
        controller_id: &str,
        patch: &ControllerPatch,
    ) -> Result<WriteAck, Error> {
        let url = self.api_url(&format!("controllers/{controller_id}/controller.config"))?;
        debug!(controller_id, ?patch, "writing controller config");
        self.put(url, patch).await
    }

    /// Write zone-level configuration fields.
    ///
    /// `PUT controllers/{id}/zone.config/{zone}`
    pub async fn put_zone_config(
        &self,
        controller_id: &str,
        zone_id: u32,
        patch: &ZonePatch,
    ) -> Result<WriteAck, Error> {
        let url = self.api_url(&format!("controllers/{controller_id}/zone.config/{zone_id}"))?;
        debug!(controller_id, zone_id, ?patch, "writing zone config");
        self.put(url, patch).await
    }
}
