//! Telemetry snapshot exposed to presentation and beacon collaborators.

use std::time::Instant;

use crate::types::status::StatusRoot;

/// Read-only snapshot of the gateway's energy state.
///
/// Power signs follow the gateway's convention: site is grid import(+) /
/// export(-), battery is discharge(+) / charge(-).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnergySnapshot {
    /// True once at least one status query has produced usable numbers.
    pub valid: bool,
    /// Battery state of charge, 0-100.
    pub battery_percent: f32,
    /// Nominal energy remaining in Wh.
    pub energy_remaining_wh: f32,
    /// Nominal full pack energy in Wh.
    pub full_pack_energy_wh: f32,
    /// Grid import/export power in W.
    pub site_power_w: f32,
    /// House consumption in W.
    pub load_power_w: f32,
    /// Solar production in W.
    pub solar_power_w: f32,
    /// Battery discharge/charge power in W.
    pub battery_power_w: f32,
    /// From the islanding state; false when the site is islanded.
    pub grid_connected: bool,
    /// BACKUP / SELF_CONSUMPTION / etc when reported.
    pub island_mode: String,
    /// When the snapshot was last refreshed.
    pub updated_at: Option<Instant>,
}

impl EnergySnapshot {
    /// Folds a parsed status document into the snapshot.
    ///
    /// The snapshot only becomes (or stays) valid when the document carries
    /// positive pack-energy figures, so one bad poll never zeroes out the
    /// last good reading.
    pub fn apply_status(&mut self, status: &StatusRoot) -> bool {
        let Some(control) = &status.control else {
            return false;
        };
        let Some(system) = &control.system_status else {
            return false;
        };

        let remaining = system.nominal_energy_remaining_wh as f32;
        let total = system.nominal_full_pack_energy_wh as f32;
        if total <= 0.0 || remaining <= 0.0 {
            return false;
        }

        self.battery_percent = (remaining / total) * 100.0;
        self.energy_remaining_wh = remaining;
        self.full_pack_energy_wh = total;

        if let Some(islanding) = &control.islanding {
            self.grid_connected = islanding.grid_ok;
            self.island_mode = islanding.customer_island_mode.clone();
        }

        self.site_power_w = 0.0;
        self.load_power_w = 0.0;
        self.solar_power_w = 0.0;
        self.battery_power_w = 0.0;
        for aggregate in &control.meter_aggregates {
            let power = aggregate.real_power_w as f32;
            match aggregate.location.as_str() {
                "SITE" => self.site_power_w = power,
                "LOAD" => self.load_power_w = power,
                "SOLAR" => self.solar_power_w = power,
                "BATTERY" => self.battery_power_w = power,
                _ => {}
            }
        }

        self.valid = true;
        self.updated_at = Some(Instant::now());
        true
    }
}
