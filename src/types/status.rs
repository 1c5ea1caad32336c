//! Typed view of the `DeviceControllerQuery` JSON document.
//!
//! Only the fields the snapshot needs are modeled; everything else in the
//! (large) document is ignored. Depending on firmware, the gateway returns
//! the `control` object either at the top level or nested under `data`.

use serde::Deserialize;

/// Root of the status document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusRoot {
    /// The `control` subtree carrying battery and meter state.
    #[serde(default)]
    pub control: Option<ControlStatus>,
}

impl StatusRoot {
    /// Parses a status document, unwrapping a `data` envelope when present.
    ///
    /// # Errors
    ///
    /// Returns a JSON error if `text` is not a JSON object.
    pub fn parse(text: &str) -> crate::error::Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let root = value.get("data").unwrap_or(&value);
        Ok(Self::deserialize(root)?)
    }
}

/// The `control` subtree.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ControlStatus {
    /// Pack-level energy state.
    #[serde(rename = "systemStatus", default)]
    pub system_status: Option<SystemStatus>,
    /// Grid connection / islanding state.
    #[serde(default)]
    pub islanding: Option<Islanding>,
    /// Per-location power aggregates.
    #[serde(rename = "meterAggregates", default)]
    pub meter_aggregates: Vec<MeterAggregate>,
}

/// Nominal pack energy figures in watt-hours.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SystemStatus {
    #[serde(rename = "nominalFullPackEnergyWh", default)]
    pub nominal_full_pack_energy_wh: f64,
    #[serde(rename = "nominalEnergyRemainingWh", default)]
    pub nominal_energy_remaining_wh: f64,
}

/// Islanding (grid connection) state.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Islanding {
    /// BACKUP / SELF_CONSUMPTION / etc when available.
    #[serde(rename = "customerIslandMode", default)]
    pub customer_island_mode: String,
    #[serde(rename = "contactorClosed", default)]
    pub contactor_closed: bool,
    #[serde(rename = "microGridOK", default)]
    pub micro_grid_ok: bool,
    #[serde(rename = "gridOK", default)]
    pub grid_ok: bool,
}

/// One meter aggregate reading.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeterAggregate {
    /// SITE, LOAD, SOLAR or BATTERY.
    #[serde(default)]
    pub location: String,
    #[serde(rename = "realPowerW", default)]
    pub real_power_w: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "control": {
            "systemStatus": {
                "nominalFullPackEnergyWh": 13500.0,
                "nominalEnergyRemainingWh": 10125.0
            },
            "islanding": {
                "customerIslandMode": "SELF_CONSUMPTION",
                "gridOK": true
            },
            "meterAggregates": [
                {"location": "SITE", "realPowerW": -230.0},
                {"location": "LOAD", "realPowerW": 1200.0},
                {"location": "SOLAR", "realPowerW": 1800.0},
                {"location": "BATTERY", "realPowerW": -370.0}
            ]
        }
    }"#;

    #[test]
    fn test_parse_top_level_control() {
        let status = StatusRoot::parse(DOC).unwrap();
        let control = status.control.unwrap();
        let system = control.system_status.unwrap();
        assert!((system.nominal_full_pack_energy_wh - 13500.0).abs() < f64::EPSILON);
        assert!(control.islanding.unwrap().grid_ok);
        assert_eq!(control.meter_aggregates.len(), 4);
    }

    #[test]
    fn test_parse_data_envelope() {
        let wrapped = format!("{{\"data\": {DOC}}}");
        let status = StatusRoot::parse(&wrapped).unwrap();
        assert!(status.control.is_some());
    }

    #[test]
    fn test_parse_missing_fields() {
        let status = StatusRoot::parse("{}").unwrap();
        assert!(status.control.is_none());
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(StatusRoot::parse("not json").is_err());
    }
}
