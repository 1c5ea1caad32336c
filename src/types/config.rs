//! Typed view of the gateway's `config.json`.
//!
//! The config fetch serves two purposes: counting `battery_blocks` to learn
//! whether the site is a multi-device topology, and (from the surrounding
//! binary reply, not the JSON) harvesting a provisioning auth code.

use serde::Deserialize;

/// The subset of `config.json` the session cares about.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayConfig {
    /// Site identifier when present.
    #[serde(default)]
    pub vin: Option<String>,
    /// One entry per battery unit behind this gateway.
    #[serde(default)]
    pub battery_blocks: Vec<BatteryBlock>,
}

impl GatewayConfig {
    /// True when more than one battery unit is configured; selects the
    /// multi-device request encoding for subsequent status queries.
    #[must_use]
    pub fn is_multi_device(&self) -> bool {
        self.battery_blocks.len() > 1
    }
}

/// One configured battery unit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatteryBlock {
    /// Unit identifier when present.
    #[serde(default)]
    pub vin: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_device() {
        let config: GatewayConfig =
            serde_json::from_str(r#"{"vin": "0123", "battery_blocks": [{"vin": "A"}]}"#).unwrap();
        assert!(!config.is_multi_device());
        assert_eq!(config.vin.as_deref(), Some("0123"));
    }

    #[test]
    fn test_multi_device() {
        let config: GatewayConfig =
            serde_json::from_str(r#"{"battery_blocks": [{"vin": "A"}, {"vin": "B"}]}"#).unwrap();
        assert!(config.is_multi_device());
    }

    #[test]
    fn test_tolerates_unknown_keys() {
        let config: GatewayConfig =
            serde_json::from_str(r#"{"site_info": {"grid_code": "x"}, "strategy": "y"}"#).unwrap();
        assert!(config.battery_blocks.is_empty());
    }
}
