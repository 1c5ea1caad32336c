//! Snapshot publication to presentation collaborators.
//!
//! Displays and radio beacons are not part of this crate; they consume the
//! snapshot through this one-method interface.

use crate::types::EnergySnapshot;

/// A consumer of telemetry snapshots (display, BLE beacon, exporter...).
pub trait SnapshotSink {
    /// Hands the latest snapshot to the collaborator.
    fn publish(&mut self, snapshot: &EnergySnapshot);
}

/// Sink that logs the snapshot through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl SnapshotSink for LogSink {
    fn publish(&mut self, snapshot: &EnergySnapshot) {
        if !snapshot.valid {
            tracing::info!("no valid gateway data yet");
            return;
        }
        tracing::info!(
            "batt={:.1}% rem={:.0}Wh full={:.0}Wh | site={:.0}W load={:.0}W solar={:.0}W battery={:.0}W | grid={} mode={}",
            snapshot.battery_percent,
            snapshot.energy_remaining_wh,
            snapshot.full_pack_energy_wh,
            snapshot.site_power_w,
            snapshot.load_power_w,
            snapshot.solar_power_w,
            snapshot.battery_power_w,
            if snapshot.grid_connected { "connected" } else { "islanded" },
            snapshot.island_mode,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_receives_snapshot() {
        #[derive(Default)]
        struct CaptureSink {
            published: Vec<EnergySnapshot>,
        }
        impl SnapshotSink for CaptureSink {
            fn publish(&mut self, snapshot: &EnergySnapshot) {
                self.published.push(snapshot.clone());
            }
        }

        let snapshot = EnergySnapshot {
            valid: true,
            battery_percent: 75.0,
            ..EnergySnapshot::default()
        };
        let mut sink = CaptureSink::default();
        sink.publish(&snapshot);
        assert_eq!(sink.published.len(), 1);
        assert!((sink.published[0].battery_percent - 75.0).abs() < f32::EPSILON);
    }
}
