//! Telemetry snapshot shared by the bridge and the panel-protocol codec.
//!
//! One `TelemetrySnapshot` arrives per simulator visual frame. Field order
//! mirrors the order in which the simulator data definition is registered.

use serde::{Deserialize, Serialize};

/// One periodic reading of the user aircraft's autopilot and cockpit state.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySnapshot {
    // ── Autopilot modes ───────────────────────────────────────────────────────
    pub autopilot_master: bool,
    pub yaw_damper: bool,
    pub heading_hold: bool,
    pub approach_hold: bool,
    pub nav_hold: bool,
    pub altitude_hold: bool,
    pub vertical_speed_hold: bool,

    // ── Autopilot bugs ────────────────────────────────────────────────────────
    pub heading_bug_deg: f64,
    pub altitude_bug_ft: f64,
    pub vertical_speed_bug_fpm: f64,

    // ── Fuel ──────────────────────────────────────────────────────────────────
    pub fuel_quantity_gal: f64,
    pub fuel_capacity_gal: f64,

    // ── Attitude / air data ───────────────────────────────────────────────────
    pub true_heading_rad: f64,
    pub indicated_altitude_ft: f64,
    pub altimeter_inhg: f64,

    // ── Weather ───────────────────────────────────────────────────────────────
    pub wind_direction_deg: f64,
    pub wind_velocity_kt: f64,

    // ── Flaps (0.0 = up, 1.0 = full) ──────────────────────────────────────────
    pub flaps_fraction: f64,
}

impl TelemetrySnapshot {
    /// True heading in whole degrees, truncated toward zero.
    pub fn heading_whole_deg(&self) -> i32 {
        finite_or_zero(self.true_heading_rad.to_degrees().trunc()) as i32
    }

    /// Indicated altitude rounded to the nearest whole foot.
    pub fn altitude_whole_ft(&self) -> i32 {
        finite_or_zero(self.indicated_altitude_ft.round()) as i32
    }

    /// Fuel on board as a percentage of capacity.
    ///
    /// Returns 0.0 when capacity is zero, negative or not a number.
    pub fn fuel_percent(&self) -> f64 {
        if self.fuel_capacity_gal.is_nan() || self.fuel_capacity_gal <= 0.0 {
            return 0.0;
        }
        finite_or_zero(self.fuel_quantity_gal / self.fuel_capacity_gal * 100.0)
    }

    /// Flap handle position as a percentage.
    pub fn flaps_percent(&self) -> f64 {
        finite_or_zero(self.flaps_fraction * 100.0)
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_all_zero() {
        let snap = TelemetrySnapshot::default();
        assert!(!snap.autopilot_master);
        assert_eq!(snap.heading_whole_deg(), 0);
        assert_eq!(snap.altitude_whole_ft(), 0);
    }

    #[test]
    fn fuel_percent_guards_zero_capacity() {
        let snap = TelemetrySnapshot {
            fuel_quantity_gal: 40.0,
            fuel_capacity_gal: 0.0,
            ..Default::default()
        };
        assert_eq!(snap.fuel_percent(), 0.0);

        let snap = TelemetrySnapshot { fuel_capacity_gal: 80.0, ..snap };
        assert!((snap.fuel_percent() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn heading_is_truncated_not_rounded() {
        let snap = TelemetrySnapshot {
            true_heading_rad: 123.9_f64.to_radians(),
            ..Default::default()
        };
        assert_eq!(snap.heading_whole_deg(), 123);
    }

    #[test]
    fn altitude_rounds_to_nearest_foot() {
        let snap = TelemetrySnapshot { indicated_altitude_ft: 3500.6, ..Default::default() };
        assert_eq!(snap.altitude_whole_ft(), 3501);
    }

    #[test]
    fn missing_json_fields_default_to_zero() {
        let snap: TelemetrySnapshot =
            serde_json::from_str(r#"{"autopilot_master":true,"indicated_altitude_ft":1200.0}"#)
                .unwrap();
        assert!(snap.autopilot_master);
        assert!((snap.indicated_altitude_ft - 1200.0).abs() < 1e-9);
        assert_eq!(snap.fuel_capacity_gal, 0.0);
    }
}
