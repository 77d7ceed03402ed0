//! Unit and limit model.
//!
//! [`AxisConfig`] holds the persisted per-axis settings and the stateless
//! transform between two coordinate systems:
//!
//! - **raw** units are what the controller speaks (steps, encoder counts,
//!   register values);
//! - **scaled** units are what callers use (mm, degrees).
//!
//! ```text
//! raw    = scale * scaled + offset_raw
//! scaled = slope * (raw - offset_raw)        slope = 1 / scale
//! ```
//!
//! A negative scale inverts the axis. Raw bounds keep their raw meaning
//! (`lower_*_raw <= upper_*_raw` always), so the scaled-space accessors swap
//! which raw bound they read when the axis is inverted. Callers always see
//! `lower_limit_soft() <= upper_limit_soft()`.
//!
//! Soft-limit checks compare raw values, so an inverted axis reports
//! [`StatusCode::DestBelowLowerLimit`] for a destination below the *raw*
//! lower soft bound.

use crate::status::StatusCode;
use serde::{Deserialize, Deserializer, Serialize};

/// Value substituted for a zero scale so the slope stays finite.
pub const SCALE_EPSILON: f64 = 1e-6;

/// Persisted record keys, as written to the [`ConfigStore`](crate::ConfigStore).
pub mod keys {
    /// Display label of the scaled unit.
    pub const AXIS_UNITS: &str = "axisUnits";
    /// Raw units per scaled unit.
    pub const SCALE: &str = "scale";
    /// Raw position of scaled zero.
    pub const OFFSET_RAW: &str = "offsetRaw";
    /// Speed used while homing.
    pub const INITIALIZE_SPEED_RAW: &str = "initializeSpeedRaw";
    /// Speed restored after composite operations.
    pub const DEFAULT_SPEED_RAW: &str = "defaultSpeedRaw";
    /// Acceleration restored after composite operations.
    pub const DEFAULT_ACCELERATION_RAW: &str = "defaultAccelerationRaw";
    /// Device lower bound.
    pub const LOWER_LIMIT_HARD_RAW: &str = "lowerLimitHardRaw";
    /// User lower bound.
    pub const LOWER_LIMIT_SOFT_RAW: &str = "lowerLimitSoftRaw";
    /// Device upper bound.
    pub const UPPER_LIMIT_HARD_RAW: &str = "upperLimitHardRaw";
    /// User upper bound.
    pub const UPPER_LIMIT_SOFT_RAW: &str = "upperLimitSoftRaw";
    /// Limit switches fitted.
    pub const HAS_LIMITS: &str = "hasLimits";
    /// Home switch fitted.
    pub const HAS_HOME: &str = "hasHome";
    /// Encoder index fitted.
    pub const HAS_INDEX: &str = "hasIndex";
    /// Auxiliary encoder fitted.
    pub const HAS_AUX_ENCODER: &str = "hasAuxEncoder";
    /// Auxiliary encoder raw units per scaled unit.
    pub const AUX_ENCODER_SCALE: &str = "auxEncoderScale";
    /// Auxiliary encoder raw position of scaled zero.
    pub const AUX_ENCODER_OFFSET_RAW: &str = "auxEncoderOffsetRaw";
}

/// Per-axis configuration and coordinate transform.
///
/// Serialized with the camelCase keys in [`keys`]. Unknown keys found in a
/// stored record (backend-specific settings such as a controller axis index)
/// are kept in [`AxisConfig::extra`] and written back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AxisConfig {
    /// Display label for scaled units.
    pub axis_units: String,
    #[serde(deserialize_with = "nonzero_scale")]
    scale: f64,
    offset_raw: f64,
    lower_limit_hard_raw: f64,
    upper_limit_hard_raw: f64,
    lower_limit_soft_raw: f64,
    upper_limit_soft_raw: f64,
    /// Speed passed to homing searches during initialize.
    pub initialize_speed_raw: f64,
    /// Speed restored after every composite operation.
    pub default_speed_raw: f64,
    /// Acceleration restored after every composite operation.
    pub default_acceleration_raw: f64,
    /// Axis has end-of-travel switches.
    pub has_limits: bool,
    /// Axis has a home switch.
    pub has_home: bool,
    /// Axis encoder has an index pulse.
    pub has_index: bool,
    /// Axis has an auxiliary (secondary) encoder.
    pub has_aux_encoder: bool,
    #[serde(deserialize_with = "nonzero_scale")]
    aux_encoder_scale: f64,
    aux_encoder_offset_raw: f64,
    /// Backend-specific keys, not interpreted here.
    #[serde(flatten)]
    pub extra: toml::Table,
}

fn coerce_scale(scale: f64) -> f64 {
    if scale == 0.0 {
        SCALE_EPSILON
    } else {
        scale
    }
}

fn nonzero_scale<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    f64::deserialize(deserializer).map(coerce_scale)
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            axis_units: "mm".to_string(),
            scale: 1.0,
            offset_raw: 0.0,
            lower_limit_hard_raw: -1.0e9,
            upper_limit_hard_raw: 1.0e9,
            lower_limit_soft_raw: -1.0e9,
            upper_limit_soft_raw: 1.0e9,
            initialize_speed_raw: 100.0,
            default_speed_raw: 1000.0,
            default_acceleration_raw: 10_000.0,
            has_limits: false,
            has_home: true,
            has_index: false,
            has_aux_encoder: false,
            aux_encoder_scale: 1.0,
            aux_encoder_offset_raw: 0.0,
            extra: toml::Table::new(),
        }
    }
}

impl AxisConfig {
    /// Set the scale (builder style). Zero is coerced to [`SCALE_EPSILON`].
    #[must_use]
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.set_scale(scale);
        self
    }

    /// Set the raw offset (builder style).
    #[must_use]
    pub fn with_offset_raw(mut self, offset_raw: f64) -> Self {
        self.offset_raw = offset_raw;
        self
    }

    /// Set the unit label (builder style).
    #[must_use]
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.axis_units = units.into();
        self
    }

    /// Set the hard limits in raw units (builder style).
    ///
    /// Bounds are ordered, and the soft limits are pulled inside the new range.
    #[must_use]
    pub fn with_hard_limits_raw(mut self, a: f64, b: f64) -> Self {
        self.lower_limit_hard_raw = a.min(b);
        self.upper_limit_hard_raw = a.max(b);
        self.normalize();
        self
    }

    /// Set the soft limits in raw units (builder style), clamped to the hard range.
    #[must_use]
    pub fn with_soft_limits_raw(mut self, a: f64, b: f64) -> Self {
        self.lower_limit_soft_raw = a.min(b);
        self.upper_limit_soft_raw = a.max(b);
        self.normalize();
        self
    }

    /// Set the capability flags (builder style).
    #[must_use]
    pub fn with_capabilities(mut self, has_limits: bool, has_home: bool, has_index: bool) -> Self {
        self.has_limits = has_limits;
        self.has_home = has_home;
        self.has_index = has_index;
        self
    }

    /// Enable the auxiliary encoder with its own transform (builder style).
    #[must_use]
    pub fn with_aux_encoder(mut self, scale: f64, offset_raw: f64) -> Self {
        self.has_aux_encoder = true;
        self.aux_encoder_scale = coerce_scale(scale);
        self.aux_encoder_offset_raw = offset_raw;
        self
    }

    /// Restore the limit invariants after loading an arbitrary record.
    ///
    /// Orders both bound pairs and clamps the soft range into the hard range.
    /// Returns `true` if anything changed.
    pub fn normalize(&mut self) -> bool {
        let before = (
            self.lower_limit_hard_raw,
            self.upper_limit_hard_raw,
            self.lower_limit_soft_raw,
            self.upper_limit_soft_raw,
        );

        if self.lower_limit_hard_raw > self.upper_limit_hard_raw {
            std::mem::swap(&mut self.lower_limit_hard_raw, &mut self.upper_limit_hard_raw);
        }
        if self.lower_limit_soft_raw > self.upper_limit_soft_raw {
            std::mem::swap(&mut self.lower_limit_soft_raw, &mut self.upper_limit_soft_raw);
        }
        let (lo, hi) = (self.lower_limit_hard_raw, self.upper_limit_hard_raw);
        self.lower_limit_soft_raw = self.lower_limit_soft_raw.clamp(lo, hi);
        self.upper_limit_soft_raw = self.upper_limit_soft_raw.clamp(lo, hi);
        self.scale = coerce_scale(self.scale);
        self.aux_encoder_scale = coerce_scale(self.aux_encoder_scale);

        before
            != (
                self.lower_limit_hard_raw,
                self.upper_limit_hard_raw,
                self.lower_limit_soft_raw,
                self.upper_limit_soft_raw,
            )
    }

    // ------------------------------------------------------------------
    // Transform
    // ------------------------------------------------------------------

    /// Raw units per scaled unit. Never zero.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Scaled units per raw unit (`1 / scale`). Always finite.
    #[must_use]
    pub fn slope(&self) -> f64 {
        1.0 / self.scale
    }

    /// Raw position corresponding to scaled zero.
    #[must_use]
    pub fn offset_raw(&self) -> f64 {
        self.offset_raw
    }

    /// True when the scale is negative.
    #[must_use]
    pub fn is_inverted(&self) -> bool {
        self.scale < 0.0
    }

    /// Replace the scale. `0.0` is stored as [`SCALE_EPSILON`].
    pub fn set_scale(&mut self, scale: f64) {
        self.scale = coerce_scale(scale);
    }

    /// Replace the raw offset.
    pub fn set_offset_raw(&mut self, offset_raw: f64) {
        self.offset_raw = offset_raw;
    }

    /// Scaled position to raw position.
    #[must_use]
    pub fn to_raw(&self, scaled: f64) -> f64 {
        self.scale * scaled + self.offset_raw
    }

    /// Raw position to scaled position.
    #[must_use]
    pub fn to_scaled(&self, raw: f64) -> f64 {
        self.slope() * (raw - self.offset_raw)
    }

    /// Scaled distance to raw distance (no offset, sign follows the scale).
    #[must_use]
    pub fn distance_to_raw(&self, scaled: f64) -> f64 {
        self.scale * scaled
    }

    /// Scaled speed or acceleration magnitude to raw.
    #[must_use]
    pub fn rate_to_raw(&self, scaled: f64) -> f64 {
        (self.scale * scaled).abs()
    }

    /// Raw speed or acceleration magnitude to scaled.
    #[must_use]
    pub fn rate_to_scaled(&self, raw: f64) -> f64 {
        (self.slope() * raw).abs()
    }

    // ------------------------------------------------------------------
    // Limits
    // ------------------------------------------------------------------

    /// Raw lower hard bound.
    #[must_use]
    pub fn lower_limit_hard_raw(&self) -> f64 {
        self.lower_limit_hard_raw
    }

    /// Raw upper hard bound.
    #[must_use]
    pub fn upper_limit_hard_raw(&self) -> f64 {
        self.upper_limit_hard_raw
    }

    /// Raw lower soft bound.
    #[must_use]
    pub fn lower_limit_soft_raw(&self) -> f64 {
        self.lower_limit_soft_raw
    }

    /// Raw upper soft bound.
    #[must_use]
    pub fn upper_limit_soft_raw(&self) -> f64 {
        self.upper_limit_soft_raw
    }

    /// Lower hard limit in scaled units.
    #[must_use]
    pub fn lower_limit_hard(&self) -> f64 {
        if self.is_inverted() {
            self.to_scaled(self.upper_limit_hard_raw)
        } else {
            self.to_scaled(self.lower_limit_hard_raw)
        }
    }

    /// Upper hard limit in scaled units.
    #[must_use]
    pub fn upper_limit_hard(&self) -> f64 {
        if self.is_inverted() {
            self.to_scaled(self.lower_limit_hard_raw)
        } else {
            self.to_scaled(self.upper_limit_hard_raw)
        }
    }

    /// Lower soft limit in scaled units.
    #[must_use]
    pub fn lower_limit_soft(&self) -> f64 {
        if self.is_inverted() {
            self.to_scaled(self.upper_limit_soft_raw)
        } else {
            self.to_scaled(self.lower_limit_soft_raw)
        }
    }

    /// Upper soft limit in scaled units.
    #[must_use]
    pub fn upper_limit_soft(&self) -> f64 {
        if self.is_inverted() {
            self.to_scaled(self.lower_limit_soft_raw)
        } else {
            self.to_scaled(self.upper_limit_soft_raw)
        }
    }

    /// Check a raw destination against the soft limits.
    pub fn check_soft_limits(&self, raw_dest: f64) -> Result<(), StatusCode> {
        if raw_dest < self.lower_limit_soft_raw {
            Err(StatusCode::DestBelowLowerLimit)
        } else if raw_dest > self.upper_limit_soft_raw {
            Err(StatusCode::DestAboveUpperLimit)
        } else {
            Ok(())
        }
    }

    fn check_hard_limits(&self, raw: f64) -> Result<(), StatusCode> {
        if raw < self.lower_limit_hard_raw {
            Err(StatusCode::DestBelowLowerLimit)
        } else if raw > self.upper_limit_hard_raw {
            Err(StatusCode::DestAboveUpperLimit)
        } else {
            Ok(())
        }
    }

    /// Set the scaled lower soft limit.
    ///
    /// Stored into the raw upper bound when the axis is inverted. Rejected,
    /// leaving the config untouched, when the raw value falls outside the
    /// hard range or would cross the opposite soft bound.
    ///
    /// Returns the raw key that was written.
    pub fn set_lower_limit_soft(&mut self, scaled: f64) -> Result<&'static str, StatusCode> {
        let raw = self.to_raw(scaled);
        self.check_hard_limits(raw)?;
        if self.is_inverted() {
            if raw < self.lower_limit_soft_raw {
                return Err(StatusCode::DestBelowLowerLimit);
            }
            self.upper_limit_soft_raw = raw;
            Ok(keys::UPPER_LIMIT_SOFT_RAW)
        } else {
            if raw > self.upper_limit_soft_raw {
                return Err(StatusCode::DestAboveUpperLimit);
            }
            self.lower_limit_soft_raw = raw;
            Ok(keys::LOWER_LIMIT_SOFT_RAW)
        }
    }

    /// Set the scaled upper soft limit. Mirror of [`set_lower_limit_soft`](Self::set_lower_limit_soft).
    pub fn set_upper_limit_soft(&mut self, scaled: f64) -> Result<&'static str, StatusCode> {
        let raw = self.to_raw(scaled);
        self.check_hard_limits(raw)?;
        if self.is_inverted() {
            if raw > self.upper_limit_soft_raw {
                return Err(StatusCode::DestAboveUpperLimit);
            }
            self.lower_limit_soft_raw = raw;
            Ok(keys::LOWER_LIMIT_SOFT_RAW)
        } else {
            if raw < self.lower_limit_soft_raw {
                return Err(StatusCode::DestBelowLowerLimit);
            }
            self.upper_limit_soft_raw = raw;
            Ok(keys::UPPER_LIMIT_SOFT_RAW)
        }
    }

    // ------------------------------------------------------------------
    // Auxiliary encoder
    //
    // Without an aux encoder every accessor falls back to the primary
    // transform.
    // ------------------------------------------------------------------

    /// Aux encoder scale, or the primary scale without an aux encoder.
    #[must_use]
    pub fn aux_encoder_scale(&self) -> f64 {
        if self.has_aux_encoder {
            self.aux_encoder_scale
        } else {
            self.scale()
        }
    }

    /// Aux encoder raw offset, or the primary offset without an aux encoder.
    #[must_use]
    pub fn aux_encoder_offset_raw(&self) -> f64 {
        if self.has_aux_encoder {
            self.aux_encoder_offset_raw
        } else {
            self.offset_raw()
        }
    }

    /// Aux encoder raw reading to scaled position.
    #[must_use]
    pub fn aux_to_scaled(&self, raw: f64) -> f64 {
        if self.has_aux_encoder {
            (raw - self.aux_encoder_offset_raw) / self.aux_encoder_scale
        } else {
            self.to_scaled(raw)
        }
    }

    /// Scaled position to aux encoder raw reading.
    #[must_use]
    pub fn aux_to_raw(&self, scaled: f64) -> f64 {
        if self.has_aux_encoder {
            self.aux_encoder_scale * scaled + self.aux_encoder_offset_raw
        } else {
            self.to_raw(scaled)
        }
    }

    /// Replace the aux encoder scale. Ignored by accessors without an aux encoder.
    pub fn set_aux_encoder_scale(&mut self, scale: f64) {
        self.aux_encoder_scale = coerce_scale(scale);
    }

    /// Replace the aux encoder raw offset. Ignored by accessors without an aux encoder.
    pub fn set_aux_encoder_offset_raw(&mut self, offset_raw: f64) {
        self.aux_encoder_offset_raw = offset_raw;
    }

    // ------------------------------------------------------------------
    // Persistence helpers
    // ------------------------------------------------------------------

    /// Serialize into a flat key/value record.
    pub fn to_table(&self) -> Result<toml::Table, toml::ser::Error> {
        toml::Table::try_from(self)
    }

    /// Build a config from stored values overlaid on the defaults.
    pub fn from_stored(stored: toml::Table) -> Result<Self, toml::de::Error> {
        let mut merged = Self::default()
            .to_table()
            .unwrap_or_default();
        merged.extend(stored);
        let mut config: AxisConfig = toml::Value::Table(merged).try_into()?;
        config.normalize();
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn scaled_move_destination() {
        let cfg = AxisConfig::default()
            .with_scale(100.0)
            .with_hard_limits_raw(-1.0e6, 1.0e6)
            .with_soft_limits_raw(0.0, 20_000.0);

        let raw = cfg.to_raw(100.0);
        assert_eq!(raw, 10_000.0);
        assert_eq!(cfg.check_soft_limits(raw), Ok(()));
        assert_eq!(
            cfg.check_soft_limits(cfg.to_raw(-0.5)),
            Err(StatusCode::DestBelowLowerLimit)
        );
        assert_eq!(
            cfg.check_soft_limits(cfg.to_raw(200.5)),
            Err(StatusCode::DestAboveUpperLimit)
        );
    }

    #[test]
    fn inverted_axis_swaps_hard_limits() {
        let cfg = AxisConfig::default()
            .with_scale(-1.0)
            .with_hard_limits_raw(-108.0, 172.5);

        assert_eq!(
            cfg.upper_limit_hard(),
            cfg.slope() * (cfg.lower_limit_hard_raw() - cfg.offset_raw())
        );
        assert_eq!(cfg.upper_limit_hard(), 108.0);
        assert_eq!(cfg.lower_limit_hard(), -172.5);
        assert!(cfg.lower_limit_hard() <= cfg.upper_limit_hard());
    }

    #[test]
    fn zero_scale_is_coerced() {
        let mut cfg = AxisConfig::default();
        cfg.set_scale(0.0);
        assert_eq!(cfg.scale(), SCALE_EPSILON);
        assert!(cfg.slope().is_finite());
        assert!(approx(cfg.slope(), 1e6));
    }

    #[test]
    fn zero_scale_in_stored_record_is_coerced() {
        let mut stored = toml::Table::new();
        stored.insert(keys::SCALE.into(), toml::Value::Float(0.0));
        let cfg = AxisConfig::from_stored(stored).unwrap();
        assert_eq!(cfg.scale(), SCALE_EPSILON);
    }

    #[test]
    fn soft_limit_outside_hard_range_is_rejected() {
        let mut cfg = AxisConfig::default()
            .with_scale(10.0)
            .with_hard_limits_raw(0.0, 1000.0);
        let before = cfg.clone();

        assert_eq!(
            cfg.set_lower_limit_soft(-1.0),
            Err(StatusCode::DestBelowLowerLimit)
        );
        assert_eq!(
            cfg.set_upper_limit_soft(100.5),
            Err(StatusCode::DestAboveUpperLimit)
        );
        assert_eq!(cfg, before);

        assert_eq!(cfg.set_upper_limit_soft(50.0), Ok(keys::UPPER_LIMIT_SOFT_RAW));
        assert_eq!(cfg.upper_limit_soft_raw(), 500.0);
    }

    #[test]
    fn inverted_soft_limit_writes_opposite_raw_field() {
        let mut cfg = AxisConfig::default()
            .with_scale(-2.0)
            .with_hard_limits_raw(-100.0, 100.0);

        // scaled lower bound maps to the raw upper bound
        assert_eq!(cfg.set_lower_limit_soft(-10.0), Ok(keys::UPPER_LIMIT_SOFT_RAW));
        assert_eq!(cfg.upper_limit_soft_raw(), 20.0);
        assert_eq!(cfg.lower_limit_soft(), -10.0);

        assert_eq!(cfg.set_upper_limit_soft(5.0), Ok(keys::LOWER_LIMIT_SOFT_RAW));
        assert_eq!(cfg.lower_limit_soft_raw(), -10.0);
        assert_eq!(cfg.upper_limit_soft(), 5.0);
    }

    #[test]
    fn crossing_soft_limits_are_rejected() {
        let mut cfg = AxisConfig::default()
            .with_hard_limits_raw(0.0, 100.0)
            .with_soft_limits_raw(10.0, 20.0);

        assert_eq!(
            cfg.set_lower_limit_soft(30.0),
            Err(StatusCode::DestAboveUpperLimit)
        );
        assert_eq!(
            cfg.set_upper_limit_soft(5.0),
            Err(StatusCode::DestBelowLowerLimit)
        );
        assert_eq!(cfg.lower_limit_soft_raw(), 10.0);
        assert_eq!(cfg.upper_limit_soft_raw(), 20.0);
    }

    #[test]
    fn aux_encoder_falls_back_to_primary() {
        let cfg = AxisConfig::default().with_scale(4.0).with_offset_raw(8.0);
        assert!(!cfg.has_aux_encoder);
        assert_eq!(cfg.aux_encoder_scale(), 4.0);
        assert_eq!(cfg.aux_encoder_offset_raw(), 8.0);
        assert_eq!(cfg.aux_to_scaled(16.0), cfg.to_scaled(16.0));
        assert_eq!(cfg.aux_to_raw(3.0), cfg.to_raw(3.0));

        let cfg = cfg.with_aux_encoder(1000.0, 50.0);
        assert_eq!(cfg.aux_encoder_scale(), 1000.0);
        assert_eq!(cfg.aux_to_scaled(2050.0), 2.0);
        assert_eq!(cfg.aux_to_raw(2.0), 2050.0);
    }

    #[test]
    fn rates_are_magnitudes() {
        let cfg = AxisConfig::default().with_scale(-50.0);
        assert_eq!(cfg.rate_to_raw(2.0), 100.0);
        assert_eq!(cfg.rate_to_scaled(100.0), 2.0);
        assert_eq!(cfg.distance_to_raw(2.0), -100.0);
    }

    #[test]
    fn stored_record_keeps_backend_keys() {
        let mut stored = toml::Table::new();
        stored.insert("serialAxisIndex".into(), toml::Value::Integer(2));
        stored.insert(keys::SCALE.into(), toml::Value::Integer(400));
        stored.insert(keys::HAS_INDEX.into(), toml::Value::Boolean(true));

        let cfg = AxisConfig::from_stored(stored).unwrap();
        assert_eq!(cfg.scale(), 400.0);
        assert!(cfg.has_index);
        assert_eq!(cfg.extra.get("serialAxisIndex"), Some(&toml::Value::Integer(2)));

        let table = cfg.to_table().unwrap();
        assert_eq!(table.get("serialAxisIndex"), Some(&toml::Value::Integer(2)));
        assert_eq!(table.get(keys::SCALE), Some(&toml::Value::Float(400.0)));
        for key in [
            keys::AXIS_UNITS,
            keys::OFFSET_RAW,
            keys::INITIALIZE_SPEED_RAW,
            keys::DEFAULT_SPEED_RAW,
            keys::DEFAULT_ACCELERATION_RAW,
            keys::LOWER_LIMIT_HARD_RAW,
            keys::LOWER_LIMIT_SOFT_RAW,
            keys::UPPER_LIMIT_HARD_RAW,
            keys::UPPER_LIMIT_SOFT_RAW,
            keys::HAS_LIMITS,
            keys::HAS_HOME,
            keys::HAS_AUX_ENCODER,
            keys::AUX_ENCODER_SCALE,
            keys::AUX_ENCODER_OFFSET_RAW,
        ] {
            assert!(table.contains_key(key), "missing {key}");
        }
    }

    #[test]
    fn stored_soft_limits_are_clamped_into_hard_range() {
        let mut stored = toml::Table::new();
        stored.insert(keys::LOWER_LIMIT_HARD_RAW.into(), toml::Value::Float(0.0));
        stored.insert(keys::UPPER_LIMIT_HARD_RAW.into(), toml::Value::Float(10.0));
        stored.insert(keys::LOWER_LIMIT_SOFT_RAW.into(), toml::Value::Float(-5.0));
        stored.insert(keys::UPPER_LIMIT_SOFT_RAW.into(), toml::Value::Float(50.0));

        let cfg = AxisConfig::from_stored(stored).unwrap();
        assert_eq!(cfg.lower_limit_soft_raw(), 0.0);
        assert_eq!(cfg.upper_limit_soft_raw(), 10.0);
    }

    #[derive(Debug, Clone)]
    enum LimitOp {
        Lower(f64),
        Upper(f64),
    }

    fn limit_op() -> impl Strategy<Value = LimitOp> {
        prop_oneof![
            (-500.0f64..500.0).prop_map(LimitOp::Lower),
            (-500.0f64..500.0).prop_map(LimitOp::Upper),
        ]
    }

    fn nonzero_scale_strategy() -> impl Strategy<Value = f64> {
        prop_oneof![-1.0e4f64..-1.0e-3, 1.0e-3f64..1.0e4]
    }

    proptest! {
        #[test]
        fn raw_scaled_round_trip(
            scale in nonzero_scale_strategy(),
            offset in -1.0e4f64..1.0e4,
            x in -1.0e4f64..1.0e4,
        ) {
            let cfg = AxisConfig::default().with_scale(scale).with_offset_raw(offset);
            let back = cfg.to_scaled(cfg.to_raw(x));
            prop_assert!((back - x).abs() <= 1e-6 * x.abs().max(1.0), "{} vs {}", back, x);
        }

        #[test]
        fn soft_limits_stay_ordered(
            scale in nonzero_scale_strategy(),
            ops in proptest::collection::vec(limit_op(), 0..20),
        ) {
            let mut cfg = AxisConfig::default()
                .with_scale(scale)
                .with_hard_limits_raw(-1.0e5, 1.0e5);
            for op in ops {
                let before = cfg.clone();
                let result = match op {
                    LimitOp::Lower(v) => cfg.set_lower_limit_soft(v),
                    LimitOp::Upper(v) => cfg.set_upper_limit_soft(v),
                };
                if result.is_err() {
                    prop_assert_eq!(&cfg, &before);
                }
                prop_assert!(cfg.lower_limit_soft() <= cfg.upper_limit_soft());
                prop_assert!(cfg.lower_limit_soft_raw() >= cfg.lower_limit_hard_raw());
                prop_assert!(cfg.upper_limit_soft_raw() <= cfg.upper_limit_hard_raw());
            }
        }
    }
}
