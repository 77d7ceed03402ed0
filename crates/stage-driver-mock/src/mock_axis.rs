//! Mock stepper axis implementing [`AxisBackend`].

use anyhow::{bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use stage_core::{AxisBackend, BackendError, BackendResult, StopSignal, Switches};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::channel::SharedChannel;
use crate::common::{ErrorConfig, MockMode, TimingConfig};

// =============================================================================
// MockAxisFactory - toml-configured construction
// =============================================================================

/// Configuration for a mock axis.
///
/// All positions are physical raw counts; the reported position starts equal
/// to the physical one and is rebased by homing and `set_position_raw`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MockAxisConfig {
    /// Controller axis number on the shared channel
    pub axis: u8,
    /// Timing mode
    pub mode: MockMode,
    /// Starting position
    pub initial_position_raw: f64,
    /// Speed for moves (raw/s)
    pub speed_raw: f64,
    /// Acceleration (raw/s², recorded only)
    pub acceleration_raw: f64,
    /// Home switch location
    pub home_position_raw: f64,
    /// Encoder index location relative to the home switch
    pub index_offset_raw: f64,
    /// Lower end switch location
    pub lower_switch_raw: f64,
    /// Upper end switch location
    pub upper_switch_raw: f64,
    /// End switches fitted
    pub has_limits: bool,
    /// Home switch fitted
    pub has_home: bool,
    /// Encoder index fitted
    pub has_index: bool,
    /// Aux encoder counts per primary count, `None` when not fitted
    pub aux_encoder_ratio: Option<f64>,
    /// Drive enabled at power-up
    pub enabled: bool,
    /// Random failure rate in chaos mode
    pub error_rate: f64,
    /// Seed for random failures
    pub seed: Option<u64>,
}

impl Default for MockAxisConfig {
    fn default() -> Self {
        Self {
            axis: 1,
            mode: MockMode::Instant,
            initial_position_raw: 0.0,
            speed_raw: 1000.0,
            acceleration_raw: 10000.0,
            home_position_raw: 0.0,
            index_offset_raw: 0.0,
            lower_switch_raw: -100_000.0,
            upper_switch_raw: 100_000.0,
            has_limits: false,
            has_home: true,
            has_index: false,
            aux_encoder_ratio: None,
            enabled: true,
            error_rate: 0.0,
            seed: None,
        }
    }
}

impl MockAxisConfig {
    fn check(&self) -> Result<()> {
        if self.lower_switch_raw >= self.upper_switch_raw {
            bail!(
                "lower_switch_raw ({}) must be below upper_switch_raw ({})",
                self.lower_switch_raw,
                self.upper_switch_raw
            );
        }
        if !(0.0..=1.0).contains(&self.error_rate) {
            bail!("error_rate must be within [0, 1], got {}", self.error_rate);
        }
        if self.speed_raw <= 0.0 {
            bail!("speed_raw must be positive, got {}", self.speed_raw);
        }
        Ok(())
    }
}

/// Factory for mock axes described in TOML.
///
/// ```toml
/// axis = 2
/// mode = "realistic"
/// has_limits = true
/// lower_switch_raw = -5000.0
/// upper_switch_raw = 5000.0
/// ```
pub struct MockAxisFactory;

impl MockAxisFactory {
    /// Driver type key.
    pub fn driver_type(&self) -> &'static str {
        "mock_axis"
    }

    /// Check a configuration without building anything.
    pub fn validate(&self, config: &toml::Value) -> Result<()> {
        let cfg: MockAxisConfig = config.clone().try_into()?;
        cfg.check()
    }

    /// Build an axis attached to `channel`.
    pub fn build(&self, config: toml::Value, channel: &SharedChannel) -> Result<Arc<MockAxisBackend>> {
        let cfg: MockAxisConfig = config.try_into()?;
        cfg.check()?;
        Ok(Arc::new(MockAxisBackend::with_config(cfg, channel.clone())))
    }
}

// =============================================================================
// Internal State
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct Geometry {
    home: f64,
    index_offset: f64,
    lower_switch: f64,
    upper_switch: f64,
    has_limits: bool,
    has_home: bool,
    has_index: bool,
    aux_ratio: Option<f64>,
}

/// Half-width of the home switch actuation window
const HOME_SWITCH_WIDTH: f64 = 0.5;

#[derive(Debug)]
struct AxisState {
    /// Where the carriage physically is
    physical: f64,
    /// reported = physical + reference
    reference: f64,
    target: f64,
    speed: f64,
    acceleration: f64,
    enabled: bool,
    initialized: bool,
    moving: bool,
    drive_fault: bool,
    settle_until: Option<Instant>,
}

// =============================================================================
// MockAxisBackend
// =============================================================================

/// Simulated stepper axis.
///
/// Behaves like a controller axis on a shared line:
/// - Home switch, encoder index and end switches at configurable places
/// - Blocking moves that return early when the stop signal is raised
/// - Non-blocking target tracking (`set_target_raw`)
/// - Abort/stop that halt motion in progress
/// - Drive fault injection and [`ErrorConfig`] failures
///
/// Each backend call performs one exchange on its [`SharedChannel`], so the
/// channel log is a record of what the controller received.
///
/// # Example
///
/// ```rust,ignore
/// let axis = MockAxisBackend::builder()
///     .capabilities(true, true, true)
///     .limit_switches_raw(-5000.0, 5000.0)
///     .build();
///
/// axis.move_absolute_raw(1200.0, &StopSignal::new()).await?;
/// assert_eq!(axis.position_now(), 1200.0);
/// ```
#[derive(Clone)]
pub struct MockAxisBackend {
    inner: Arc<MockAxisInner>,
}

struct MockAxisInner {
    axis: u8,
    channel: SharedChannel,
    mode: MockMode,
    timing: TimingConfig,
    errors: ErrorConfig,
    geometry: Geometry,
    state: Mutex<AxisState>,
    /// Bumped whenever a motion starts or is halted
    motion_generation: AtomicU64,
    closed: AtomicBool,
}

impl MockAxisBackend {
    /// Instant-mode axis with default geometry on a private channel.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Axis built from a deserialized configuration.
    pub fn with_config(config: MockAxisConfig, channel: SharedChannel) -> Self {
        let errors = if config.mode == MockMode::Chaos && config.error_rate > 0.0 {
            ErrorConfig::random_failures_seeded(config.error_rate, config.seed)
        } else {
            ErrorConfig::none()
        };
        Self::builder()
            .axis(config.axis)
            .channel(channel)
            .mode(config.mode)
            .error_config(errors)
            .position_raw(config.initial_position_raw)
            .speed_raw(config.speed_raw)
            .acceleration_raw(config.acceleration_raw)
            .home_raw(config.home_position_raw)
            .index_offset_raw(config.index_offset_raw)
            .limit_switches_raw(config.lower_switch_raw, config.upper_switch_raw)
            .capabilities(config.has_limits, config.has_home, config.has_index)
            .aux_encoder_ratio(config.aux_encoder_ratio)
            .enabled(config.enabled)
            .build()
    }

    /// Create a builder.
    pub fn builder() -> MockAxisBuilder {
        MockAxisBuilder::new()
    }

    // ------------------------------------------------------------------
    // Test inspection helpers
    // ------------------------------------------------------------------

    /// Controller axis number.
    pub fn axis(&self) -> u8 {
        self.inner.axis
    }

    /// The channel this axis talks through.
    pub fn channel(&self) -> &SharedChannel {
        &self.inner.channel
    }

    /// Reported position without a channel exchange.
    pub fn position_now(&self) -> f64 {
        let s = self.inner.state.lock();
        s.physical + s.reference
    }

    /// Physical carriage position.
    pub fn physical_position(&self) -> f64 {
        self.inner.state.lock().physical
    }

    /// Motion in progress, without a channel exchange.
    pub fn is_moving_now(&self) -> bool {
        self.inner.state.lock().moving
    }

    /// Latch or clear a drive fault. A faulted drive never reports ready.
    pub fn set_drive_fault(&self, fault: bool) {
        self.inner.state.lock().drive_fault = fault;
    }

    /// Commands this axis sent, in order.
    pub fn commands(&self) -> Vec<&'static str> {
        self.inner.channel.commands_for(self.inner.axis)
    }

    /// Times this axis sent `command`.
    pub fn count(&self, command: &str) -> usize {
        self.commands().into_iter().filter(|c| *c == command).count()
    }

    /// Argument of the most recent `command` sent by this axis.
    pub fn last_argument(&self, command: &str) -> Option<f64> {
        self.inner
            .channel
            .transactions()
            .into_iter()
            .rev()
            .find(|t| t.axis == self.inner.axis && t.command == command)
            .and_then(|t| t.argument)
    }

    /// True once `close` was called.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

impl Default for MockAxisBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAxisInner {
    async fn exchange(&self, command: &'static str, argument: Option<f64>) -> BackendResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BackendError::Communication(format!(
                "axis {} channel closed",
                self.axis
            )));
        }
        self.errors.check_operation(command)?;
        self.channel.exchange(self.axis, command, argument).await;
        Ok(())
    }

    fn require_enabled(&self) -> BackendResult<()> {
        if self.state.lock().enabled {
            Ok(())
        } else {
            Err(BackendError::Hardware(format!(
                "axis {} drive disabled",
                self.axis
            )))
        }
    }

    fn clamp_to_travel(&self, physical: f64) -> f64 {
        if self.geometry.has_limits {
            physical.clamp(self.geometry.lower_switch, self.geometry.upper_switch)
        } else {
            physical
        }
    }

    fn finish_motion(&self) {
        let mut s = self.state.lock();
        s.moving = false;
        if self.mode.is_timed() {
            s.settle_until = Some(Instant::now() + self.timing.settling_time());
        }
    }

    /// Halt any motion in progress.
    fn halt(&self) {
        self.motion_generation.fetch_add(1, Ordering::SeqCst);
        self.finish_motion();
    }

    /// Drive the carriage to a physical destination.
    ///
    /// Returns true when the destination was reached, false when the motion
    /// was stopped, halted or superseded.
    async fn travel(&self, dest: f64, speed: f64, stop: Option<&StopSignal>) -> bool {
        let generation = self.motion_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let dest = self.clamp_to_travel(dest);
        self.state.lock().moving = true;
        debug!(axis = self.axis, dest, speed, "mock motion started");

        if !self.mode.is_timed() {
            self.state.lock().physical = dest;
            self.finish_motion();
            return true;
        }

        let tick = self.timing.motion_tick();
        let step = speed.abs().max(1.0) * tick.as_secs_f64();
        loop {
            if self.motion_generation.load(Ordering::SeqCst) != generation {
                debug!(axis = self.axis, "mock motion halted");
                return false;
            }
            if stop.is_some_and(StopSignal::is_requested) {
                debug!(axis = self.axis, "mock motion stopped");
                self.finish_motion();
                return false;
            }
            {
                let mut s = self.state.lock();
                let remaining = dest - s.physical;
                if remaining.abs() <= step {
                    s.physical = dest;
                    break;
                }
                s.physical += step.copysign(remaining);
            }
            sleep(tick).await;
        }

        self.finish_motion();
        debug!(axis = self.axis, dest, "mock motion done");
        true
    }

    /// Travel to a reference mark and make it the reported origin.
    async fn search(&self, mark: f64, speed: f64, stop: &StopSignal) -> BackendResult<()> {
        self.require_enabled()?;
        if self.travel(mark, speed, Some(stop)).await {
            let mut s = self.state.lock();
            s.reference = -s.physical;
            s.target = 0.0;
        }
        Ok(())
    }

    /// Travel to an end switch. The reported frame is left alone.
    async fn seek_switch(&self, switch: f64, speed: f64, stop: &StopSignal) -> BackendResult<()> {
        self.require_enabled()?;
        self.travel(switch, speed, Some(stop)).await;
        Ok(())
    }
}

#[async_trait]
impl AxisBackend for MockAxisBackend {
    fn driver_type(&self) -> &str {
        "mock_axis"
    }

    async fn is_enabled(&self) -> BackendResult<bool> {
        self.inner.exchange("is_enabled", None).await?;
        Ok(self.inner.state.lock().enabled)
    }

    async fn enable(&self) -> BackendResult<()> {
        self.inner.exchange("enable", None).await?;
        self.inner.state.lock().enabled = true;
        Ok(())
    }

    async fn disable(&self) -> BackendResult<()> {
        self.inner.exchange("disable", None).await?;
        self.inner.state.lock().enabled = false;
        Ok(())
    }

    async fn switches(&self) -> BackendResult<Switches> {
        self.inner.exchange("switches", None).await?;
        let g = self.inner.geometry;
        let physical = self.inner.state.lock().physical;
        Ok(Switches {
            upper: g.has_limits && physical >= g.upper_switch,
            lower: g.has_limits && physical <= g.lower_switch,
            home: g.has_home && (physical - g.home).abs() <= HOME_SWITCH_WIDTH,
        })
    }

    async fn is_ready(&self) -> BackendResult<bool> {
        self.inner.exchange("is_ready", None).await?;
        let s = self.inner.state.lock();
        let settled = s.settle_until.map_or(true, |t| Instant::now() >= t);
        Ok(!s.moving && !s.drive_fault && settled)
    }

    async fn is_stopped(&self) -> BackendResult<bool> {
        self.inner.exchange("is_stopped", None).await?;
        Ok(!self.inner.state.lock().moving)
    }

    async fn is_initialized(&self) -> BackendResult<bool> {
        self.inner.exchange("is_initialized", None).await?;
        Ok(self.inner.state.lock().initialized)
    }

    async fn set_initialized(&self, initialized: bool) -> BackendResult<()> {
        self.inner.exchange("set_initialized", None).await?;
        self.inner.state.lock().initialized = initialized;
        Ok(())
    }

    async fn position_raw(&self) -> BackendResult<f64> {
        self.inner.exchange("position_raw", None).await?;
        Ok(self.position_now())
    }

    async fn set_position_raw(&self, raw: f64) -> BackendResult<()> {
        self.inner.exchange("set_position_raw", Some(raw)).await?;
        let mut s = self.inner.state.lock();
        s.reference = raw - s.physical;
        Ok(())
    }

    async fn speed_raw(&self) -> BackendResult<f64> {
        self.inner.exchange("speed_raw", None).await?;
        Ok(self.inner.state.lock().speed)
    }

    async fn set_speed_raw(&self, raw: f64) -> BackendResult<()> {
        self.inner.exchange("set_speed_raw", Some(raw)).await?;
        self.inner.state.lock().speed = raw.abs();
        Ok(())
    }

    async fn acceleration_raw(&self) -> BackendResult<f64> {
        self.inner.exchange("acceleration_raw", None).await?;
        Ok(self.inner.state.lock().acceleration)
    }

    async fn set_acceleration_raw(&self, raw: f64) -> BackendResult<()> {
        self.inner.exchange("set_acceleration_raw", Some(raw)).await?;
        self.inner.state.lock().acceleration = raw.abs();
        Ok(())
    }

    async fn target_raw(&self) -> BackendResult<f64> {
        self.inner.exchange("target_raw", None).await?;
        Ok(self.inner.state.lock().target)
    }

    async fn set_target_raw(&self, raw: f64) -> BackendResult<()> {
        self.inner.exchange("set_target_raw", Some(raw)).await?;
        self.inner.require_enabled()?;
        let (dest, speed) = {
            let mut s = self.inner.state.lock();
            s.target = raw;
            (raw - s.reference, s.speed)
        };
        if self.inner.mode.is_timed() {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                inner.travel(dest, speed, None).await;
            });
        } else {
            self.inner.travel(dest, speed, None).await;
        }
        Ok(())
    }

    async fn move_absolute_raw(&self, dest: f64, stop: &StopSignal) -> BackendResult<()> {
        self.inner.exchange("move_absolute_raw", Some(dest)).await?;
        self.inner.require_enabled()?;
        let (physical, speed) = {
            let mut s = self.inner.state.lock();
            s.target = dest;
            (dest - s.reference, s.speed)
        };
        self.inner.travel(physical, speed, Some(stop)).await;
        Ok(())
    }

    async fn move_relative_raw(&self, dist: f64, stop: &StopSignal) -> BackendResult<()> {
        self.inner.exchange("move_relative_raw", Some(dist)).await?;
        self.inner.require_enabled()?;
        let (physical, speed) = {
            let mut s = self.inner.state.lock();
            s.target = s.physical + s.reference + dist;
            (s.physical + dist, s.speed)
        };
        self.inner.travel(physical, speed, Some(stop)).await;
        Ok(())
    }

    async fn abort_move(&self) -> BackendResult<()> {
        self.inner.exchange("abort_move", None).await?;
        self.inner.halt();
        Ok(())
    }

    async fn stop_move(&self) -> BackendResult<()> {
        self.inner.exchange("stop_move", None).await?;
        self.inner.halt();
        Ok(())
    }

    async fn find_home(&self, speed: f64, stop: &StopSignal) -> BackendResult<()> {
        if !self.inner.geometry.has_home {
            return Err(BackendError::NotSupported("find_home"));
        }
        self.inner.exchange("find_home", Some(speed)).await?;
        self.inner.search(self.inner.geometry.home, speed, stop).await
    }

    async fn find_index(&self, speed: f64, stop: &StopSignal) -> BackendResult<()> {
        let g = self.inner.geometry;
        if !g.has_index {
            return Err(BackendError::NotSupported("find_index"));
        }
        self.inner.exchange("find_index", Some(speed)).await?;
        self.inner.search(g.home + g.index_offset, speed, stop).await
    }

    async fn find_lower_limit(&self, speed: f64, stop: &StopSignal) -> BackendResult<()> {
        if !self.inner.geometry.has_limits {
            return Err(BackendError::NotSupported("find_lower_limit"));
        }
        self.inner.exchange("find_lower_limit", Some(speed)).await?;
        self.inner
            .seek_switch(self.inner.geometry.lower_switch, speed, stop)
            .await
    }

    async fn find_upper_limit(&self, speed: f64, stop: &StopSignal) -> BackendResult<()> {
        if !self.inner.geometry.has_limits {
            return Err(BackendError::NotSupported("find_upper_limit"));
        }
        self.inner.exchange("find_upper_limit", Some(speed)).await?;
        self.inner
            .seek_switch(self.inner.geometry.upper_switch, speed, stop)
            .await
    }

    async fn aux_encoder_raw(&self) -> BackendResult<f64> {
        let Some(ratio) = self.inner.geometry.aux_ratio else {
            return Err(BackendError::NotSupported("aux_encoder_raw"));
        };
        self.inner.exchange("aux_encoder_raw", None).await?;
        Ok(self.position_now() * ratio)
    }

    async fn close(&self) -> BackendResult<()> {
        self.inner.exchange("close", None).await?;
        self.inner.closed.store(true, Ordering::SeqCst);
        debug!(axis = self.inner.axis, "mock axis closed");
        Ok(())
    }
}

// =============================================================================
// Builder Pattern
// =============================================================================

/// Builder for MockAxisBackend with fluent API
pub struct MockAxisBuilder {
    axis: u8,
    channel: Option<SharedChannel>,
    mode: MockMode,
    timing: TimingConfig,
    errors: ErrorConfig,
    position: f64,
    speed: f64,
    acceleration: f64,
    geometry: Geometry,
    enabled: bool,
    initialized: bool,
}

impl MockAxisBuilder {
    /// Defaults: axis 1, instant mode, home switch at 0, no limits or index.
    pub fn new() -> Self {
        let defaults = MockAxisConfig::default();
        Self {
            axis: defaults.axis,
            channel: None,
            mode: defaults.mode,
            timing: TimingConfig::default(),
            errors: ErrorConfig::none(),
            position: defaults.initial_position_raw,
            speed: defaults.speed_raw,
            acceleration: defaults.acceleration_raw,
            geometry: Geometry {
                home: defaults.home_position_raw,
                index_offset: defaults.index_offset_raw,
                lower_switch: defaults.lower_switch_raw,
                upper_switch: defaults.upper_switch_raw,
                has_limits: defaults.has_limits,
                has_home: defaults.has_home,
                has_index: defaults.has_index,
                aux_ratio: defaults.aux_encoder_ratio,
            },
            enabled: defaults.enabled,
            initialized: false,
        }
    }

    /// Controller axis number.
    pub fn axis(mut self, axis: u8) -> Self {
        self.axis = axis;
        self
    }

    /// Attach to an existing channel (shared with other axes).
    pub fn channel(mut self, channel: SharedChannel) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Timing mode.
    pub fn mode(mut self, mode: MockMode) -> Self {
        self.mode = mode;
        self
    }

    /// Timing details for realistic mode.
    pub fn timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    /// Error injection.
    pub fn error_config(mut self, errors: ErrorConfig) -> Self {
        self.errors = errors;
        self
    }

    /// Starting position.
    pub fn position_raw(mut self, position: f64) -> Self {
        self.position = position;
        self
    }

    /// Move speed.
    pub fn speed_raw(mut self, speed: f64) -> Self {
        self.speed = speed.abs();
        self
    }

    /// Acceleration.
    pub fn acceleration_raw(mut self, acceleration: f64) -> Self {
        self.acceleration = acceleration.abs();
        self
    }

    /// Home switch location.
    pub fn home_raw(mut self, home: f64) -> Self {
        self.geometry.home = home;
        self
    }

    /// Index location relative to the home switch.
    pub fn index_offset_raw(mut self, offset: f64) -> Self {
        self.geometry.index_offset = offset;
        self
    }

    /// End switch locations.
    pub fn limit_switches_raw(mut self, lower: f64, upper: f64) -> Self {
        self.geometry.lower_switch = lower.min(upper);
        self.geometry.upper_switch = lower.max(upper);
        self
    }

    /// Fitted features: end switches, home switch, encoder index.
    pub fn capabilities(mut self, limits: bool, home: bool, index: bool) -> Self {
        self.geometry.has_limits = limits;
        self.geometry.has_home = home;
        self.geometry.has_index = index;
        self
    }

    /// Auxiliary encoder counts per primary count.
    pub fn aux_encoder_ratio(mut self, ratio: Option<f64>) -> Self {
        self.geometry.aux_ratio = ratio;
        self
    }

    /// Drive enabled at start.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Home reference valid at start.
    pub fn initialized(mut self, initialized: bool) -> Self {
        self.initialized = initialized;
        self
    }

    /// Build the axis.
    pub fn build(self) -> MockAxisBackend {
        let channel = self.channel.unwrap_or_default();
        if self.mode.is_timed() {
            channel.set_delay(self.timing.communication_delay());
        }
        MockAxisBackend {
            inner: Arc::new(MockAxisInner {
                axis: self.axis,
                channel,
                mode: self.mode,
                timing: self.timing,
                errors: self.errors,
                geometry: self.geometry,
                state: Mutex::new(AxisState {
                    physical: self.position,
                    reference: 0.0,
                    target: self.position,
                    speed: self.speed,
                    acceleration: self.acceleration,
                    enabled: self.enabled,
                    initialized: self.initialized,
                    moving: false,
                    drive_fault: false,
                    settle_until: None,
                }),
                motion_generation: AtomicU64::new(0),
                closed: AtomicBool::new(false),
            }),
        }
    }
}

impl Default for MockAxisBuilder {
    fn default() -> Self {
        Self::new()
    }
}
