//! The stateful axis engine.
//!
//! [`AxisEngine`] turns an [`AxisBackend`] plus a persisted [`AxisConfig`]
//! into a [`Positioner`]:
//!
//! - scaled/raw conversion and soft-limit checks through the config
//! - one composite operation at a time, enforced by an owned lock taken with
//!   a non-blocking try-lock (contention resolves to [`StatusCode::Locked`])
//! - composite operations run on a spawned task; callers get an
//!   [`OperationHandle`] straight away
//! - a single [`StopSignal`] per axis, raised by abort/stop and cleared when
//!   the next operation takes the lock
//! - default speed and acceleration restored when any composite operation ends
//! - every configuration setter persists its key through the [`ConfigStore`]
//!
//! # Lock lifetime
//!
//! The lock guard is acquired synchronously in the initiating call and moved
//! into the worker task, so it is released on every exit path: success,
//! logical refusal, backend error, or panic.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use stage_core::units::keys;
use stage_core::{
    AxisBackend, AxisConfig, AxisError, AxisResult, ConfigStore, OperationHandle, OperationKind,
    OperationResult, Positioner, StatusCode, StopSignal, Switches,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::OwnedMutexGuard;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, info_span, instrument, warn, Instrument};

use crate::error::EngineError;
use crate::options::EngineOptions;

// =============================================================================
// Jobs
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum Motion {
    Absolute(f64),
    Relative(f64),
}

#[derive(Debug, Clone, Copy)]
enum Search {
    Home,
    Index,
    LowerRaw,
    UpperRaw,
}

/// Work carried out by a composite operation, in raw units.
#[derive(Debug, Clone, Copy)]
enum Job {
    Initialize,
    Move { motion: Motion, checked: bool },
    Find { search: Search, speed_raw: f64 },
}

#[derive(Debug, Clone, Copy)]
enum Halt {
    Abort,
    Stop,
}

/// Axis lock guard that keeps the `busy` flag in step with ownership.
struct AxisGuard {
    _guard: OwnedMutexGuard<()>,
    busy: Arc<AtomicBool>,
}

impl AxisGuard {
    fn new(guard: OwnedMutexGuard<()>, busy: &Arc<AtomicBool>) -> Self {
        busy.store(true, Ordering::Release);
        Self {
            _guard: guard,
            busy: Arc::clone(busy),
        }
    }
}

impl Drop for AxisGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

// =============================================================================
// AxisEngine
// =============================================================================

/// One positioning axis.
///
/// Cheap to clone; clones drive the same axis.
///
/// # Example
///
/// ```rust,ignore
/// let engine = AxisEngine::new("focus", backend, store, EngineOptions::default()).await?;
/// engine.enable().await?;
/// if engine.initialize().await? == StatusCode::Ok {
///     engine.move_absolute(12.5).await?;
/// }
/// ```
#[derive(Clone)]
pub struct AxisEngine {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    backend: Arc<dyn AxisBackend>,
    store: Arc<dyn ConfigStore>,
    options: EngineOptions,
    config: RwLock<AxisConfig>,
    lock: Arc<tokio::sync::Mutex<()>>,
    busy: Arc<AtomicBool>,
    stop: StopSignal,
    halt_sent: AtomicBool,
    current: Mutex<Option<OperationHandle>>,
    target_raw: Mutex<Option<f64>>,
    runtime: Handle,
}

impl std::fmt::Debug for AxisEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AxisEngine")
            .field("name", &self.inner.name)
            .field("driver", &self.inner.backend.driver_type())
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

impl AxisEngine {
    /// Build an engine for axis `name`.
    ///
    /// Loads the stored record, overlays it on the defaults and writes every
    /// key back so the store always holds a complete record. A failed
    /// write-back is logged, not fatal. Must be called inside a tokio runtime;
    /// operations are spawned onto it.
    pub async fn new(
        name: impl Into<String>,
        backend: Arc<dyn AxisBackend>,
        store: Arc<dyn ConfigStore>,
        options: EngineOptions,
    ) -> Result<Self, EngineError> {
        let name = name.into();
        let runtime = Handle::try_current().map_err(|e| EngineError::NoRuntime(e.to_string()))?;

        let stored = store.load()?;
        let config = AxisConfig::from_stored(stored).map_err(|e| EngineError::InvalidConfig {
            axis: name.clone(),
            reason: e.to_string(),
        })?;

        match config.to_table() {
            Ok(record) => {
                if let Err(e) = store.save_all(&record) {
                    warn!(axis = %name, error = %e, "failed to re-save axis configuration");
                }
            }
            Err(e) => warn!(axis = %name, error = %e, "failed to serialize axis configuration"),
        }

        info!(
            axis = %name,
            driver = backend.driver_type(),
            units = %config.axis_units,
            scale = config.scale(),
            "axis engine ready"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                name,
                backend,
                store,
                options,
                config: RwLock::new(config),
                lock: Arc::new(tokio::sync::Mutex::new(())),
                busy: Arc::new(AtomicBool::new(false)),
                stop: StopSignal::new(),
                halt_sent: AtomicBool::new(false),
                current: Mutex::new(None),
                target_raw: Mutex::new(None),
                runtime,
            }),
        })
    }

    /// Engine with default timing options.
    pub async fn with_defaults(
        name: impl Into<String>,
        backend: Arc<dyn AxisBackend>,
        store: Arc<dyn ConfigStore>,
    ) -> Result<Self, EngineError> {
        Self::new(name, backend, store, EngineOptions::default()).await
    }

    /// Timing options in use.
    pub fn options(&self) -> EngineOptions {
        self.inner.options
    }

    /// True while a composite operation or a target command holds the axis.
    pub fn is_locked(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    /// True while a stop request is pending (raised and not yet cleared by
    /// the next operation).
    pub fn is_stop_requested(&self) -> bool {
        self.inner.stop.is_requested()
    }

    /// Raw destination most recently commanded through this engine.
    pub fn recorded_target_raw(&self) -> Option<f64> {
        *self.inner.target_raw.lock()
    }

    /// Set the aux encoder scale and persist it.
    pub fn set_aux_encoder_scale(&self, scale: f64) {
        let value = {
            let mut config = self.inner.config.write();
            config.set_aux_encoder_scale(scale);
            config.to_table().ok().and_then(|t| t.get(keys::AUX_ENCODER_SCALE).cloned())
        };
        if let Some(value) = value {
            self.inner.persist(keys::AUX_ENCODER_SCALE, value);
        }
    }

    /// Set the aux encoder raw offset and persist it.
    pub fn set_aux_encoder_offset_raw(&self, offset_raw: f64) {
        self.inner.config.write().set_aux_encoder_offset_raw(offset_raw);
        self.inner
            .persist(keys::AUX_ENCODER_OFFSET_RAW, toml::Value::Float(offset_raw));
    }

    /// Tear the axis down.
    ///
    /// Cancels any operation in flight, waits for the axis lock so nothing
    /// else is talking to the drive, then closes the backend.
    #[instrument(skip(self), fields(axis = %self.inner.name), err)]
    pub async fn close(&self) -> AxisResult<()> {
        if let Some(op) = self.current_operation() {
            op.cancel();
            match op.wait().await {
                Ok(status) => debug!(operation = %op.kind(), %status, "operation ended before close"),
                Err(e) => warn!(operation = %op.kind(), error = %e, "operation failed during close"),
            }
        }
        let _guard = AxisGuard::new(
            Arc::clone(&self.inner.lock).lock_owned().await,
            &self.inner.busy,
        );
        self.inner.backend.close().await?;
        info!("axis closed");
        Ok(())
    }

    /// Take the lock and spawn `job`, or resolve to `Locked`.
    fn launch(&self, kind: OperationKind, job: Job) -> OperationHandle {
        let Some(guard) = self.inner.try_acquire() else {
            debug!(axis = %self.inner.name, operation = %kind, "axis locked, operation refused");
            return OperationHandle::resolved(kind, StatusCode::Locked);
        };

        let (handle, completer) = OperationHandle::pending(kind, self.inner.stop.clone());
        *self.inner.current.lock() = Some(handle.clone());

        let inner = Arc::clone(&self.inner);
        let span = info_span!("operation", axis = %inner.name, operation = %kind);
        self.inner.runtime.spawn(
            async move {
                debug!(?job, "operation started");
                let mut result = inner.run(job).await;

                if let Err(e) = inner.restore_defaults().await {
                    match result {
                        Ok(_) => result = Err(e),
                        Err(_) => warn!(error = %e, "failed to restore default speed"),
                    }
                }

                match &result {
                    Ok(status) => debug!(%status, "operation finished"),
                    Err(e) => error!(error = %e, "operation failed"),
                }
                completer.retire();
                drop(guard);
                completer.complete(result);
            }
            .instrument(span),
        );
        handle
    }

    fn not_supported(&self, operation: &'static str) -> AxisError {
        AxisError::NotSupported {
            axis: self.inner.name.clone(),
            operation,
        }
    }

    /// Capability check then launch. Runs before the lock is touched.
    fn launch_search(
        &self,
        kind: OperationKind,
        supported: bool,
        search: Search,
        speed: f64,
    ) -> AxisResult<OperationHandle> {
        if !supported {
            return Err(self.not_supported(kind.label()));
        }
        let speed_raw = self.inner.config.read().rate_to_raw(speed);
        Ok(self.launch(kind, Job::Find { search, speed_raw }))
    }
}

// =============================================================================
// Operation bodies
// =============================================================================

impl Inner {
    /// Take the axis lock without waiting and reset the stop state.
    fn try_acquire(&self) -> Option<AxisGuard> {
        let guard = Arc::clone(&self.lock).try_lock_owned().ok()?;
        let guard = AxisGuard::new(guard, &self.busy);
        self.stop.clear();
        self.halt_sent.store(false, Ordering::Release);
        Some(guard)
    }

    fn persist(&self, key: &str, value: toml::Value) {
        if let Err(e) = self.store.save(key, value) {
            warn!(axis = %self.name, key, error = %e, "failed to persist setting");
        }
    }

    fn persist_float(&self, key: &str, value: f64) {
        self.persist(key, toml::Value::Float(value));
    }

    async fn run(&self, job: Job) -> OperationResult {
        match job {
            Job::Initialize => self.initialize().await,
            Job::Move { motion, checked } => self.travel(motion, checked).await,
            Job::Find { search, speed_raw } => self.search(search, speed_raw).await,
        }
    }

    /// Enabled, ready and not stopped; otherwise the refusal status.
    async fn precheck(&self) -> AxisResult<Option<StatusCode>> {
        if !self.backend.is_enabled().await? {
            return Ok(Some(StatusCode::Disabled));
        }
        if !self.backend.is_ready().await? {
            return Ok(Some(StatusCode::Busy));
        }
        if self.stop.is_requested() {
            return Ok(Some(StatusCode::Stopped));
        }
        Ok(None)
    }

    fn stopped(&self) -> bool {
        let stopped = self.stop.is_requested();
        if stopped {
            debug!("stop observed");
        }
        stopped
    }

    async fn initialize(&self) -> OperationResult {
        if let Some(status) = self.precheck().await? {
            return Ok(status);
        }

        self.backend.set_initialized(false).await?;
        if self.stopped() {
            return Ok(StatusCode::Stopped);
        }

        let (speed, has_index) = {
            let config = self.config.read();
            (config.initialize_speed_raw, config.has_index)
        };

        debug!(speed, "searching home switch");
        self.backend.find_home(speed, &self.stop).await?;
        if self.stopped() {
            return Ok(StatusCode::Stopped);
        }

        if has_index {
            debug!(speed, "searching encoder index");
            self.backend.find_index(speed, &self.stop).await?;
            if self.stopped() {
                return Ok(StatusCode::Stopped);
            }
        }

        self.backend.set_initialized(true).await?;
        if self.stopped() {
            return Ok(StatusCode::Stopped);
        }

        let status = self.settle().await?;
        if status == StatusCode::Ok {
            info!(axis = %self.name, "axis initialized");
        }
        Ok(status)
    }

    async fn travel(&self, motion: Motion, checked: bool) -> OperationResult {
        if let Some(status) = self.precheck().await? {
            return Ok(status);
        }

        if checked && !self.backend.is_initialized().await? {
            return Ok(StatusCode::Uninitialized);
        }

        let dest = match motion {
            Motion::Absolute(dest) => dest,
            Motion::Relative(dist) => self.backend.position_raw().await? + dist,
        };

        if checked {
            let limits = self.config.read().check_soft_limits(dest);
            if let Err(status) = limits {
                debug!(dest, %status, "destination outside soft limits");
                return Ok(status);
            }
        }

        *self.target_raw.lock() = Some(dest);
        match motion {
            Motion::Absolute(dest) => {
                debug!(dest, "move_absolute_raw");
                self.backend.move_absolute_raw(dest, &self.stop).await?;
            }
            Motion::Relative(dist) => {
                debug!(dist, "move_relative_raw");
                self.backend.move_relative_raw(dist, &self.stop).await?;
            }
        }

        if self.stopped() {
            return Ok(StatusCode::Stopped);
        }
        self.settle().await
    }

    async fn search(&self, search: Search, speed: f64) -> OperationResult {
        if let Some(status) = self.precheck().await? {
            return Ok(status);
        }

        debug!(?search, speed, "search started");
        match search {
            Search::Home => self.backend.find_home(speed, &self.stop).await?,
            Search::Index => self.backend.find_index(speed, &self.stop).await?,
            Search::LowerRaw => self.backend.find_lower_limit(speed, &self.stop).await?,
            Search::UpperRaw => self.backend.find_upper_limit(speed, &self.stop).await?,
        }

        if self.stopped() {
            return Ok(StatusCode::Stopped);
        }
        self.settle().await
    }

    /// Poll readiness after the blocking backend call returned.
    async fn settle(&self) -> OperationResult {
        let started = Instant::now();
        loop {
            if self.stopped() {
                return Ok(StatusCode::Stopped);
            }
            if self.backend.is_ready().await? {
                return Ok(StatusCode::Ok);
            }
            if started.elapsed() >= self.options.settle_timeout {
                return Err(self.settle_timeout());
            }
            sleep(self.options.poll_interval).await;
        }
    }

    fn settle_timeout(&self) -> AxisError {
        AxisError::Timeout {
            axis: self.name.clone(),
            waited_ms: u64::try_from(self.options.settle_timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    async fn restore_defaults(&self) -> AxisResult<()> {
        let (speed, acceleration) = {
            let config = self.config.read();
            (config.default_speed_raw, config.default_acceleration_raw)
        };
        self.backend.set_speed_raw(speed).await?;
        self.backend.set_acceleration_raw(acceleration).await?;
        Ok(())
    }

    async fn halt(&self, halt: Halt) -> AxisResult<StatusCode> {
        if self.halt_sent.swap(true, Ordering::AcqRel) {
            debug!(?halt, "halt already sent");
            return Ok(StatusCode::Stopped);
        }
        self.stop.request();

        let current = self.current.lock().clone();
        if let Some(op) = current.filter(|op| !op.is_finished()) {
            debug!(operation = %op.kind(), "cancelling operation in flight");
            op.cancel();
        }

        let sent = match halt {
            Halt::Abort => self.backend.abort_move().await,
            Halt::Stop => self.backend.stop_move().await,
        };
        if let Err(e) = sent {
            // Let a retry reach the controller.
            self.halt_sent.store(false, Ordering::Release);
            return Err(e.into());
        }
        Ok(StatusCode::Ok)
    }
}

// =============================================================================
// Positioner
// =============================================================================

#[async_trait]
impl Positioner for AxisEngine {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn config(&self) -> AxisConfig {
        self.inner.config.read().clone()
    }

    async fn is_enabled(&self) -> AxisResult<bool> {
        Ok(self.inner.backend.is_enabled().await?)
    }

    #[instrument(skip(self), fields(axis = %self.inner.name), err)]
    async fn enable(&self) -> AxisResult<()> {
        self.inner.backend.enable().await?;
        info!("drive enabled");
        Ok(())
    }

    #[instrument(skip(self), fields(axis = %self.inner.name), err)]
    async fn disable(&self) -> AxisResult<()> {
        self.inner.backend.disable().await?;
        info!("drive disabled");
        Ok(())
    }

    async fn is_ready(&self) -> AxisResult<bool> {
        Ok(self.inner.backend.is_ready().await?)
    }

    async fn is_stopped(&self) -> AxisResult<bool> {
        Ok(self.inner.backend.is_stopped().await?)
    }

    async fn is_initialized(&self) -> AxisResult<bool> {
        Ok(self.inner.backend.is_initialized().await?)
    }

    async fn switches(&self) -> AxisResult<Switches> {
        let raw = self.inner.backend.switches().await?;
        if self.inner.config.read().is_inverted() {
            Ok(raw.inverted())
        } else {
            Ok(raw)
        }
    }

    #[instrument(skip(self), fields(axis = %self.inner.name), err)]
    async fn wait_ready(&self) -> AxisResult<()> {
        let started = Instant::now();
        while !self.inner.backend.is_ready().await? {
            if started.elapsed() >= self.inner.options.settle_timeout {
                return Err(self.inner.settle_timeout());
            }
            sleep(self.inner.options.poll_interval).await;
        }
        Ok(())
    }

    async fn position(&self) -> AxisResult<f64> {
        let raw = self.inner.backend.position_raw().await?;
        Ok(self.inner.config.read().to_scaled(raw))
    }

    #[instrument(skip(self), fields(axis = %self.inner.name), err)]
    async fn set_position(&self, scaled: f64) -> AxisResult<()> {
        let raw = self.inner.config.read().to_raw(scaled);
        self.inner.backend.set_position_raw(raw).await?;
        Ok(())
    }

    async fn target(&self) -> AxisResult<f64> {
        let recorded = *self.inner.target_raw.lock();
        let raw = match recorded {
            Some(raw) => raw,
            None => self.inner.backend.target_raw().await?,
        };
        Ok(self.inner.config.read().to_scaled(raw))
    }

    async fn speed(&self) -> AxisResult<f64> {
        let raw = self.inner.backend.speed_raw().await?;
        Ok(self.inner.config.read().rate_to_scaled(raw))
    }

    #[instrument(skip(self), fields(axis = %self.inner.name), err)]
    async fn set_speed(&self, scaled: f64) -> AxisResult<()> {
        let raw = self.inner.config.read().rate_to_raw(scaled);
        self.inner.backend.set_speed_raw(raw).await?;
        Ok(())
    }

    async fn acceleration(&self) -> AxisResult<f64> {
        let raw = self.inner.backend.acceleration_raw().await?;
        Ok(self.inner.config.read().rate_to_scaled(raw))
    }

    #[instrument(skip(self), fields(axis = %self.inner.name), err)]
    async fn set_acceleration(&self, scaled: f64) -> AxisResult<()> {
        let raw = self.inner.config.read().rate_to_raw(scaled);
        self.inner.backend.set_acceleration_raw(raw).await?;
        Ok(())
    }

    async fn aux_encoder_position(&self) -> AxisResult<f64> {
        let has_aux = self.inner.config.read().has_aux_encoder;
        let raw = if has_aux {
            self.inner.backend.aux_encoder_raw().await?
        } else {
            self.inner.backend.position_raw().await?
        };
        Ok(self.inner.config.read().aux_to_scaled(raw))
    }

    #[instrument(skip(self), fields(axis = %self.inner.name))]
    fn initialize(&self) -> OperationHandle {
        self.launch(OperationKind::Initialize, Job::Initialize)
    }

    #[instrument(skip(self), fields(axis = %self.inner.name))]
    fn move_absolute(&self, dest: f64) -> OperationHandle {
        let raw = self.inner.config.read().to_raw(dest);
        self.move_absolute_raw(raw)
    }

    #[instrument(skip(self), fields(axis = %self.inner.name))]
    fn move_relative(&self, dist: f64) -> OperationHandle {
        let raw = self.inner.config.read().distance_to_raw(dist);
        self.move_relative_raw(raw)
    }

    fn move_absolute_raw(&self, dest_raw: f64) -> OperationHandle {
        self.launch(
            OperationKind::MoveAbsolute,
            Job::Move {
                motion: Motion::Absolute(dest_raw),
                checked: true,
            },
        )
    }

    fn move_relative_raw(&self, dist_raw: f64) -> OperationHandle {
        self.launch(
            OperationKind::MoveRelative,
            Job::Move {
                motion: Motion::Relative(dist_raw),
                checked: true,
            },
        )
    }

    fn move_absolute_raw_no_check(&self, dest_raw: f64) -> OperationHandle {
        self.launch(
            OperationKind::MoveAbsolute,
            Job::Move {
                motion: Motion::Absolute(dest_raw),
                checked: false,
            },
        )
    }

    fn move_relative_raw_no_check(&self, dist_raw: f64) -> OperationHandle {
        self.launch(
            OperationKind::MoveRelative,
            Job::Move {
                motion: Motion::Relative(dist_raw),
                checked: false,
            },
        )
    }

    #[instrument(skip(self), fields(axis = %self.inner.name), err)]
    fn find_home(&self, speed: f64) -> AxisResult<OperationHandle> {
        let supported = self.inner.config.read().has_home;
        self.launch_search(OperationKind::FindHome, supported, Search::Home, speed)
    }

    #[instrument(skip(self), fields(axis = %self.inner.name), err)]
    fn find_index(&self, speed: f64) -> AxisResult<OperationHandle> {
        let supported = self.inner.config.read().has_index;
        self.launch_search(OperationKind::FindIndex, supported, Search::Index, speed)
    }

    #[instrument(skip(self), fields(axis = %self.inner.name), err)]
    fn find_lower_limit(&self, speed: f64) -> AxisResult<OperationHandle> {
        let (supported, inverted) = {
            let config = self.inner.config.read();
            (config.has_limits, config.is_inverted())
        };
        let search = if inverted { Search::UpperRaw } else { Search::LowerRaw };
        self.launch_search(OperationKind::FindLowerLimit, supported, search, speed)
    }

    #[instrument(skip(self), fields(axis = %self.inner.name), err)]
    fn find_upper_limit(&self, speed: f64) -> AxisResult<OperationHandle> {
        let (supported, inverted) = {
            let config = self.inner.config.read();
            (config.has_limits, config.is_inverted())
        };
        let search = if inverted { Search::LowerRaw } else { Search::UpperRaw };
        self.launch_search(OperationKind::FindUpperLimit, supported, search, speed)
    }

    fn current_operation(&self) -> Option<OperationHandle> {
        self.inner
            .current
            .lock()
            .clone()
            .filter(|op| !op.is_finished())
    }

    async fn set_target(&self, dest: f64) -> AxisResult<StatusCode> {
        let raw = self.inner.config.read().to_raw(dest);
        self.set_target_raw(raw).await
    }

    #[instrument(skip(self), fields(axis = %self.inner.name), err)]
    async fn set_target_raw(&self, dest_raw: f64) -> AxisResult<StatusCode> {
        let Some(_guard) = self.inner.try_acquire() else {
            debug!("axis locked, target refused");
            return Ok(StatusCode::Locked);
        };

        let backend = &self.inner.backend;
        if !backend.is_enabled().await? {
            return Ok(StatusCode::Disabled);
        }
        if !backend.is_initialized().await? {
            return Ok(StatusCode::Uninitialized);
        }
        let limits = self.inner.config.read().check_soft_limits(dest_raw);
        if let Err(status) = limits {
            return Ok(status);
        }

        backend.set_target_raw(dest_raw).await?;
        *self.inner.target_raw.lock() = Some(dest_raw);
        Ok(StatusCode::Ok)
    }

    #[instrument(skip(self), fields(axis = %self.inner.name), err)]
    async fn abort_move(&self) -> AxisResult<StatusCode> {
        self.inner.halt(Halt::Abort).await
    }

    #[instrument(skip(self), fields(axis = %self.inner.name), err)]
    async fn stop_move(&self) -> AxisResult<StatusCode> {
        self.inner.halt(Halt::Stop).await
    }

    fn set_axis_units(&self, units: &str) {
        self.inner.config.write().axis_units = units.to_string();
        self.inner
            .persist(keys::AXIS_UNITS, toml::Value::String(units.to_string()));
    }

    fn set_scale(&self, scale: f64) {
        let stored = {
            let mut config = self.inner.config.write();
            config.set_scale(scale);
            config.scale()
        };
        self.inner.persist_float(keys::SCALE, stored);
    }

    fn set_offset_raw(&self, offset_raw: f64) {
        self.inner.config.write().set_offset_raw(offset_raw);
        self.inner.persist_float(keys::OFFSET_RAW, offset_raw);
    }

    fn set_lower_limit_soft(&self, scaled: f64) -> StatusCode {
        let outcome = {
            let mut config = self.inner.config.write();
            config
                .set_lower_limit_soft(scaled)
                .map(|key| (key, soft_raw(&config, key)))
        };
        self.persist_soft_limit(outcome)
    }

    fn set_upper_limit_soft(&self, scaled: f64) -> StatusCode {
        let outcome = {
            let mut config = self.inner.config.write();
            config
                .set_upper_limit_soft(scaled)
                .map(|key| (key, soft_raw(&config, key)))
        };
        self.persist_soft_limit(outcome)
    }

    fn set_initialize_speed_raw(&self, raw: f64) {
        self.inner.config.write().initialize_speed_raw = raw;
        self.inner.persist_float(keys::INITIALIZE_SPEED_RAW, raw);
    }

    fn set_default_speed_raw(&self, raw: f64) {
        self.inner.config.write().default_speed_raw = raw;
        self.inner.persist_float(keys::DEFAULT_SPEED_RAW, raw);
    }

    fn set_default_acceleration_raw(&self, raw: f64) {
        self.inner.config.write().default_acceleration_raw = raw;
        self.inner.persist_float(keys::DEFAULT_ACCELERATION_RAW, raw);
    }
}

fn soft_raw(config: &AxisConfig, key: &str) -> f64 {
    if key == keys::LOWER_LIMIT_SOFT_RAW {
        config.lower_limit_soft_raw()
    } else {
        config.upper_limit_soft_raw()
    }
}

impl AxisEngine {
    fn persist_soft_limit(&self, outcome: Result<(&'static str, f64), StatusCode>) -> StatusCode {
        match outcome {
            Ok((key, raw)) => {
                self.inner.persist_float(key, raw);
                StatusCode::Ok
            }
            Err(status) => {
                debug!(axis = %self.inner.name, %status, "soft limit refused");
                status
            }
        }
    }
}
