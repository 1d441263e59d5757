mod device;
mod event;
mod event_list;
mod record;

pub use crate::profiler::{
    device::{DeviceEvent, DeviceTracer},
    event::{Event, EventKind},
    record::{RecordFunction, backward_apply_sequence_nr, set_backward_apply_state},
};
use crate::{
    profiler::event_list::RangeEventList,
    sync::{AtomicU8, Mutex, Ordering, lock, thread_local},
    types::{IndexMap, TraceThreadId},
};
use core::sync::atomic::{AtomicU64 as IdCounter, Ordering as IdOrdering};
use derive_more::Display;
use std::{
    borrow::Cow,
    cell::RefCell,
    sync::{Arc, OnceLock},
};
use thiserror::Error;
use tracing::{debug, trace};

/// Warm-up rounds per device before the measurement window opens. The first
/// device stamps of a process carry driver startup latency.
const DEVICE_WARMUP_ROUNDS: usize = 5;

/// Consolidated profiling report: one event sequence per recording thread,
/// most recently registered thread first, each in recording order.
pub type ThreadEventLists = Vec<Vec<Event>>;

/// Error kind for profiler state transitions and event arithmetic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProfilerError {
    /// `enable` was asked to switch to `ProfilerState::Disabled`.
    #[error("can't enable the profiler in the disabled state")]
    InvalidMode,
    /// The requested mode needs a device tracer and none is installed.
    #[error("{mode} profiling requires a device tracer, but none is installed")]
    Unsupported {
        /// The rejected mode.
        mode: ProfilerState,
    },
    /// `enable` was called while the profiler is running.
    #[error("can't switch profiling to {requested} while {running} profiling is running")]
    AlreadyRunning {
        /// Mode profiling runs in.
        running: ProfilerState,
        /// Mode `enable` was called with.
        requested: ProfilerState,
    },
    /// `disable` was called while the profiler is not running.
    #[error("can't disable the profiler when it's not running")]
    NotRunning,
    /// A device interval was requested for an event without a device stamp.
    #[error("events were not recorded with a device stamp")]
    MissingDeviceEvent,
    /// A device interval was requested across two devices.
    #[error("events were recorded on different devices ({start} and {end})")]
    DeviceMismatch {
        /// Device of the start event.
        start: usize,
        /// Device of the end event.
        end: usize,
    },
}

/// Profiling mode.
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ProfilerState {
    /// Nothing is recorded.
    #[display("disabled")]
    Disabled = 0,
    /// CPU timestamps only.
    #[display("cpu")]
    Cpu = 1,
    /// CPU timestamps plus device stamps from the installed tracer.
    #[display("device")]
    Device = 2,
    /// Marks and ranges are forwarded to the installed tracer.
    #[display("device trace")]
    DeviceTrace = 3,
}

impl ProfilerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Disabled,
            1 => Self::Cpu,
            2 => Self::Device,
            3 => Self::DeviceTrace,
            _ => unreachable!("ProfilerState::from_u8"),
        }
    }

    fn requires_device(self) -> bool {
        matches!(self, Self::Device | Self::DeviceTrace)
    }
}

#[derive(Debug, Default)]
struct Registry {
    next_thread_id: TraceThreadId,
    /// Event lists in registration order.
    event_lists: IndexMap<TraceThreadId, Arc<RangeEventList>>,
}

/// A thread's handle on its event list in one profiler.
struct ThreadContext {
    profiler_id: u64,
    thread_id: TraceThreadId,
    event_list: Arc<RangeEventList>,
}

thread_local! {
    static THREAD_CONTEXTS: RefCell<Vec<ThreadContext>> = RefCell::new(Vec::new());
}

static NEXT_PROFILER_ID: IdCounter = IdCounter::new(0);

static GLOBAL: OnceLock<Profiler> = OnceLock::new();

/// Range profiler with per-thread event lists.
///
/// Every recording thread appends to its own list without locking; the list is
/// created and registered on the thread's first event. The registry lock is
/// only taken for that registration, for `enable`/`disable` and for
/// consolidation. The mode is read lock-free on every event, so an event racing
/// with `disable` may be dropped. In particular a range pushed before `disable`
/// and popped after it loses its pop.
///
/// Most code uses the process-wide instance through [`Profiler::global`] and
/// the free functions of this module; separate instances keep separate
/// registries.
#[derive(derive_more::Debug)]
pub struct Profiler {
    id: u64,
    state: AtomicU8,
    registry: Mutex<Registry>,
    #[debug(skip)]
    device_tracer: Option<Arc<dyn DeviceTracer>>,
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Profiler {
    /// Profiler without device support: `Device` and `DeviceTrace` modes are
    /// rejected.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Profiler that supports the `Device` and `DeviceTrace` modes through
    /// `device_tracer`.
    pub fn with_device_tracer(device_tracer: Arc<dyn DeviceTracer>) -> Self {
        Self::build(Some(device_tracer))
    }

    fn build(device_tracer: Option<Arc<dyn DeviceTracer>>) -> Self {
        Self {
            id: NEXT_PROFILER_ID.fetch_add(1, IdOrdering::Relaxed),
            state: AtomicU8::new(ProfilerState::Disabled as u8),
            registry: Mutex::new(Registry::default()),
            device_tracer,
        }
    }

    /// The process-wide profiler, created without device support on first use
    /// unless one was installed.
    pub fn global() -> &'static Profiler {
        GLOBAL.get_or_init(Profiler::new)
    }

    /// Install the process-wide profiler.
    ///
    /// # Errors
    /// Gives `profiler` back if the global profiler already exists.
    pub fn install_global(profiler: Profiler) -> Result<(), Profiler> {
        GLOBAL.set(profiler)
    }

    /// Current mode.
    #[inline]
    pub fn state(&self) -> ProfilerState {
        ProfilerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// `true` in every mode but `Disabled`.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.state() != ProfilerState::Disabled
    }

    /// Number of thread event lists currently held by the registry.
    pub fn num_registered_threads(&self) -> usize {
        lock(&self.registry).event_lists.len()
    }

    /// Start profiling in `mode`.
    ///
    /// In timer modes a `__start_profile` mark opens the report. `Device` mode
    /// first runs warm-up marks with synchronization on every device, then
    /// records one anchor mark per device.
    ///
    /// # Errors
    /// - `ProfilerError::InvalidMode` if `mode` is `Disabled`.
    /// - `ProfilerError::Unsupported` if `mode` needs a device tracer and none
    ///   is installed.
    /// - `ProfilerError::AlreadyRunning` if profiling is already enabled.
    pub fn enable(&self, mode: ProfilerState) -> Result<(), ProfilerError> {
        if mode == ProfilerState::Disabled {
            return Err(ProfilerError::InvalidMode);
        }
        if mode.requires_device() && self.device_tracer.is_none() {
            return Err(ProfilerError::Unsupported { mode });
        }
        {
            let registry = lock(&self.registry);
            let running = self.state();
            if running != ProfilerState::Disabled {
                return Err(ProfilerError::AlreadyRunning {
                    running,
                    requested: mode,
                });
            }
            for event_list in registry.event_lists.values() {
                event_list.unseal();
            }
            self.state.store(mode as u8, Ordering::Release);
        }
        debug!(profiler = self.id, %mode, "profiler enabled");

        if mode == ProfilerState::Device {
            if let Some(device_tracer) = &self.device_tracer {
                self.warm_up_devices(device_tracer.as_ref());
            }
        }
        self.mark("__start_profile", false);
        Ok(())
    }

    fn warm_up_devices(&self, device_tracer: &dyn DeviceTracer) {
        let initial_device = device_tracer.current_device();
        let device_count = device_tracer.device_count();
        for _ in 0..DEVICE_WARMUP_ROUNDS {
            for device in 0..device_count {
                device_tracer.set_device(device);
                self.mark("__device_startup", true);
                device_tracer.synchronize();
            }
        }
        // Device stamps can only be compared on the same device, so every
        // device gets its own anchor against the CPU clock.
        for device in 0..device_count {
            device_tracer.set_device(device);
            self.mark("__device_start_event", true);
        }
        device_tracer.set_device(initial_device);
    }

    /// Stop profiling and collect the report.
    ///
    /// A `__stop_profile` mark closes the report. In `DeviceTrace` mode the
    /// report is empty. Otherwise every thread list is drained, threads that
    /// recorded nothing in this session are left out, and lists no thread
    /// holds anymore are dropped from the registry.
    ///
    /// # Errors
    /// `ProfilerError::NotRunning` if profiling is not enabled.
    pub fn disable(&self) -> Result<ThreadEventLists, ProfilerError> {
        let running = self.state();
        if running == ProfilerState::Disabled {
            return Err(ProfilerError::NotRunning);
        }
        self.mark("__stop_profile", true);

        let (report, collected) = {
            let mut registry = lock(&self.registry);
            if self
                .state
                .compare_exchange(
                    running as u8,
                    ProfilerState::Disabled as u8,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_err()
            {
                // Lost a race against a concurrent `disable`.
                return Err(ProfilerError::NotRunning);
            }
            if running == ProfilerState::DeviceTrace {
                (ThreadEventLists::new(), 0)
            } else {
                let report: ThreadEventLists = registry
                    .event_lists
                    .values()
                    .rev()
                    .map(|event_list| event_list.consolidate())
                    .filter(|events| !events.is_empty())
                    .collect();
                let registered = registry.event_lists.len();
                registry
                    .event_lists
                    .retain(|_, event_list| Arc::strong_count(event_list) > 1);
                (report, registered - registry.event_lists.len())
            }
        };
        debug!(
            profiler = self.id,
            threads = report.len(),
            collected,
            "profiler disabled"
        );
        Ok(report)
    }

    /// Record a marker. `include_device` requests a device stamp in `Device`
    /// mode.
    pub fn mark(&self, name: impl Into<Cow<'static, str>>, include_device: bool) {
        match self.state() {
            ProfilerState::Disabled => {}
            ProfilerState::DeviceTrace => {
                if let Some(device_tracer) = &self.device_tracer {
                    let name: Cow<'static, str> = name.into();
                    device_tracer.mark(&name);
                }
            }
            state => self.record(
                EventKind::Mark,
                name.into(),
                include_device && state == ProfilerState::Device,
            ),
        }
    }

    /// Open a range labeled `name` on the calling thread.
    pub fn push_range(&self, name: impl Into<Cow<'static, str>>) {
        match self.state() {
            ProfilerState::Disabled => {}
            ProfilerState::DeviceTrace => {
                if let Some(device_tracer) = &self.device_tracer {
                    let name: Cow<'static, str> = name.into();
                    device_tracer.range_push(&name);
                }
            }
            state => self.record(
                EventKind::PushRange,
                name.into(),
                state == ProfilerState::Device,
            ),
        }
    }

    /// Close the innermost open range of the calling thread.
    pub fn pop_range(&self) {
        match self.state() {
            ProfilerState::Disabled => {}
            ProfilerState::DeviceTrace => {
                if let Some(device_tracer) = &self.device_tracer {
                    device_tracer.range_pop();
                }
            }
            state => self.record(
                EventKind::PopRange,
                Cow::Borrowed(""),
                state == ProfilerState::Device,
            ),
        }
    }

    fn record(&self, kind: EventKind, name: Cow<'static, str>, with_device_event: bool) {
        let device_event = if with_device_event {
            self.device_tracer
                .as_ref()
                .map(|device_tracer| device_tracer.record_event())
        } else {
            None
        };
        self.with_thread_context(|context| {
            context.event_list.record(Event::new(
                kind,
                name,
                context.thread_id,
                device_event,
            ))
        });
    }

    /// Runs `f` on the calling thread's context for this profiler, registering
    /// the thread first if needed. Returns `None` while the thread's locals are
    /// being torn down.
    fn with_thread_context<R>(&self, f: impl FnOnce(&ThreadContext) -> R) -> Option<R> {
        THREAD_CONTEXTS
            .try_with(|contexts| {
                let is_registered = contexts
                    .borrow()
                    .iter()
                    .any(|context| context.profiler_id == self.id);
                if !is_registered {
                    let context = self.register_thread();
                    let thread_id = context.thread_id;
                    {
                        let mut contexts = contexts.borrow_mut();
                        // Contexts whose profiler is gone hold the last reference
                        // to their list.
                        contexts.retain(|context| Arc::strong_count(&context.event_list) > 1);
                        contexts.push(context);
                    }
                    // Neither the registry lock nor the borrow is held here: a
                    // subscriber may record into this profiler.
                    trace!(profiler = self.id, thread_id, "registered profiler thread");
                }
                let contexts = contexts.borrow();
                contexts
                    .iter()
                    .find(|context| context.profiler_id == self.id)
                    .map(f)
            })
            .ok()
            .flatten()
    }

    fn register_thread(&self) -> ThreadContext {
        let mut registry = lock(&self.registry);
        let thread_id = registry.next_thread_id;
        registry.next_thread_id = thread_id
            .checked_add(1)
            .expect("Profiler::register_thread: [1]");
        // A thread that passed the mode check just before `disable` must not
        // leak its event into the next session.
        let sealed = self.state() == ProfilerState::Disabled;
        let event_list = Arc::new(RangeEventList::new(sealed));
        let inserted_new = registry
            .event_lists
            .insert(thread_id, Arc::clone(&event_list))
            .is_none();
        assert!(inserted_new, "Profiler::register_thread: [2]");
        ThreadContext {
            profiler_id: self.id,
            thread_id,
            event_list,
        }
    }
}

/// Enable the global profiler, see [`Profiler::enable`].
///
/// # Errors
/// As [`Profiler::enable`].
pub fn enable(mode: ProfilerState) -> Result<(), ProfilerError> {
    Profiler::global().enable(mode)
}

/// Disable the global profiler, see [`Profiler::disable`].
///
/// # Errors
/// As [`Profiler::disable`].
pub fn disable() -> Result<ThreadEventLists, ProfilerError> {
    Profiler::global().disable()
}

/// Record a marker on the global profiler, see [`Profiler::mark`].
pub fn mark(name: impl Into<Cow<'static, str>>, include_device: bool) {
    Profiler::global().mark(name, include_device);
}

/// Open a range on the global profiler.
pub fn push_range(name: impl Into<Cow<'static, str>>) {
    Profiler::global().push_range(name);
}

/// Close a range on the global profiler.
pub fn pop_range() {
    Profiler::global().pop_range();
}

/// Scoped range on the global profiler.
pub fn record_function(name: impl Into<Cow<'static, str>>) -> RecordFunction<'static> {
    RecordFunction::new(Profiler::global(), name)
}
