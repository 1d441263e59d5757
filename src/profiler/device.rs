/// Stamp recorded on a device queue alongside a CPU-side event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DeviceEvent {
    /// Device the stamp was recorded on.
    pub device: usize,
    /// Device clock reading, in nanoseconds.
    pub timestamp_ns: u64,
}

/// Vendor tracing backend.
///
/// Serves two modes: in `ProfilerState::Device` the profiler keeps its own
/// event lists and asks the backend for a device stamp per event; in
/// `ProfilerState::DeviceTrace` marks and ranges are forwarded verbatim and the
/// vendor tool owns the data.
pub trait DeviceTracer: Send + Sync {
    /// Number of devices the backend drives.
    fn device_count(&self) -> usize;
    /// Device that subsequent calls act on.
    fn current_device(&self) -> usize;
    /// Select the device subsequent calls act on.
    fn set_device(&self, device: usize);
    /// Block until all queued work on the current device has finished.
    fn synchronize(&self);
    /// Record a stamp on the current device.
    fn record_event(&self) -> DeviceEvent;
    /// Forward a marker to the vendor tool.
    fn mark(&self, name: &str);
    /// Forward a range start to the vendor tool.
    fn range_push(&self, name: &str);
    /// Forward a range end to the vendor tool.
    fn range_pop(&self);
}
