use crate::{
    profiler::{ProfilerError, device::DeviceEvent},
    types::TraceThreadId,
};
use derive_more::Display;
use std::{borrow::Cow, time::Instant};

/// What an [`Event`] records.
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Point-in-time marker.
    #[display("mark")]
    Mark,
    /// Start of a range.
    #[display("push")]
    PushRange,
    /// End of the innermost open range.
    #[display("pop")]
    PopRange,
}

/// One entry of a thread's event list.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    kind: EventKind,
    name: Cow<'static, str>,
    thread_id: TraceThreadId,
    device_event: Option<DeviceEvent>,
    cpu_time: Instant,
}

impl Event {
    pub(crate) fn new(
        kind: EventKind,
        name: Cow<'static, str>,
        thread_id: TraceThreadId,
        device_event: Option<DeviceEvent>,
    ) -> Self {
        Self {
            kind,
            name,
            thread_id,
            device_event,
            cpu_time: Instant::now(),
        }
    }

    /// Event kind.
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Range or marker label; empty for `PopRange`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Profiler-assigned id of the recording thread.
    pub fn thread_id(&self) -> TraceThreadId {
        self.thread_id
    }

    /// Whether a device stamp was recorded with this event.
    pub fn has_device_event(&self) -> bool {
        self.device_event.is_some()
    }

    /// The device stamp, if one was recorded.
    pub fn device_event(&self) -> Option<DeviceEvent> {
        self.device_event
    }

    /// CPU clock reading taken when the event was recorded.
    pub fn cpu_time(&self) -> Instant {
        self.cpu_time
    }

    /// CPU time from `self` to `end`, in microseconds.
    pub fn cpu_elapsed_us(&self, end: &Event) -> f64 {
        end.cpu_time
            .saturating_duration_since(self.cpu_time)
            .as_secs_f64()
            * 1e6
    }

    /// Device time from `self` to `end`, in microseconds.
    ///
    /// # Errors
    /// - `ProfilerError::MissingDeviceEvent` if either event has no device
    ///   stamp.
    /// - `ProfilerError::DeviceMismatch` if the stamps come from different
    ///   devices.
    pub fn device_elapsed_us(&self, end: &Event) -> Result<f64, ProfilerError> {
        let (Some(start), Some(stop)) = (self.device_event, end.device_event) else {
            return Err(ProfilerError::MissingDeviceEvent);
        };
        if start.device != stop.device {
            return Err(ProfilerError::DeviceMismatch {
                start: start.device,
                end: stop.device,
            });
        }
        Ok((stop.timestamp_ns as f64 - start.timestamp_ns as f64) / 1e3)
    }
}
