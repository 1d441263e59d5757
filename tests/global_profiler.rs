#![allow(missing_docs)]
#![cfg(not(feature = "loom"))]

// Installs the process-wide profiler, so this binary holds a single test.

use fngraph::{
    Profiler, ProfilerState,
    profiler::{self, DeviceEvent, DeviceTracer},
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Single-device tracer keeping the forwarded calls.
#[derive(Debug, Default)]
struct ForwardLog(Mutex<Vec<String>>);

impl DeviceTracer for ForwardLog {
    fn device_count(&self) -> usize {
        1
    }

    fn current_device(&self) -> usize {
        0
    }

    fn set_device(&self, _device: usize) {}

    fn synchronize(&self) {}

    fn record_event(&self) -> DeviceEvent {
        DeviceEvent {
            device: 0,
            timestamp_ns: 0,
        }
    }

    fn mark(&self, name: &str) {
        self.0.lock().push(format!("mark {name}"));
    }

    fn range_push(&self, name: &str) {
        self.0.lock().push(format!("push {name}"));
    }

    fn range_pop(&self) {
        self.0.lock().push("pop".to_owned());
    }
}

#[test]
fn installed_profiler_serves_the_free_functions() {
    let log = Arc::new(ForwardLog::default());
    Profiler::install_global(Profiler::with_device_tracer(log.clone()))
        .expect("nothing used the global profiler yet");
    let rejected = Profiler::install_global(Profiler::new()).expect_err("already installed");
    assert_eq!(rejected.state(), ProfilerState::Disabled);

    // The default global profiler has no tracer and would reject this mode.
    profiler::enable(ProfilerState::DeviceTrace).expect("installed profiler has a tracer");
    {
        let _range = profiler::record_function("step");
        profiler::mark("inside", true);
    }
    let report = profiler::disable().expect("running");

    assert!(report.is_empty());
    assert_eq!(
        *log.0.lock(),
        [
            "mark __start_profile",
            "push step",
            "mark inside",
            "pop",
            "mark __stop_profile",
        ]
    );
}
