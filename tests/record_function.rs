#![allow(missing_docs)]
#![cfg(not(feature = "loom"))]

// Exercises the process-wide profiler, so this binary holds a single test.

mod common;

use common::{Broken, Scale, TestConfig, TestValue};
use fngraph::{
    Node, Profiler, ProfilerState,
    profiler::{self, EventKind, record_function},
    types::EdgeList,
};

#[test]
fn node_calls_record_ranges_on_the_global_profiler() {
    let op = Node::<TestConfig>::new(Scale("mul"), EdgeList::new());
    let broken = Node::<TestConfig>::new(Broken { panic: false }, EdgeList::new());

    // Nothing is recorded before profiling starts.
    op.call(vec![TestValue::new(1.0, &[])]).expect("scale never fails");
    profiler::mark("ignored", true);

    profiler::enable(ProfilerState::Cpu).expect("profiler starts disabled");
    assert_eq!(Profiler::global().state(), ProfilerState::Cpu);
    op.call(vec![TestValue::new(1.0, &[])]).expect("scale never fails");
    assert!(broken.call(Vec::new()).is_err());
    {
        let _range = record_function("scope");
        profiler::mark("inside", false);
    }
    let report = profiler::disable().expect("profiler is running");

    assert_eq!(report.len(), 1);
    let events: Vec<_> = report[0]
        .iter()
        .map(|event| (event.kind(), event.name().to_owned()))
        .collect();
    assert_eq!(
        events,
        vec![
            (EventKind::Mark, "__start_profile".to_owned()),
            (EventKind::PushRange, "mul".to_owned()),
            (EventKind::PopRange, String::new()),
            (EventKind::PushRange, "Broken".to_owned()),
            (EventKind::PopRange, String::new()),
            (EventKind::PushRange, "scope".to_owned()),
            (EventKind::Mark, "inside".to_owned()),
            (EventKind::PopRange, String::new()),
            (EventKind::Mark, "__stop_profile".to_owned()),
        ]
    );
    assert!(report[0].iter().all(|event| !event.has_device_event()));

    assert_eq!(
        profiler::enable(ProfilerState::DeviceTrace),
        Err(fngraph::ProfilerError::Unsupported {
            mode: ProfilerState::DeviceTrace
        })
    );
    assert_eq!(
        profiler::disable().unwrap_err(),
        fngraph::ProfilerError::NotRunning
    );
}
