use crate::{
    config::Config,
    function::Node,
    profiler::Profiler,
    sync::thread_local,
    types::SequenceNr,
};
use std::{borrow::Cow, cell::Cell};

thread_local! {
    static BACKWARD_APPLY_SEQUENCE_NR: Cell<Option<SequenceNr>> = Cell::new(None);
}

/// Mark the calling thread as executing the backward step of the node with
/// the given sequence number, or clear the mark with `None`.
///
/// While set, [`RecordFunction::with_sequence_nr`] appends the number to its
/// label so traces show which backward step an operation ran under.
pub fn set_backward_apply_state(sequence_nr: Option<SequenceNr>) {
    BACKWARD_APPLY_SEQUENCE_NR.with(|cell| cell.set(sequence_nr));
}

/// The sequence number set by [`set_backward_apply_state`] on this thread.
pub fn backward_apply_sequence_nr() -> Option<SequenceNr> {
    BACKWARD_APPLY_SEQUENCE_NR.with(Cell::get)
}

/// Profiler range tied to a lexical scope.
///
/// Pushes a range on construction and pops it on drop, whichever way the scope
/// is left. Nothing is pushed, and the label is never built, while the profiler
/// is disabled. The pop is skipped if nothing was pushed, and dropped by the
/// profiler if it was disabled in the meantime.
#[must_use]
#[derive(Debug)]
pub struct RecordFunction<'p> {
    profiler: &'p Profiler,
    pushed: bool,
}

impl<'p> RecordFunction<'p> {
    /// Push a range labeled `name`.
    pub fn new(profiler: &'p Profiler, name: impl Into<Cow<'static, str>>) -> Self {
        Self::with_name(profiler, || name.into())
    }

    /// Push a range whose label is computed only if the profiler is enabled.
    pub fn with_name(profiler: &'p Profiler, name: impl FnOnce() -> Cow<'static, str>) -> Self {
        if !profiler.is_enabled() {
            return Self {
                profiler,
                pushed: false,
            };
        }
        profiler.push_range(name());
        Self {
            profiler,
            pushed: true,
        }
    }

    /// Range labeled with the node's name.
    pub fn for_node<C: Config>(profiler: &'p Profiler, node: &Node<C>) -> Self {
        Self::with_name(profiler, || node.name())
    }

    /// Range labeled `"{name}, current seq nr {sequence_nr}"`, followed by
    /// `", backward apply seq nr {n}"` inside a backward step.
    pub fn with_sequence_nr(profiler: &'p Profiler, name: &str, sequence_nr: SequenceNr) -> Self {
        Self::with_name(profiler, || {
            let mut label = format!("{name}, current seq nr {sequence_nr}");
            if let Some(backward_nr) = backward_apply_sequence_nr() {
                label.push_str(&format!(", backward apply seq nr {backward_nr}"));
            }
            Cow::Owned(label)
        })
    }
}

impl Drop for RecordFunction<'_> {
    fn drop(&mut self) {
        if self.pushed {
            self.profiler.pop_range();
        }
    }
}
