use crate::{config::Config, edge::Edge, sync::UnsafeCell};
use core::ops::Range;
use derive_more::{Deref, DerefMut};
use indexmap::IndexMap as _IndexMap;
use rustc_hash::FxBuildHasher;

/// A minimal `UnsafeCell` wrapper that is `Sync` when `T: Sync`.
///
/// Used for per-thread event storage: the owning thread is the only writer and
/// the consolidating thread reads only after sealing the list, so the cell is
/// never accessed from two threads in conflicting phases.
#[derive(Debug, Deref, DerefMut)]
#[repr(transparent)]
pub(crate) struct SyncUnsafeCell<T>(UnsafeCell<T>);

unsafe impl<T: Sync> Sync for SyncUnsafeCell<T> {}

impl<T> SyncUnsafeCell<T> {
    pub(crate) fn new(val: T) -> Self {
        Self(UnsafeCell::new(val))
    }
}

/// Creation-order stamp of a node. Higher numbers are prioritized by the
/// backward traversal.
pub type SequenceNr = u64;
/// Index of an input slot on a node.
pub type InputNr = u32;
/// Half-open range of output indices, see `Node::should_compute_any_output`.
pub type IndexRange = Range<usize>;
/// Identifier the profiler assigns to each recording thread.
pub type TraceThreadId = u32;

/// List of values flowing into or out of a node.
pub type ValueList<C> = Vec<<C as Config>::Value>;
/// Outgoing edges of a node.
pub type EdgeList<C> = Vec<Edge<C>>;

/// `IndexMap` type with fast hasher.
pub type IndexMap<K, V> = _IndexMap<K, V, FxBuildHasher>;
