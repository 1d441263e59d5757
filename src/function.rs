mod anomaly;
mod hooks;
mod teardown;

pub use crate::function::{
    anomaly::AnomalyMetadata,
    hooks::{PostHook, PreHook},
};
use crate::{
    config::Config,
    edge::Edge,
    input_metadata::InputMetadata,
    profiler::{Profiler, RecordFunction},
    sequence::next_sequence_nr,
    types::{EdgeList, IndexRange, InputNr, SequenceNr, ValueList},
    variable::{TensorMeta, Variable},
};
use core::{any::Any, fmt};
use parking_lot::{
    MappedRwLockReadGuard, Mutex, RwLock, RwLockReadGuard,
};
use std::{
    borrow::Cow,
    sync::{Arc, OnceLock, Weak},
};
use thiserror::Error;

/// Error kind for connectivity queries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GraphError {
    /// An output index is not smaller than the node's number of outputs.
    #[error("output index {index} out of range for a node with {len} outputs")]
    IndexOutOfRange {
        /// The requested output index.
        index: usize,
        /// Number of outputs of the node.
        len: usize,
    },
}

/// Opaque object a language binding attaches to a node.
pub type ForeignObject = dyn Any + Send + Sync;

/// Per-operation behavior of a graph node.
///
/// `apply` is the only required method. The capability queries default to
/// the conservative answer: not traceable, state not passed transparently, no
/// hidden saved values. `name`, `is_traceable` and
/// `passes_state_transparently` are read once when the node is built.
pub trait Function<C: Config>: Send + 'static {
    /// Human-readable operation name, used as the profiler range label.
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed(core::any::type_name::<Self>())
    }

    /// Performs the operation.
    ///
    /// # Errors
    /// Whatever the operation reports.
    fn apply(&mut self, inputs: ValueList<C>) -> Result<ValueList<C>, C::Error>;

    /// Releases saved values if the operation won't be reused.
    fn release_variables(&mut self) {}

    /// Called before `apply` when `release_variables` will follow it, so large
    /// operations can release incrementally while they run.
    fn will_release_variables(&mut self) {}

    /// `true` if everything `apply` does is expressed through other graph
    /// operations, so an exporter can replay it from the graph alone.
    fn is_traceable(&self) -> bool {
        false
    }

    /// `true` if the state handed to the backward step consists only of saved
    /// values and graph-shaping parameters that don't depend on value data.
    /// Only consulted when `is_traceable` is `false`.
    fn passes_state_transparently(&self) -> bool {
        false
    }

    /// Values held by the operation that are not visible through edges or
    /// input metadata.
    fn saved_variables(&self) -> Option<ValueList<C>> {
        None
    }
}

/// Marks the wrapped function as traceable.
#[derive(Debug, Clone, Default)]
pub struct Traceable<F>(pub F);

impl<C: Config, F: Function<C>> Function<C> for Traceable<F> {
    fn name(&self) -> Cow<'static, str> {
        self.0.name()
    }

    fn apply(&mut self, inputs: ValueList<C>) -> Result<ValueList<C>, C::Error> {
        self.0.apply(inputs)
    }

    fn release_variables(&mut self) {
        self.0.release_variables();
    }

    fn will_release_variables(&mut self) {
        self.0.will_release_variables();
    }

    fn is_traceable(&self) -> bool {
        true
    }

    fn passes_state_transparently(&self) -> bool {
        self.0.passes_state_transparently()
    }

    fn saved_variables(&self) -> Option<ValueList<C>> {
        self.0.saved_variables()
    }
}

/// A vertex of the computation graph.
///
/// Nodes are only ever handed out behind an `Arc`: edges elsewhere in the graph
/// refer to a node by identity, so it is neither cloned nor moved once built.
/// Outgoing edges always point towards the graph's inputs, so the graph never
/// contains reference cycles.
///
/// Every node carries a sequence number. Numbers drawn on the same thread
/// increase in creation order; there is no ordering between nodes created on
/// different threads. The backward traversal runs ready nodes with higher
/// sequence numbers first.
///
/// Mutating methods take `&self` and lock the affected field only. Guards
/// returned by `next_edges`, `pre_hooks` and `post_hooks` must be released
/// before mutating the same field on the same thread. Only `call`, the
/// release hooks and `saved_variables` lock the function itself.
pub struct Node<C: Config> {
    sequence_nr: SequenceNr,
    name: Cow<'static, str>,
    is_traceable: bool,
    passes_state_transparently: bool,
    next_edges: RwLock<EdgeList<C>>,
    input_metadata: RwLock<Vec<InputMetadata>>,
    pre_hooks: RwLock<Vec<Box<dyn PreHook<C>>>>,
    post_hooks: RwLock<Vec<Box<dyn PostHook<C>>>>,
    foreign_object: RwLock<Option<Weak<ForeignObject>>>,
    anomaly_metadata: OnceLock<AnomalyMetadata>,
    function: Mutex<Box<dyn Function<C>>>,
}

impl<C: Config> Node<C> {
    /// Build a node with a sequence number drawn from the process-wide
    /// allocator.
    pub fn new(function: impl Function<C>, next_edges: EdgeList<C>) -> Arc<Self> {
        Self::with_sequence_nr(next_sequence_nr(), function, next_edges)
    }

    /// Build a node with an explicit sequence number.
    pub fn with_sequence_nr(
        sequence_nr: SequenceNr,
        function: impl Function<C>,
        next_edges: EdgeList<C>,
    ) -> Arc<Self> {
        Arc::new(Self {
            sequence_nr,
            name: function.name(),
            is_traceable: function.is_traceable(),
            passes_state_transparently: function.passes_state_transparently(),
            next_edges: RwLock::new(next_edges),
            input_metadata: RwLock::default(),
            pre_hooks: RwLock::default(),
            post_hooks: RwLock::default(),
            foreign_object: RwLock::default(),
            anomaly_metadata: OnceLock::new(),
            function: Mutex::new(Box::new(function)),
        })
    }

    /// Evaluate the node inside a profiler range named after it.
    ///
    /// The range is closed on every exit path, including errors and panics.
    ///
    /// # Errors
    /// Propagates the error of `Function::apply`.
    pub fn call(&self, inputs: ValueList<C>) -> Result<ValueList<C>, C::Error> {
        self.call_with_profiler(Profiler::global(), inputs)
    }

    /// Same as [`Node::call`], recording into `profiler`.
    ///
    /// # Errors
    /// Propagates the error of `Function::apply`.
    pub fn call_with_profiler(
        &self,
        profiler: &Profiler,
        inputs: ValueList<C>,
    ) -> Result<ValueList<C>, C::Error> {
        let _record = RecordFunction::with_name(profiler, || self.name.clone());
        self.function.lock().apply(inputs)
    }

    // Inputs. They correspond to the outputs of the forward operation.

    /// Appends the metadata of a new input and returns its index.
    pub fn add_input_metadata(&self, meta: TensorMeta) -> InputNr {
        self.push_input_metadata(InputMetadata::new(meta))
    }

    /// Appends the metadata of `value`, or the undefined sentinel if the value
    /// is undefined.
    pub fn add_input_metadata_for(&self, value: &C::Value) -> InputNr {
        if value.is_defined() {
            self.push_input_metadata(InputMetadata::new(value.meta()))
        } else {
            self.push_input_metadata(InputMetadata::undefined())
        }
    }

    /// Appends a placeholder for an input that will not be used.
    pub fn add_undefined_input(&self) -> InputNr {
        self.push_input_metadata(InputMetadata::undefined())
    }

    fn push_input_metadata(&self, metadata: InputMetadata) -> InputNr {
        let mut input_metadata = self.input_metadata.write();
        let input_nr = input_metadata
            .len()
            .try_into()
            .expect("Node::add_input_metadata: [1]");
        input_metadata.push(metadata);
        input_nr
    }

    /// Number of input slots registered so far.
    pub fn num_inputs(&self) -> usize {
        self.input_metadata.read().len()
    }

    /// Descriptor of input slot `index`.
    ///
    /// # Panics
    /// If `index >= self.num_inputs()`.
    pub fn input_metadata(&self, index: usize) -> InputMetadata {
        self.input_metadata.read()[index].clone()
    }

    /// Forget all input slots.
    pub fn clear_input_metadata(&self) {
        self.input_metadata.write().clear();
    }

    // Outputs ("next edges").

    /// Returns outgoing edge `index`.
    ///
    /// # Panics
    /// If `index >= self.num_outputs()`; callers check the bound first.
    pub fn next_edge(&self, index: usize) -> Edge<C> {
        self.next_edges.read()[index].clone()
    }

    /// Replaces outgoing edge `index`.
    ///
    /// # Panics
    /// If `index >= self.num_outputs()`.
    pub fn set_next_edge(&self, index: usize, edge: Edge<C>) {
        self.next_edges.write()[index] = edge;
    }

    /// Appends an outgoing edge.
    pub fn add_next_edge(&self, edge: Edge<C>) {
        self.next_edges.write().push(edge);
    }

    /// Replaces all outgoing edges.
    pub fn set_next_edges(&self, next_edges: EdgeList<C>) {
        *self.next_edges.write() = next_edges;
    }

    /// Read access to the outgoing edges.
    pub fn next_edges(&self) -> RwLockReadGuard<'_, EdgeList<C>> {
        self.next_edges.read()
    }

    /// Number of outgoing edges, valid or not.
    pub fn num_outputs(&self) -> usize {
        self.next_edges.read().len()
    }

    /// Whether output `index` feeds any node, i.e. whether it is worth
    /// computing.
    ///
    /// # Errors
    /// `GraphError::IndexOutOfRange` if `index >= self.num_outputs()`.
    pub fn should_compute_output(&self, index: usize) -> Result<bool, GraphError> {
        let next_edges = self.next_edges.read();
        Self::is_active(&next_edges, index)
    }

    /// Whether any output in any of `ranges` feeds a node.
    ///
    /// # Errors
    /// `GraphError::IndexOutOfRange` if a range reaches past
    /// `self.num_outputs()` before an active output is found.
    pub fn should_compute_any_output(&self, ranges: &[IndexRange]) -> Result<bool, GraphError> {
        let next_edges = self.next_edges.read();
        for range in ranges {
            for index in range.clone() {
                if Self::is_active(&next_edges, index)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn is_active(next_edges: &EdgeList<C>, index: usize) -> Result<bool, GraphError> {
        next_edges
            .get(index)
            .map(Edge::is_valid)
            .ok_or(GraphError::IndexOutOfRange {
                index,
                len: next_edges.len(),
            })
    }

    // Miscellaneous.

    /// Creation-order stamp of this node.
    pub fn sequence_nr(&self) -> SequenceNr {
        self.sequence_nr
    }

    /// Operation name, as reported by `Function::name` at construction.
    pub fn name(&self) -> Cow<'static, str> {
        self.name.clone()
    }

    /// See `Function::is_traceable`.
    pub fn is_traceable(&self) -> bool {
        self.is_traceable
    }

    /// See `Function::passes_state_transparently`.
    pub fn passes_state_transparently(&self) -> bool {
        self.passes_state_transparently
    }

    /// See `Function::saved_variables`. Waits for a running `call`.
    pub fn saved_variables(&self) -> Option<ValueList<C>> {
        self.function.lock().saved_variables()
    }

    /// See `Function::release_variables`. Waits for a running `call`.
    pub fn release_variables(&self) {
        self.function.lock().release_variables();
    }

    /// See `Function::will_release_variables`. Waits for a running `call`.
    pub fn will_release_variables(&self) {
        self.function.lock().will_release_variables();
    }

    /// The object a language binding attached to this node, if it is still
    /// alive. The node never keeps it alive.
    pub fn foreign_object(&self) -> Option<Arc<ForeignObject>> {
        self.foreign_object.read().as_ref().and_then(Weak::upgrade)
    }

    /// Attach or detach the binding object.
    pub fn set_foreign_object(&self, object: Option<Weak<ForeignObject>>) {
        *self.foreign_object.write() = object;
    }

    /// Anomaly-tracking record of this node, created empty on first access.
    pub fn metadata(&self) -> &AnomalyMetadata {
        self.anomaly_metadata.get_or_init(AnomalyMetadata::default)
    }

    // Hooks. They are invoked by the traversal, not by `call`.

    /// Register a hook run before the node is called.
    pub fn add_pre_hook(&self, hook: impl PreHook<C> + 'static) {
        self.pre_hooks.write().push(Box::new(hook));
    }

    /// Register a hook run after the node is called.
    pub fn add_post_hook(&self, hook: impl PostHook<C> + 'static) {
        self.post_hooks.write().push(Box::new(hook));
    }

    /// Pre-hooks in registration order.
    pub fn pre_hooks(&self) -> MappedRwLockReadGuard<'_, [Box<dyn PreHook<C>>]> {
        RwLockReadGuard::map(self.pre_hooks.read(), Vec::as_slice)
    }

    /// Post-hooks in registration order.
    pub fn post_hooks(&self) -> MappedRwLockReadGuard<'_, [Box<dyn PostHook<C>>]> {
        RwLockReadGuard::map(self.post_hooks.read(), Vec::as_slice)
    }
}

impl<C: Config> fmt::Debug for Node<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("sequence_nr", &self.sequence_nr)
            .field("name", &self.name)
            .field("next_edges", &*self.next_edges.read())
            .field("input_metadata", &*self.input_metadata.read())
            .field("pre_hooks", &self.pre_hooks.read().len())
            .field("post_hooks", &self.post_hooks.read().len())
            .finish_non_exhaustive()
    }
}
