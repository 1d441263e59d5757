use crate::{
    config::Config,
    function::Node,
    grad_mode::GradMode,
    types::{EdgeList, InputNr},
    variable::Variable,
};
use core::{
    fmt,
    hash::{Hash, Hasher},
};
use std::sync::Arc;

/// Directed reference to input slot `input_nr` of `function`.
///
/// An edge without a function is *invalid*: it marks an output whose gradient
/// nobody consumes, as opposed to one flowing into slot 0 of some node.
pub struct Edge<C: Config> {
    function: Option<Arc<Node<C>>>,
    input_nr: InputNr,
}

impl<C: Config> Edge<C> {
    /// Edge into slot `input_nr` of `function`.
    pub fn new(function: Arc<Node<C>>, input_nr: InputNr) -> Self {
        Self {
            function: Some(function),
            input_nr,
        }
    }

    /// Convenience constructor for the invalid edge.
    pub fn invalid() -> Self {
        Self {
            function: None,
            input_nr: 0,
        }
    }

    /// `true` if the edge points at a node.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.function.is_some()
    }

    /// Target node, if any.
    #[inline]
    pub fn function(&self) -> Option<&Arc<Node<C>>> {
        self.function.as_ref()
    }

    /// Input slot of the target node.
    #[inline]
    pub fn input_nr(&self) -> InputNr {
        self.input_nr
    }

    pub(crate) fn into_function(self) -> Option<Arc<Node<C>>> {
        self.function
    }
}

impl<C: Config> Default for Edge<C> {
    fn default() -> Self {
        Self::invalid()
    }
}

impl<C: Config> Clone for Edge<C> {
    fn clone(&self) -> Self {
        Self {
            function: self.function.clone(),
            input_nr: self.input_nr,
        }
    }
}

impl<C: Config> PartialEq for Edge<C> {
    fn eq(&self, other: &Self) -> bool {
        let same_function = match (&self.function, &other.function) {
            (Some(lhs), Some(rhs)) => Arc::ptr_eq(lhs, rhs),
            (None, None) => true,
            _ => false,
        };
        same_function && self.input_nr == other.input_nr
    }
}

impl<C: Config> Eq for Edge<C> {}

impl<C: Config> Hash for Edge<C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.function.as_ref().map(Arc::as_ptr).hash(state);
        self.input_nr.hash(state);
    }
}

impl<C: Config> fmt::Debug for Edge<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Print the target by sequence number only; following the node would
        // walk the whole downstream graph.
        f.debug_struct("Edge")
            .field(
                "function",
                &self.function.as_ref().map(|function| function.sequence_nr()),
            )
            .field("input_nr", &self.input_nr)
            .finish()
    }
}

/// Builds the outgoing edge list of a new node from the values it consumed.
///
/// Each defined value contributes its gradient edge, each undefined one an
/// invalid placeholder, so edge `i` always corresponds to argument `i`. Single
/// values and lists can be mixed freely. When gradient recording is off the
/// collector stays empty.
#[must_use]
pub struct EdgeCollector<C: Config> {
    next_edges: EdgeList<C>,
    recording: bool,
}

impl<C: Config> Default for EdgeCollector<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Config> EdgeCollector<C> {
    /// Empty collector; samples `GradMode` now.
    pub fn new() -> Self {
        Self {
            next_edges: EdgeList::new(),
            recording: GradMode::is_enabled(),
        }
    }

    /// Append the edge of a single value.
    pub fn value(mut self, value: &C::Value) -> Self {
        if self.recording {
            self.push(value);
        }
        self
    }

    /// Append the edges of `values`, in order.
    pub fn values<'a>(mut self, values: impl IntoIterator<Item = &'a C::Value>) -> Self {
        if self.recording {
            for value in values {
                self.push(value);
            }
        }
        self
    }

    /// The collected edges.
    pub fn finish(self) -> EdgeList<C> {
        self.next_edges
    }

    fn push(&mut self, value: &C::Value) {
        if value.is_defined() {
            self.next_edges.push(value.gradient_edge());
        } else {
            self.next_edges.push(Edge::invalid());
        }
    }
}

/// Returns the gradient edges of `values`, positionally.
///
/// Empty when gradient recording is disabled, see [`EdgeCollector`].
pub fn collect_next_edges<'a, C: Config>(
    values: impl IntoIterator<Item = &'a C::Value>,
) -> EdgeList<C> {
    EdgeCollector::new().values(values).finish()
}

/// Connects `variable` to `function` as that node's next input.
///
/// Appends the value's descriptor to the node's input metadata and points the
/// value's gradient edge at the new slot. Use `Variable::set_gradient_edge`
/// directly when the node's input count must not change.
pub fn create_gradient_edge<C: Config>(variable: &mut C::Value, function: Arc<Node<C>>) {
    let input_nr = function.add_input_metadata_for(variable);
    variable.set_gradient_edge(Edge::new(function, input_nr));
}

/// `true` if any of `values` is defined and requires grad.
pub fn any_variable_requires_grad<'a, C: Config>(
    values: impl IntoIterator<Item = &'a C::Value>,
) -> bool {
    values
        .into_iter()
        .any(|value| value.is_defined() && value.requires_grad())
}
