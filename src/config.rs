use crate::variable::Variable;

/// Configuration entry-point for instantiating the graph.
///
/// A concrete `Config` binds the value type flowing along edges and the error
/// type `Function::apply` may fail with. Every graph type (`Node`, `Edge`,
/// `EdgeCollector`, ...) is parameterized by it.
pub trait Config: Sized + 'static {
    /// The tensor-like value type produced and consumed by nodes.
    type Value: Variable<Self>;
    /// Error returned by a failing `Function::apply`.
    type Error: std::error::Error + Send + Sync + 'static;
}
