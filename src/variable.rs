use crate::{config::Config, edge::Edge};
use derive_more::Display;

/// Element type of a tensor-like value.
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum DType {
    /// Boolean.
    Bool,
    /// Unsigned 8-bit integer.
    U8,
    /// Signed 8-bit integer.
    I8,
    /// Signed 16-bit integer.
    I16,
    /// Signed 32-bit integer.
    I32,
    /// Signed 64-bit integer.
    I64,
    /// IEEE half precision.
    F16,
    /// Brain floating point.
    BF16,
    /// IEEE single precision.
    F32,
    /// IEEE double precision.
    F64,
}

/// Device a value lives on.
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Device {
    /// Host memory.
    #[default]
    #[display("cpu")]
    Cpu,
    /// Accelerator with the given ordinal.
    #[display("accelerator:{_0}")]
    Accelerator(u32),
}

/// Shape, element type and device of a value, independent of its contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TensorMeta {
    /// Element type.
    pub dtype: DType,
    /// Size of each dimension.
    pub shape: Vec<i64>,
    /// Where the data lives.
    pub device: Device,
}

impl TensorMeta {
    /// Descriptor from its parts.
    pub fn new(dtype: DType, shape: impl Into<Vec<i64>>, device: Device) -> Self {
        Self {
            dtype,
            shape: shape.into(),
            device,
        }
    }
}

/// The tensor-like value type as seen by the graph.
///
/// The graph never looks at the data; it only needs to know whether a value is
/// present, whether it participates in gradient tracking, what it looks like,
/// and which edge produced it.
pub trait Variable<C: Config>: Send + Sync {
    /// `false` for placeholder values standing in for an absent tensor.
    fn is_defined(&self) -> bool;
    /// Whether gradients should flow back through this value.
    fn requires_grad(&self) -> bool;
    /// Descriptor of the value. Only called on defined values.
    fn meta(&self) -> TensorMeta;
    /// Edge to the node (and input slot) that will receive this value's
    /// gradient.
    fn gradient_edge(&self) -> Edge<C>;
    /// Rebind the value to a new producing edge.
    fn set_gradient_edge(&mut self, edge: Edge<C>);
}
