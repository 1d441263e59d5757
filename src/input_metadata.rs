use crate::variable::{DType, Device, TensorMeta};

/// Descriptor of one input slot of a node.
///
/// Either the shape/type/device the incoming value is expected to have, or
/// the *undefined* sentinel for an input that is expected but never used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct InputMetadata(Option<TensorMeta>);

impl InputMetadata {
    /// Descriptor of a defined input.
    pub fn new(meta: TensorMeta) -> Self {
        Self(Some(meta))
    }

    /// The undefined sentinel.
    pub fn undefined() -> Self {
        Self(None)
    }

    /// `false` for the undefined sentinel.
    #[inline]
    pub fn is_defined(&self) -> bool {
        self.0.is_some()
    }

    /// The descriptor, unless undefined.
    #[inline]
    pub fn meta(&self) -> Option<&TensorMeta> {
        self.0.as_ref()
    }

    /// Element type, unless undefined.
    pub fn dtype(&self) -> Option<DType> {
        self.0.as_ref().map(|meta| meta.dtype)
    }

    /// Shape, unless undefined.
    pub fn shape(&self) -> Option<&[i64]> {
        self.0.as_ref().map(|meta| meta.shape.as_slice())
    }

    /// Device, unless undefined.
    pub fn device(&self) -> Option<Device> {
        self.0.as_ref().map(|meta| meta.device)
    }
}

impl From<TensorMeta> for InputMetadata {
    fn from(meta: TensorMeta) -> Self {
        Self::new(meta)
    }
}
