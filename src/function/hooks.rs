use crate::{config::Config, types::ValueList};

/// Callable run by the traversal right before a node is called.
///
/// Receives the node's inputs and returns the (possibly replaced) inputs.
pub trait PreHook<C: Config>: Send + Sync {
    /// Run the hook.
    fn call(&self, inputs: ValueList<C>) -> ValueList<C>;
}

/// Callable run by the traversal right after a node is called.
///
/// Receives the node's outputs and inputs and returns the (possibly replaced)
/// outputs.
pub trait PostHook<C: Config>: Send + Sync {
    /// Run the hook.
    fn call(&self, outputs: ValueList<C>, inputs: &[C::Value]) -> ValueList<C>;
}

impl<C, F> PreHook<C> for F
where
    C: Config,
    F: Fn(ValueList<C>) -> ValueList<C> + Send + Sync,
{
    fn call(&self, inputs: ValueList<C>) -> ValueList<C> {
        self(inputs)
    }
}

impl<C, F> PostHook<C> for F
where
    C: Config,
    F: Fn(ValueList<C>, &[C::Value]) -> ValueList<C> + Send + Sync,
{
    fn call(&self, outputs: ValueList<C>, inputs: &[C::Value]) -> ValueList<C> {
        self(outputs, inputs)
    }
}
