#![allow(dead_code)]

use fngraph::{
    Config, DType, Device, Edge, Function, TensorMeta, Variable,
    types::ValueList,
};
use parking_lot::Mutex;
use std::{borrow::Cow, sync::Arc};
use thiserror::Error;

#[derive(Debug, Clone, Copy)]
pub struct TestConfig;

impl Config for TestConfig {
    type Value = TestValue;
    type Error = TestError;
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("test op failed: {0}")]
pub struct TestError(pub &'static str);

#[derive(Debug, Clone)]
pub struct TestValue {
    pub data: f64,
    pub defined: bool,
    pub requires_grad: bool,
    pub meta: TensorMeta,
    pub edge: Edge<TestConfig>,
}

impl TestValue {
    pub fn new(data: f64, shape: &[i64]) -> Self {
        Self {
            data,
            defined: true,
            requires_grad: true,
            meta: TensorMeta::new(DType::F32, shape, Device::Cpu),
            edge: Edge::default(),
        }
    }

    pub fn undefined() -> Self {
        Self {
            defined: false,
            requires_grad: false,
            ..Self::new(0.0, &[])
        }
    }
}

impl Variable<TestConfig> for TestValue {
    fn is_defined(&self) -> bool {
        self.defined
    }

    fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    fn meta(&self) -> TensorMeta {
        self.meta.clone()
    }

    fn gradient_edge(&self) -> Edge<TestConfig> {
        self.edge.clone()
    }

    fn set_gradient_edge(&mut self, edge: Edge<TestConfig>) {
        self.edge = edge;
    }
}

/// Passes its inputs through unchanged.
#[derive(Debug, Default)]
pub struct Identity;

impl Function<TestConfig> for Identity {
    fn apply(&mut self, inputs: ValueList<TestConfig>) -> Result<ValueList<TestConfig>, TestError> {
        Ok(inputs)
    }
}

/// Named operation doubling every input.
#[derive(Debug)]
pub struct Scale(pub &'static str);

impl Function<TestConfig> for Scale {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed(self.0)
    }

    fn apply(&mut self, inputs: ValueList<TestConfig>) -> Result<ValueList<TestConfig>, TestError> {
        Ok(inputs
            .into_iter()
            .map(|mut value| {
                value.data *= 2.0;
                value
            })
            .collect())
    }
}

/// Always fails, or panics when asked to.
#[derive(Debug)]
pub struct Broken {
    pub panic: bool,
}

impl Function<TestConfig> for Broken {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("Broken")
    }

    fn apply(&mut self, _inputs: ValueList<TestConfig>) -> Result<ValueList<TestConfig>, TestError> {
        if self.panic {
            panic!("Broken::apply");
        }
        Err(TestError("broken"))
    }
}

/// Overrides every optional method and logs each call it receives.
///
/// `apply` saves the data of its inputs; `release_variables` drops it.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    pub log: Arc<Mutex<Vec<&'static str>>>,
    pub saved: Vec<f64>,
}

impl Recorder {
    pub fn calls(&self) -> Vec<&'static str> {
        self.log.lock().clone()
    }

    fn push(&self, call: &'static str) {
        self.log.lock().push(call);
    }
}

impl Function<TestConfig> for Recorder {
    fn name(&self) -> Cow<'static, str> {
        self.push("name");
        Cow::Borrowed("Recorder")
    }

    fn apply(&mut self, inputs: ValueList<TestConfig>) -> Result<ValueList<TestConfig>, TestError> {
        self.push("apply");
        self.saved = inputs.iter().map(|value| value.data).collect();
        Ok(inputs)
    }

    fn release_variables(&mut self) {
        self.push("release_variables");
        self.saved.clear();
    }

    fn will_release_variables(&mut self) {
        self.push("will_release_variables");
    }

    fn is_traceable(&self) -> bool {
        self.push("is_traceable");
        false
    }

    fn passes_state_transparently(&self) -> bool {
        self.push("passes_state_transparently");
        true
    }

    fn saved_variables(&self) -> Option<ValueList<TestConfig>> {
        self.push("saved_variables");
        if self.saved.is_empty() {
            return None;
        }
        Some(
            self.saved
                .iter()
                .map(|&data| TestValue::new(data, &[]))
                .collect(),
        )
    }
}
