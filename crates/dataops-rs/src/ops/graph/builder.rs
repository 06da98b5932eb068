//! Mutable builder that stages primitive instructions for one entry function.

use std::collections::HashMap;

use crate::backend::spec::{
    Function, Instruction, Operand, Operation, Program, TensorSpec, ValueId,
};
use crate::ops::data::LoweringOptions;
use crate::ops::error::{LoweringError, LoweringResult};

use super::node::Node;

/// Context passed to every lowering function for declaring inputs and emitting nodes.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    options: LoweringOptions,
    next_value: u32,
    parameters: Vec<(ValueId, TensorSpec)>,
    instructions: Vec<Instruction>,
    specs: HashMap<ValueId, TensorSpec>,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    /// Creates a builder whose options come from the process environment.
    pub fn new() -> Self {
        Self::with_options(LoweringOptions::from_env())
    }

    pub fn with_options(options: LoweringOptions) -> Self {
        Self {
            options,
            next_value: 0,
            parameters: Vec::new(),
            instructions: Vec::new(),
            specs: HashMap::new(),
        }
    }

    pub fn options(&self) -> &LoweringOptions {
        &self.options
    }

    /// Declares an entry parameter and returns its handle.
    pub fn parameter(&mut self, spec: TensorSpec) -> Node {
        let value = self.allocate_value();
        self.parameters.push((value, spec.clone()));
        self.specs.insert(value, spec.clone());
        Node::new(value, spec)
    }

    /// Emits a new operation node and returns its output value identifier.
    ///
    /// No validation happens here; the checked primitives in [`crate::ops::ptir`] wrap this.
    pub fn emit(&mut self, op: Operation, operands: Vec<Operand>, spec: TensorSpec) -> ValueId {
        let value = self.allocate_value();
        self.specs.insert(value, spec.clone());
        self.instructions.push(Instruction {
            id: value,
            op,
            operands,
            output: spec,
        });
        value
    }

    /// Fails unless `node` was issued by this builder with the same spec.
    pub(crate) fn ensure_known(&self, node: &Node) -> LoweringResult<()> {
        match self.specs.get(&node.id()) {
            Some(spec) if spec == node.spec() => Ok(()),
            _ => Err(LoweringError::UnknownValue(node.id())),
        }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Seals the staged instructions into a single-function program named `name`.
    pub fn finish(self, name: &str, results: &[Node]) -> LoweringResult<Program> {
        let mut result_ids = Vec::with_capacity(results.len());
        let mut result_specs = Vec::with_capacity(results.len());
        for node in results {
            self.ensure_known(node)?;
            result_ids.push(node.id());
            result_specs.push(node.spec().clone());
        }

        let (parameter_ids, parameters): (Vec<_>, Vec<_>) = self.parameters.into_iter().unzip();
        let function = Function {
            name: name.to_string(),
            parameters,
            parameter_ids,
            results: result_specs,
            body: self.instructions,
            result_ids,
        };
        Ok(Program::new(name).with_functions(vec![function]))
    }

    fn allocate_value(&mut self) -> ValueId {
        let value = ValueId(self.next_value);
        self.next_value += 1;
        value
    }
}
