use crate::backend::spec::{DType, TensorSpec, ValueId};

/// Handle to a value emitted by a [`GraphBuilder`](super::GraphBuilder).
///
/// A node is only meaningful within the builder that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node {
    id: ValueId,
    spec: TensorSpec,
}

impl Node {
    pub(crate) fn new(id: ValueId, spec: TensorSpec) -> Self {
        Self { id, spec }
    }

    pub fn id(&self) -> ValueId {
        self.id
    }

    pub fn spec(&self) -> &TensorSpec {
        &self.spec
    }

    pub fn dtype(&self) -> DType {
        self.spec.dtype
    }

    pub fn dims(&self) -> &[usize] {
        self.spec.shape.dims()
    }

    pub fn rank(&self) -> usize {
        self.spec.shape.rank()
    }
}
