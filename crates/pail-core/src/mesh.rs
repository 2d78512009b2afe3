//! Opaque handles for entities owned by the external FEM library.
//!
//! The harness never looks inside a mesh or a function space; it only
//! registers them by name and hands shared references back out. The
//! minimal descriptors here stand in for the library's own objects.

use std::rc::Rc;

/// Shared handle to a [`Mesh`].
pub type MeshRef = Rc<Mesh>;

/// Shared handle to a [`FunctionSpace`].
pub type FunctionSpaceRef = Rc<FunctionSpace>;

/// A mesh descriptor: name and cell count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mesh {
    name: String,
    cells: usize,
}

impl Mesh {
    /// Create a mesh descriptor.
    pub fn new(name: &str, cells: usize) -> Self {
        Self {
            name: name.to_string(),
            cells,
        }
    }

    /// The mesh name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of cells.
    pub fn cells(&self) -> usize {
        self.cells
    }

    /// Wrap in a shared handle.
    pub fn into_shared(self) -> MeshRef {
        Rc::new(self)
    }
}

/// A function space descriptor, held so coefficients declared before
/// their functions exist can be interpolated later.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionSpace {
    dim: usize,
}

impl FunctionSpace {
    /// Create a function space of the given dimension.
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    /// Dimension (number of degrees of freedom).
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Wrap in a shared handle.
    pub fn into_shared(self) -> FunctionSpaceRef {
        Rc::new(self)
    }
}
