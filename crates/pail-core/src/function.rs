//! Discretized function values and their shared handles.
//!
//! A [`Function`] is the value side of a symbol: a named block of
//! degrees of freedom. Ownership is shared between the bucket-level
//! symbol registry and the system that created the function, so
//! handles are `Rc<RefCell<_>>` ([`FunctionRef`]); the value lives as
//! long as its longest holder.

use std::cell::RefCell;
use std::rc::Rc;

use crate::linalg::Vector;

/// Shared, interior-mutable handle to a [`Function`].
pub type FunctionRef = Rc<RefCell<Function>>;

/// A named function over a discretization: a name plus its degree-of-
/// freedom vector.
#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    name: String,
    vector: Vector,
}

impl Function {
    /// Create a function with zeroed storage of the given length.
    pub fn new(name: &str, len: usize) -> Self {
        Self {
            name: name.to_string(),
            vector: Vector::zeros(len),
        }
    }

    /// Create a function adopting existing values.
    pub fn from_vector(name: &str, vector: Vector) -> Self {
        Self {
            name: name.to_string(),
            vector,
        }
    }

    /// Create a single-entry function holding one constant value.
    pub fn constant(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            vector: Vector::from_values(vec![value]),
        }
    }

    /// The function's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read-only view of the underlying storage.
    pub fn vector(&self) -> &Vector {
        &self.vector
    }

    /// Mutable view of the underlying storage.
    pub fn vector_mut(&mut self) -> &mut Vector {
        &mut self.vector
    }

    /// Overwrite the underlying storage with `values`.
    ///
    /// This is the direct-aliasing path the solver callbacks use: the
    /// solver owns the iterate vector for the duration of a callback,
    /// so no compare-before-copy is done.
    pub fn assign(&mut self, values: &Vector) {
        self.vector.assign(values);
    }

    /// Wrap this function in a shared handle.
    pub fn into_shared(self) -> FunctionRef {
        Rc::new(RefCell::new(self))
    }
}
