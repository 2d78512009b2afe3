//! Recursive field-split construction for nested block preconditioners.
//!
//! A split names the fields it covers and may nest child splits. Each
//! node's index set is the union of its fields' degree-of-freedom
//! ranges, restricted to the indices its parent actually owns and
//! excluding anything an earlier sibling already claimed. Siblings
//! therefore always come out disjoint, and a child never reaches
//! outside its parent.

use pail_core::ConfigurationError;

use crate::system::System;

/// A declarative split: which fields, and which child splits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitSpec {
    /// The split's name, for error reporting and solver options.
    pub name: String,
    /// Names of the fields this split covers.
    pub fields: Vec<String>,
    /// Nested child splits, in declaration order.
    pub children: Vec<SplitSpec>,
}

/// A resolved split: sorted global indices plus resolved children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexSetNode {
    name: String,
    indices: Vec<usize>,
    children: Vec<IndexSetNode>,
}

impl IndexSetNode {
    /// The split's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The sorted, deduplicated global indices this node owns.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Resolved child splits, in declaration order.
    pub fn children(&self) -> &[IndexSetNode] {
        &self.children
    }
}

/// Resolve a split against `system`, owning every degree of freedom.
///
/// # Errors
///
/// [`ConfigurationError::UnknownSplitField`] if any split in the tree
/// names a field absent from the system.
pub fn build_root_split(
    spec: &SplitSpec,
    system: &System,
) -> Result<IndexSetNode, ConfigurationError> {
    let all: Vec<usize> = (0..system.total_dofs()).collect();
    build_split(spec, system, &all, &[])
}

/// Resolve a split against `system` under explicit constraints.
///
/// `parent` is the sorted index set the enclosing split owns;
/// `siblings` is the sorted union of indices earlier siblings claimed.
/// The node keeps each of its fields' indices that lie in `parent` and
/// not in `siblings`. Children are resolved recursively against this
/// node's indices, accumulating their own sibling exclusions in
/// declaration order.
///
/// # Errors
///
/// [`ConfigurationError::UnknownSplitField`] if any split in the tree
/// names a field absent from the system.
pub fn build_split(
    spec: &SplitSpec,
    system: &System,
    parent: &[usize],
    siblings: &[usize],
) -> Result<IndexSetNode, ConfigurationError> {
    let mut indices = Vec::new();
    for field in &spec.fields {
        let range = system.field_range(field).ok_or_else(|| {
            log::error!(
                "field split '{}' references field '{field}' absent from system '{}'",
                spec.name,
                system.name()
            );
            ConfigurationError::UnknownSplitField {
                split: spec.name.clone(),
                field: field.clone(),
            }
        })?;
        for i in range {
            if parent.binary_search(&i).is_ok() && siblings.binary_search(&i).is_err() {
                indices.push(i);
            }
        }
    }
    indices.sort_unstable();
    indices.dedup();

    let mut children = Vec::new();
    let mut claimed: Vec<usize> = Vec::new();
    for child_spec in &spec.children {
        let child = build_split(child_spec, system, &indices, &claimed)?;
        claimed.extend_from_slice(child.indices());
        claimed.sort_unstable();
        children.push(child);
    }

    Ok(IndexSetNode {
        name: spec.name.clone(),
        indices,
        children,
    })
}
