//! Diagnostic output seams and detector positions.
//!
//! The engine decides *when* to dump; these traits own *what* gets
//! written and where. File formats live behind the traits so tests can
//! substitute counting doubles.

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::bucket::Bucket;
use crate::system::System;

/// Shared handle to a [`DiagnosticsFile`].
pub type DiagnosticsFileRef = Rc<RefCell<dyn DiagnosticsFile>>;

/// Shared handle to a [`VisualizationWriter`].
pub type VisualizationWriterRef = Rc<RefCell<dyn VisualizationWriter>>;

/// A bucket-wide diagnostic file (statistics, steady-state, detectors).
///
/// The header is written exactly once before the initial output; data
/// rows follow on the stream's dump cadence. [`close`] is called from
/// the bucket's `Drop`, so an implementation must tolerate being
/// closed without ever having written.
///
/// [`close`]: DiagnosticsFile::close
pub trait DiagnosticsFile {
    /// Write the column header describing this file's layout.
    fn write_header(&mut self, bucket: &Bucket) -> io::Result<()>;

    /// Append one data row for the bucket's current state.
    fn write_data(&mut self, bucket: &Bucket) -> io::Result<()>;

    /// Flush and close the underlying stream.
    fn close(&mut self) -> io::Result<()>;
}

/// Per-system visualization output.
pub trait VisualizationWriter {
    /// Write the system's current solved state.
    fn write(&mut self, system: &System) -> io::Result<()>;
}

/// A named set of sample positions for the detectors file.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorSet {
    name: String,
    positions: Vec<SmallVec<[f64; 3]>>,
}

impl DetectorSet {
    /// Create a detector set from its sample positions.
    pub fn new(name: &str, positions: Vec<SmallVec<[f64; 3]>>) -> Self {
        Self {
            name: name.to_string(),
            positions,
        }
    }

    /// The set's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The sample positions, in declaration order.
    pub fn positions(&self) -> &[SmallVec<[f64; 3]>] {
        &self.positions
    }

    /// Number of sample positions.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the set has no positions.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
