//! Recoverable problems found while decoding a chunk.
//!
//! Old worlds collect identifiers that no longer resolve. Those never abort
//! a load: the affected block or record is skipped and a [`Recovered`] value
//! is handed to the loader's [`DiagnosticSink`].

use std::fmt;

use cinder_benchmark::BenchmarkMetrics;
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileEntityProblem {
    MissingId,
    MissingCoordinate(&'static str),
    OutOfBounds { x: i32, y: i32, z: i32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recovered {
    /// A block state name the block registry does not know; the block was
    /// left as air.
    UnknownBlock {
        x: usize,
        y: usize,
        z: usize,
        name: String,
    },
    /// A tile entity record that could not be placed.
    InvalidTileEntity {
        id: Option<String>,
        problem: TileEntityProblem,
    },
    /// A tile entity whose id has no registered handler.
    UnknownHandler {
        id: String,
        x: usize,
        y: usize,
        z: usize,
    },
}

impl fmt::Display for Recovered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recovered::UnknownBlock { x, y, z, name } => {
                write!(f, "unknown block {name} at ({x}, {y}, {z}) left as air")
            }
            Recovered::InvalidTileEntity { id, problem } => {
                let id = id.as_deref().unwrap_or("<no id>");
                match problem {
                    TileEntityProblem::MissingId => write!(f, "tile entity dropped: invalid namespace"),
                    TileEntityProblem::MissingCoordinate(axis) => {
                        write!(f, "tile entity {id} dropped: missing {axis} coordinate")
                    }
                    TileEntityProblem::OutOfBounds { x, y, z } => {
                        write!(f, "tile entity {id} dropped: ({x}, {y}, {z}) is outside the chunk")
                    }
                }
            }
            Recovered::UnknownHandler { id, x, y, z } => {
                write!(f, "block {id} at ({x}, {y}, {z}) has no handler, loading it without one")
            }
        }
    }
}

/// Receives recoverable problems, tagged with the chunk they came from.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, chunk_x: i32, chunk_z: i32, issue: Recovered);
}

/// Logs every problem as a warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&self, chunk_x: i32, chunk_z: i32, issue: Recovered) {
        log::warn!("Chunk ({chunk_x}, {chunk_z}): {issue}");
    }
}

/// Keeps every problem in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    issues: Mutex<Vec<(i32, i32, Recovered)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issues(&self) -> Vec<(i32, i32, Recovered)> {
        self.issues.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.issues.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.lock().is_empty()
    }
}

impl DiagnosticSink for MemorySink {
    fn report(&self, chunk_x: i32, chunk_z: i32, issue: Recovered) {
        self.issues.lock().push((chunk_x, chunk_z, issue));
    }
}

/// Sink bound to one chunk that also counts what it forwards.
pub(crate) struct Reporter<'a> {
    pub sink: &'a dyn DiagnosticSink,
    pub metrics: &'a BenchmarkMetrics,
    pub chunk_x: i32,
    pub chunk_z: i32,
}

impl Reporter<'_> {
    pub fn report(&self, issue: Recovered) {
        self.metrics.record_diagnostic();
        self.sink.report(self.chunk_x, self.chunk_z, issue);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_coordinate() {
        let issue = Recovered::UnknownBlock {
            x: 1,
            y: 2,
            z: 3,
            name: "oldmod:gizmo".to_string(),
        };
        assert_eq!(issue.to_string(), "unknown block oldmod:gizmo at (1, 2, 3) left as air");

        let issue = Recovered::InvalidTileEntity {
            id: Some("minecraft:chest".to_string()),
            problem: TileEntityProblem::MissingCoordinate("y"),
        };
        assert_eq!(issue.to_string(), "tile entity minecraft:chest dropped: missing y coordinate");
    }

    #[test]
    fn test_reporter_counts() {
        let sink = MemorySink::new();
        let metrics = BenchmarkMetrics::default();
        let reporter = Reporter {
            sink: &sink,
            metrics: &metrics,
            chunk_x: 4,
            chunk_z: -9,
        };
        reporter.report(Recovered::InvalidTileEntity {
            id: None,
            problem: TileEntityProblem::MissingId,
        });
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.issues()[0].1, -9);
        assert_eq!(metrics.total_diagnostics.load(std::sync::atomic::Ordering::Relaxed), 1);
    }
}
