//! This module contains all custom errors used in this library.

use std::error::Error;
use std::fmt;

/// Failures while reading a graph file, in either supported format.
#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    /// The content matches neither the edge-list nor the DIMACS grammar.
    Malformed,
    BadInt(std::num::ParseIntError),
}

impl From<std::io::Error> for ImportError {
    fn from(e: std::io::Error) -> ImportError {
        ImportError::Io(e)
    }
}

impl From<std::num::ParseIntError> for ImportError {
    fn from(e: std::num::ParseIntError) -> ImportError {
        ImportError::BadInt(e)
    }
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "import: {}", e),
            Self::Malformed => write!(f, "import: graph file is malformed"),
            Self::BadInt(_) => write!(f, "import: vertex id is not an integer"),
        }
    }
}

impl Error for ImportError {}

#[derive(Debug)]
pub enum ProcessingError {
    /// An option combination the solver does not support.
    InvalidConfig(String),
    /// A recovered solution that fails validation against the input graph.
    InvalidSolution(String),
    GraphError(String),
}

impl fmt::Display for ProcessingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            Self::InvalidSolution(msg) => write!(f, "invalid solution: {}", msg),
            Self::GraphError(msg) => write!(f, "graph error: {}", msg),
        }
    }
}

impl Error for ProcessingError {}
