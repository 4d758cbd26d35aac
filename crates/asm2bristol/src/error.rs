use std::fmt::Display;

use crate::{CanonicalError, ConnectivityError, ParseError, RelabelError};

/// Stage of the conversion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Before the wires are relabeled.
    BeforeRelabel,
    /// After the wires are relabeled.
    AfterRelabel,
    /// After the dead computation report.
    AfterReport,
}

impl Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::BeforeRelabel => f.write_str("before relabeling"),
            Phase::AfterRelabel => f.write_str("after relabeling"),
            Phase::AfterReport => f.write_str("after dead computation report"),
        }
    }
}

/// An error raised while converting a circuit.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The source could not be read or the circuit could not be written.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The source is not a valid gate listing.
    #[error("failed to parse circuit: {0}")]
    Parse(#[from] ParseError),
    /// The circuit is not a valid dataflow program.
    #[error("connectivity check failed {phase}: {source}")]
    Connectivity {
        /// Where in the pipeline the check failed.
        phase: Phase,
        /// The violation.
        source: ConnectivityError,
    },
    /// Relabeling failed.
    #[error("failed to relabel circuit: {0}")]
    Relabel(#[from] RelabelError),
    /// The relabeled circuit does not have the expected layout.
    #[error("relabeled circuit is not canonical: {0}")]
    Canonical(#[from] CanonicalError),
}

impl Error {
    pub(crate) fn connectivity(phase: Phase) -> impl FnOnce(ConnectivityError) -> Self {
        move |source| Self::Connectivity { phase, source }
    }
}
