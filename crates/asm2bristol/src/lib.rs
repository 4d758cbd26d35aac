//! # asm2bristol
//!
//! This crate turns the Boolean circuit assembly emitted by a
//! secure-computation compiler into a circuit in
//! [Bristol Fashion](https://nigelsmart.github.io/MPC-Circuits/) format.
//!
//! The assembly numbers its wires freely and reuses ids once a value is no
//! longer needed. Bristol Fashion requires the inputs to occupy the lowest
//! ids, the outputs to occupy the highest ids and every wire to be written
//! exactly once. The conversion runs these phases:
//!
//! 1. [`Circuit::parse_asm`] reads the gates and the input and output regions.
//! 2. [`Circuit::check_connectivity`] verifies every wire is written before it
//!    is read.
//! 3. [`Circuit::relabel`] renumbers the wires into the canonical layout.
//! 4. [`Circuit::dead_wires`] reports computation which is never used.
//! 5. [`Circuit::to_bristol`] renders the circuit.
//!
//! The connectivity check is repeated after every phase.

#![deny(missing_docs, unreachable_pub, unused_must_use)]
#![deny(clippy::all)]
#![forbid(unsafe_code)]

pub mod bristol;
mod check;
pub mod circuit;
pub mod cli;
pub mod config;
mod error;
pub mod logging;
pub mod parse;
mod relabel;
mod report;

pub use bristol::BristolError;
pub use check::{CanonicalError, ConnectivityError};
pub use circuit::{Circuit, Gate, GateType, RegionKind, WireGroup, WireId};
pub use config::{Config, LogFormat, LoggingConfig};
pub use error::{Error, Phase};
pub use parse::ParseError;
pub use relabel::RelabelError;
pub use report::{DeadReport, DeadWire, Producer};

use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

/// The result of a conversion.
#[derive(Debug, Clone)]
pub struct Conversion {
    /// The relabeled circuit.
    pub circuit: Circuit,
    /// Computation which does not contribute to any output.
    pub report: DeadReport,
    /// The circuit in Bristol Fashion format.
    pub bristol: String,
}

/// Converts a gate listing into a Bristol Fashion circuit.
///
/// Nothing is returned but the error if any phase fails.
#[instrument(level = "debug", skip_all, err)]
pub fn convert(asm: &str, config: &Config) -> Result<Conversion, Error> {
    let circuit = Circuit::parse_asm(asm, &config.inputs, &config.outputs)?;
    finish(circuit, config)
}

/// Converts the gate listing at `path` and writes the circuit next to it.
///
/// The circuit is written to [`Config::output_path_for`] once every phase has
/// succeeded, nothing is written otherwise. Returns the path written to.
#[instrument(level = "debug", skip_all, err)]
pub fn convert_file(path: impl AsRef<Path>, config: &Config) -> Result<PathBuf, Error> {
    let path = path.as_ref();
    let circuit = Circuit::parse_asm_file(path, &config.inputs, &config.outputs)?;
    let conversion = finish(circuit, config)?;

    let out = config.output_path_for(path);
    std::fs::write(&out, conversion.bristol)?;
    info!("wrote circuit to {}", out.display());

    Ok(out)
}

fn finish(mut circuit: Circuit, config: &Config) -> Result<Conversion, Error> {
    log_stats("parsed", &circuit);

    canonicalize(&mut circuit)?;
    log_stats("relabeled", &circuit);
    let report = report(&circuit)?;
    circuit.check_canonical()?;

    let bristol = circuit.to_bristol(config.not_is_inv);

    Ok(Conversion {
        circuit,
        report,
        bristol,
    })
}

/// Relabels a circuit, verifying its connectivity before and after.
pub fn canonicalize(circuit: &mut Circuit) -> Result<(), Error> {
    circuit
        .check_connectivity()
        .map_err(Error::connectivity(Phase::BeforeRelabel))?;
    circuit.relabel()?;
    circuit
        .check_connectivity()
        .map_err(Error::connectivity(Phase::AfterRelabel))?;
    Ok(())
}

fn log_stats(phase: &str, circuit: &Circuit) {
    info!(
        "{} circuit: {} gates ({} AND, {} XOR, {} NOT), {} wires",
        phase,
        circuit.gates().len(),
        circuit.and_count(),
        circuit.xor_count(),
        circuit.not_count(),
        circuit.wire_count()
    );
}

fn report(circuit: &Circuit) -> Result<DeadReport, Error> {
    let report = circuit.dead_wires();
    info!("found {} unused wire slots", report.unused_slots());
    info!("found {} unused gates", report.dead_gates().count());
    for dead in report.dead() {
        match dead.producer {
            Producer::Gate(idx) => warn!(
                "#{} {} unused output wire {}",
                idx,
                circuit.gates()[idx],
                dead.wire
            ),
            Producer::Input { input, index } => {
                warn!("bit {} of input #{} (wire {}) is never read", index, input, dead.wire)
            }
        }
    }

    circuit
        .check_connectivity()
        .map_err(Error::connectivity(Phase::AfterReport))?;

    Ok(report)
}
