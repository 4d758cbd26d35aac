use std::collections::HashSet;

use crate::circuit::{Circuit, WireId};

/// An error raised when a circuit is not a valid single-pass dataflow program.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectivityError {
    /// A gate reads a wire before anything writes it.
    #[error("input wire {wire} of gate #{gate} has not been written")]
    UseBeforeDef {
        /// Index of the gate.
        gate: usize,
        /// The offending wire.
        wire: WireId,
    },
    /// An output refers to a wire which is never written.
    #[error("wire {wire} of output #{output} has not been written")]
    UndefinedOutput {
        /// Index of the output.
        output: usize,
        /// The offending wire.
        wire: WireId,
    },
}

/// An error raised when a circuit does not follow the Bristol Fashion wire
/// layout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[allow(missing_docs)]
pub enum CanonicalError {
    #[error("wire {index} of input #{input} is {wire}, expected {expected}")]
    InputLayout {
        input: usize,
        index: usize,
        wire: WireId,
        expected: WireId,
    },
    #[error("wire {index} of output #{output} is {wire}, expected {expected}")]
    OutputLayout {
        output: usize,
        index: usize,
        wire: WireId,
        expected: WireId,
    },
    #[error("gate #{gate} writes wire {wire} which already has a writer")]
    MultipleWriters { gate: usize, wire: WireId },
    #[error("wire {wire} is neither an input nor written by a gate")]
    Gap { wire: WireId },
}

impl Circuit {
    /// Checks that every wire is written before it is read.
    ///
    /// Every gate input must be an input wire or the output of an earlier
    /// gate, and every output wire must be written at some point. Returns the
    /// first violation found.
    pub fn check_connectivity(&self) -> Result<(), ConnectivityError> {
        let mut written: HashSet<WireId> = self.inputs.iter().flatten().copied().collect();

        for (gate, g) in self.gates.iter().enumerate() {
            if let Some(wire) = g.inputs().find(|x| !written.contains(x)) {
                return Err(ConnectivityError::UseBeforeDef { gate, wire });
            }
            written.insert(g.z());
        }

        for (output, ids) in self.outputs.iter().enumerate() {
            if let Some(wire) = ids.iter().find(|x| !written.contains(x)) {
                return Err(ConnectivityError::UndefinedOutput {
                    output,
                    wire: *wire,
                });
            }
        }

        Ok(())
    }

    /// Checks that the circuit follows the Bristol Fashion layout.
    ///
    /// Inputs must occupy `[0, n_in)` and outputs `[n_wires - n_out, n_wires)`,
    /// both in declared order. Every wire has exactly one writer and no id in
    /// `[0, n_wires)` is left unused.
    pub fn check_canonical(&self) -> Result<(), CanonicalError> {
        let wire_count = self.wire_count();
        let mut expected = 0;
        for (input, ids) in self.inputs.iter().enumerate() {
            for (index, &wire) in ids.iter().enumerate() {
                if wire != expected {
                    return Err(CanonicalError::InputLayout {
                        input,
                        index,
                        wire,
                        expected,
                    });
                }
                expected += 1;
            }
        }

        let mut expected = wire_count.saturating_sub(self.output_len());
        for (output, ids) in self.outputs.iter().enumerate() {
            for (index, &wire) in ids.iter().enumerate() {
                if wire != expected {
                    return Err(CanonicalError::OutputLayout {
                        output,
                        index,
                        wire,
                        expected,
                    });
                }
                expected += 1;
            }
        }

        let mut written: HashSet<WireId> = self.inputs.iter().flatten().copied().collect();
        for (gate, g) in self.gates.iter().enumerate() {
            let wire = g.z();
            if !written.insert(wire) {
                return Err(CanonicalError::MultipleWriters { gate, wire });
            }
        }

        // Fewer writers than ids means at least one id below `written.len()`
        // is missing.
        if written.len() < wire_count {
            let wire = (0..).find(|id| !written.contains(id)).unwrap_or_default();
            return Err(CanonicalError::Gap { wire });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Gate;

    #[test]
    fn test_connectivity_ok() {
        let circ = Circuit::new(
            vec![
                Gate::Xor { x: 0, y: 1, z: 2 },
                Gate::Not { x: 2, z: 3 },
            ],
            vec![vec![0, 1]],
            vec![vec![3]],
        );

        assert!(circ.check_connectivity().is_ok());
    }

    #[test]
    fn test_use_before_def() {
        let circ = Circuit::new(
            vec![
                Gate::Xor { x: 0, y: 3, z: 2 },
                Gate::Not { x: 2, z: 3 },
            ],
            vec![vec![0, 1]],
            vec![vec![3]],
        );

        assert_eq!(
            circ.check_connectivity(),
            Err(ConnectivityError::UseBeforeDef { gate: 0, wire: 3 })
        );
    }

    #[test]
    fn test_undefined_output() {
        let circ = Circuit::new(
            vec![Gate::Xor { x: 0, y: 1, z: 2 }],
            vec![vec![0, 1]],
            vec![vec![2], vec![7]],
        );

        assert_eq!(
            circ.check_connectivity(),
            Err(ConnectivityError::UndefinedOutput { output: 1, wire: 7 })
        );
    }

    #[test]
    fn test_canonical_ok() {
        let circ = Circuit::new(
            vec![
                Gate::And { x: 0, y: 1, z: 2 },
                Gate::Xor { x: 0, y: 2, z: 3 },
            ],
            vec![vec![0], vec![1]],
            vec![vec![3]],
        );

        assert_eq!(circ.check_canonical(), Ok(()));
    }

    #[test]
    fn test_canonical_output_not_last() {
        let circ = Circuit::new(
            vec![
                Gate::And { x: 0, y: 1, z: 3 },
                Gate::Xor { x: 0, y: 3, z: 2 },
            ],
            vec![vec![0, 1]],
            vec![vec![2]],
        );

        assert_eq!(
            circ.check_canonical(),
            Err(CanonicalError::OutputLayout {
                output: 0,
                index: 0,
                wire: 2,
                expected: 3,
            })
        );
    }

    #[test]
    fn test_canonical_multiple_writers() {
        let circ = Circuit::new(
            vec![
                Gate::And { x: 0, y: 1, z: 2 },
                Gate::Xor { x: 0, y: 2, z: 2 },
            ],
            vec![vec![0, 1]],
            vec![vec![2]],
        );

        assert_eq!(
            circ.check_canonical(),
            Err(CanonicalError::MultipleWriters { gate: 1, wire: 2 })
        );
    }

    #[test]
    fn test_canonical_gap() {
        let circ = Circuit::new(
            vec![Gate::And { x: 0, y: 1, z: 3 }],
            vec![vec![0, 1]],
            vec![vec![3]],
        );

        assert_eq!(circ.check_canonical(), Err(CanonicalError::Gap { wire: 2 }));
    }

    #[test]
    fn test_canonical_gap_below_huge_id() {
        let circ = Circuit::new(
            vec![Gate::Not {
                x: 0,
                z: usize::MAX - 1,
            }],
            vec![vec![0]],
            vec![vec![usize::MAX - 1]],
        );

        assert_eq!(circ.check_canonical(), Err(CanonicalError::Gap { wire: 1 }));
    }
}
