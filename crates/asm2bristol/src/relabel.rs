use std::{
    collections::{HashMap, HashSet},
    ops::Range,
};

use tracing::{debug, instrument, trace};

use crate::circuit::{gate_wires, rename_backward, rename_forward, Circuit, Gate, WireId};

/// An error raised while relabeling a circuit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelabelError {
    /// There are not enough free wire ids to move colliding wires out of the
    /// output range.
    #[error("relabeling exhausted: {needed} wires collide with the output range but only {available} ids are free")]
    RelabelingExhausted {
        /// Number of wires which had to be moved.
        needed: usize,
        /// Number of free ids below the output range.
        available: usize,
    },
    /// A wire is listed more than once across the outputs.
    #[error("wire {wire} of output #{output} is already part of another output")]
    DuplicateOutput {
        /// Index of the output.
        output: usize,
        /// The offending wire.
        wire: WireId,
    },
    /// An output forwards an input wire without any gate in between.
    #[error("wire {wire} of output #{output} is an input passed through unchanged")]
    PassThroughOutput {
        /// Index of the output.
        output: usize,
        /// The offending wire.
        wire: WireId,
    },
    /// An output refers to a wire which no gate writes.
    #[error("wire {wire} of output #{output} is never written")]
    UnwrittenOutput {
        /// Index of the output.
        output: usize,
        /// The offending wire.
        wire: WireId,
    },
    /// A wire id is too large to make room for the inputs below it.
    #[error("wire {wire} can not be shifted above {offset} input wires")]
    WireIdOverflow {
        /// The offending wire.
        wire: WireId,
        /// Number of input wires.
        offset: usize,
    },
    /// A gate reads a wire which has no canonical id yet.
    #[error("input wire {wire} of gate #{gate} has no canonical id")]
    UnmappedWire {
        /// Index of the gate.
        gate: usize,
        /// The offending wire.
        wire: WireId,
    },
}

impl Circuit {
    /// Relabels the wires of the circuit into the Bristol Fashion layout.
    ///
    /// After relabeling, the input wires occupy `[0, n_in)` and the output
    /// wires occupy `[n_wires - n_out, n_wires)`, both in declared order. All
    /// other wires are numbered in between, in the order they are first
    /// produced. Every wire is written exactly once.
    ///
    /// Wire ids of the source circuit may be reused, a write to an id starts a
    /// new value which is given its own canonical id.
    ///
    /// The circuit must pass [`Circuit::check_connectivity`]. It is left
    /// untouched if an error is returned.
    #[instrument(level = "debug", skip_all, err)]
    pub fn relabel(&mut self) -> Result<(), RelabelError> {
        self.check_outputs()?;

        let mut circ = self.clone();
        let n_in = circ.input_len();

        circ.shift(n_in)?;
        let pinned = circ.pin_inputs(n_in);
        let n_total = circ.compact(n_in, &pinned)?;
        circ.place_outputs(n_in, n_total)?;

        *self = circ;

        Ok(())
    }

    /// Validates the outputs before anything is renamed.
    fn check_outputs(&self) -> Result<(), RelabelError> {
        let written: HashSet<WireId> = self.gates.iter().map(Gate::z).collect();
        let inputs: HashSet<WireId> = self.inputs.iter().flatten().copied().collect();

        let mut seen = HashSet::new();
        for (output, ids) in self.outputs.iter().enumerate() {
            for &wire in ids {
                if !seen.insert(wire) {
                    return Err(RelabelError::DuplicateOutput { output, wire });
                }
                if !written.contains(&wire) {
                    return Err(if inputs.contains(&wire) {
                        RelabelError::PassThroughOutput { output, wire }
                    } else {
                        RelabelError::UnwrittenOutput { output, wire }
                    });
                }
            }
        }

        Ok(())
    }

    /// Moves every wire id up by `offset`, clearing `[0, offset)` for the
    /// inputs.
    fn shift(&mut self, offset: usize) -> Result<(), RelabelError> {
        let shifted = |wire: WireId| {
            wire.checked_add(offset)
                .ok_or(RelabelError::WireIdOverflow { wire, offset })
        };

        for gate in self.gates.iter_mut() {
            for id in gate.inputs_mut() {
                *id = shifted(*id)?;
            }
            let z = gate.z_mut();
            *z = shifted(*z)?;
        }
        for id in self
            .inputs
            .iter_mut()
            .chain(self.outputs.iter_mut())
            .flatten()
        {
            *id = shifted(*id)?;
        }

        Ok(())
    }

    /// Gives every input wire its final id, in declared order.
    ///
    /// Only the reads up to the first redefinition of an input id are
    /// renamed. Returns the shifted ids which denoted an input.
    fn pin_inputs(&mut self, n_in: usize) -> HashSet<WireId> {
        let mut pinned = HashSet::with_capacity(n_in);
        for (next, id) in self.inputs.iter_mut().flatten().enumerate() {
            let count = rename_forward(&mut self.gates, *id, next);
            trace!("renamed input wire {} {} times", *id - n_in, count);
            pinned.insert(*id);
            *id = next;
        }
        pinned
    }

    /// Numbers the gate outputs in program order, starting at `n_in`.
    ///
    /// `current` maps a source id to the canonical id of the value it holds at
    /// this point of the program, a write overwrites the entry. Outputs take
    /// the canonical id of the last value of their source id.
    ///
    /// Returns the number of wires in the compacted circuit.
    fn compact(&mut self, n_in: usize, pinned: &HashSet<WireId>) -> Result<usize, RelabelError> {
        let mut current: HashMap<WireId, WireId> = (0..n_in).map(|id| (id, id)).collect();
        let mut next_free = n_in;

        for (idx, gate) in self.gates.iter_mut().enumerate() {
            for x in gate.inputs_mut() {
                let wire = *x;
                *x = *current
                    .get(&wire)
                    .ok_or_else(|| RelabelError::UnmappedWire {
                        gate: idx,
                        wire: wire - n_in,
                    })?;
            }

            let z = gate.z_mut();
            current.insert(*z, next_free);
            *z = next_free;
            next_free += 1;
        }

        for (output, ids) in self.outputs.iter_mut().enumerate() {
            for id in ids.iter_mut() {
                let wire = *id;
                *id = match current.get(&wire) {
                    Some(canonical) => *canonical,
                    None if pinned.contains(&wire) => {
                        return Err(RelabelError::PassThroughOutput {
                            output,
                            wire: wire - n_in,
                        })
                    }
                    None => {
                        return Err(RelabelError::UnwrittenOutput {
                            output,
                            wire: wire - n_in,
                        })
                    }
                };
            }
        }

        debug!("compacted {} gates into {} wires", self.gates.len(), next_free);

        Ok(next_free)
    }

    /// Moves the outputs into the top `n_out` ids of `[0, n_total)`.
    fn place_outputs(&mut self, n_in: usize, n_total: usize) -> Result<(), RelabelError> {
        let n_out = self.output_len();
        if n_out == 0 {
            return Ok(());
        }

        // Park the outputs past the end, freeing their compacted ids.
        for (id, parked) in self.outputs.iter_mut().flatten().zip(n_total..) {
            rename_backward(&mut self.gates, *id, parked);
            *id = parked;
        }

        let boundary = n_total
            .checked_sub(n_out)
            .filter(|boundary| *boundary >= n_in)
            .ok_or(RelabelError::RelabelingExhausted {
                needed: n_out,
                available: n_total.saturating_sub(n_in),
            })?;

        let used = gate_wires(&self.gates);
        let free: Vec<WireId> = (n_in..boundary).filter(|id| !used.contains(id)).collect();
        let moved = recycle(&mut self.gates, &used, boundary..n_total, free)?;
        debug!("moved {} wires out of the output range", moved);

        for (id, target) in self.outputs.iter_mut().flatten().zip(boundary..) {
            let count = rename_backward(&mut self.gates, *id, target);
            trace!("placed output wire {} in {} gates", target, count);
            *id = target;
        }

        Ok(())
    }
}

/// Moves every wire in `range` which is still in use into one of the `free`
/// ids, in ascending order.
///
/// Returns the number of wires moved.
pub(crate) fn recycle(
    gates: &mut [Gate],
    used: &HashSet<WireId>,
    range: Range<WireId>,
    free: Vec<WireId>,
) -> Result<usize, RelabelError> {
    let occupied: Vec<WireId> = range.filter(|id| used.contains(id)).collect();
    if occupied.len() > free.len() {
        return Err(RelabelError::RelabelingExhausted {
            needed: occupied.len(),
            available: free.len(),
        });
    }

    for (id, slot) in occupied.iter().zip(free) {
        rename_backward(gates, *id, slot);
    }

    Ok(occupied.len())
}
