use std::collections::{hash_map::Entry, HashMap, HashSet};

use crate::circuit::{Circuit, WireId};

/// Where a value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Producer {
    /// The value is a circuit input.
    Input {
        /// Index of the input.
        input: usize,
        /// Position of the wire within the input.
        index: usize,
    },
    /// The value is the output of the gate with this index.
    Gate(usize),
}

/// A value which is written but never read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadWire {
    /// The wire holding the value.
    pub wire: WireId,
    /// What wrote the value.
    pub producer: Producer,
}

/// Diagnostics about computation which does not contribute to any output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeadReport {
    dead: Vec<DeadWire>,
    unused_slots: usize,
}

impl DeadReport {
    /// Returns the dead values, inputs first and then gates in program order.
    pub fn dead(&self) -> &[DeadWire] {
        &self.dead
    }

    /// Returns the indices of the gates whose output is never read.
    pub fn dead_gates(&self) -> impl Iterator<Item = usize> + '_ {
        self.dead.iter().filter_map(|dead| match dead.producer {
            Producer::Gate(gate) => Some(gate),
            Producer::Input { .. } => None,
        })
    }

    /// Returns the number of wire ids below the highest id which nothing
    /// refers to.
    pub fn unused_slots(&self) -> usize {
        self.unused_slots
    }

    /// Returns `true` if every value is read.
    pub fn is_empty(&self) -> bool {
        self.dead.is_empty()
    }
}

impl Circuit {
    /// Finds the values which are written but never read by a later gate or
    /// an output.
    ///
    /// The analysis follows values rather than ids, so it also applies to
    /// circuits which reuse wire ids: a value whose id is overwritten before
    /// any read is reported. The circuit is not modified.
    pub fn dead_wires(&self) -> DeadReport {
        // Wire id -> (producer of its current value, whether it was read).
        let mut live: HashMap<WireId, (Producer, bool)> = HashMap::new();
        let mut dead = Vec::new();

        let mut write = |live: &mut HashMap<WireId, (Producer, bool)>, wire, producer| {
            if let Some((prev, false)) = live.insert(wire, (producer, false)) {
                dead.push(DeadWire {
                    wire,
                    producer: prev,
                });
            }
        };

        for (input, ids) in self.inputs.iter().enumerate() {
            for (index, &wire) in ids.iter().enumerate() {
                write(&mut live, wire, Producer::Input { input, index });
            }
        }

        for (idx, gate) in self.gates.iter().enumerate() {
            for x in gate.inputs() {
                if let Some((_, read)) = live.get_mut(&x) {
                    *read = true;
                }
            }
            write(&mut live, gate.z(), Producer::Gate(idx));
        }

        for wire in self.outputs.iter().flatten() {
            if let Entry::Occupied(mut entry) = live.entry(*wire) {
                entry.get_mut().1 = true;
            }
        }

        dead.extend(
            live.into_iter()
                .filter(|(_, (_, read))| !read)
                .map(|(wire, (producer, _))| DeadWire { wire, producer }),
        );
        dead.sort_by_key(|dead| (dead.producer, dead.wire));

        let mentioned: HashSet<WireId> = self
            .gate_wires()
            .into_iter()
            .chain(self.inputs.iter().flatten().copied())
            .collect();
        let wire_count = self.wire_count();
        let unused_slots =
            wire_count - mentioned.iter().filter(|id| **id < wire_count).count();

        DeadReport { dead, unused_slots }
    }
}
