//! Circuit model shared by every phase of the conversion.

use std::{collections::HashSet, fmt::Display, iter};

/// Identifier of a wire.
pub type WireId = usize;

/// An ordered list of wires making up one declared input or output.
pub type WireGroup = Vec<WireId>;

/// Highest wire id accepted from a circuit file.
pub const MAX_WIRE_ID: WireId = u32::MAX as WireId;

/// A binary logic gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Gate {
    /// XOR gate.
    Xor { x: WireId, y: WireId, z: WireId },
    /// AND gate.
    And { x: WireId, y: WireId, z: WireId },
    /// NOT gate.
    Not { x: WireId, z: WireId },
}

impl Gate {
    /// Returns the type of the gate.
    pub fn gate_type(&self) -> GateType {
        match self {
            Gate::Xor { .. } => GateType::Xor,
            Gate::And { .. } => GateType::And,
            Gate::Not { .. } => GateType::Not,
        }
    }

    /// Returns the x input of the gate.
    pub fn x(&self) -> WireId {
        match self {
            Gate::Xor { x, .. } | Gate::And { x, .. } | Gate::Not { x, .. } => *x,
        }
    }

    /// Returns the y input of the gate.
    pub fn y(&self) -> Option<WireId> {
        match self {
            Gate::Xor { y, .. } | Gate::And { y, .. } => Some(*y),
            Gate::Not { .. } => None,
        }
    }

    /// Returns the z output of the gate.
    pub fn z(&self) -> WireId {
        match self {
            Gate::Xor { z, .. } | Gate::And { z, .. } | Gate::Not { z, .. } => *z,
        }
    }

    /// Returns the input wires of the gate, in operand order.
    pub fn inputs(&self) -> impl Iterator<Item = WireId> {
        iter::once(self.x()).chain(self.y())
    }

    /// Returns `true` if the gate reads the given wire.
    pub fn reads(&self, id: WireId) -> bool {
        self.inputs().any(|x| x == id)
    }

    /// Returns `true` if the gate writes the given wire.
    pub fn writes(&self, id: WireId) -> bool {
        self.z() == id
    }

    pub(crate) fn inputs_mut(&mut self) -> impl Iterator<Item = &mut WireId> {
        let (x, y) = match self {
            Gate::Xor { x, y, .. } | Gate::And { x, y, .. } => (x, Some(y)),
            Gate::Not { x, .. } => (x, None),
        };
        iter::once(x).chain(y)
    }

    pub(crate) fn z_mut(&mut self) -> &mut WireId {
        match self {
            Gate::Xor { z, .. } | Gate::And { z, .. } | Gate::Not { z, .. } => z,
        }
    }
}

impl Display for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inputs = self.inputs().collect::<Vec<_>>();
        write!(f, "{} in={:?} out=[{}]", self.gate_type(), inputs, self.z())
    }
}

/// The type of a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateType {
    /// XOR gate.
    Xor,
    /// AND gate.
    And,
    /// NOT gate.
    Not,
}

impl GateType {
    /// Returns the number of input wires of a gate of this type.
    pub fn arity(&self) -> usize {
        match self {
            GateType::Xor | GateType::And => 2,
            GateType::Not => 1,
        }
    }

    /// Returns the mnemonic written to a Bristol Fashion file.
    ///
    /// Some consumers only understand `INV` for negation, which is what
    /// `not_is_inv` selects.
    pub fn mnemonic(&self, not_is_inv: bool) -> &'static str {
        match self {
            GateType::Xor => "XOR",
            GateType::And => "AND",
            GateType::Not if not_is_inv => "INV",
            GateType::Not => "NOT",
        }
    }
}

impl Display for GateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic(false))
    }
}

/// Kind of a declared circuit region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegionKind {
    /// A circuit input.
    Input,
    /// A circuit output.
    Output,
}

impl Display for RegionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegionKind::Input => f.write_str("Input"),
            RegionKind::Output => f.write_str("Output"),
        }
    }
}

/// A binary circuit given as a list of gates in program order.
///
/// The gate order doubles as the topological order, there is no separate
/// schedule. Wire ids may be reused across the program until the circuit is
/// relabeled, see [`Circuit::relabel`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Circuit {
    pub(crate) gates: Vec<Gate>,
    pub(crate) inputs: Vec<WireGroup>,
    pub(crate) outputs: Vec<WireGroup>,
}

impl Circuit {
    /// Creates a new circuit.
    ///
    /// # Arguments
    ///
    /// * `gates` - The gates of the circuit, in program order.
    /// * `inputs` - The wires of each input, in declared order.
    /// * `outputs` - The wires of each output, in declared order.
    pub fn new(gates: Vec<Gate>, inputs: Vec<WireGroup>, outputs: Vec<WireGroup>) -> Self {
        Self {
            gates,
            inputs,
            outputs,
        }
    }

    /// Returns a reference to the gates of the circuit.
    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    /// Returns a reference to the inputs of the circuit.
    pub fn inputs(&self) -> &[WireGroup] {
        &self.inputs
    }

    /// Returns a reference to the outputs of the circuit.
    pub fn outputs(&self) -> &[WireGroup] {
        &self.outputs
    }

    /// Returns the total number of input wires.
    pub fn input_len(&self) -> usize {
        self.inputs.iter().map(Vec::len).sum()
    }

    /// Returns the total number of output wires.
    pub fn output_len(&self) -> usize {
        self.outputs.iter().map(Vec::len).sum()
    }

    /// Returns the bit width of every input.
    pub fn input_widths(&self) -> Vec<usize> {
        self.inputs.iter().map(Vec::len).collect()
    }

    /// Returns the bit width of every output.
    pub fn output_widths(&self) -> Vec<usize> {
        self.outputs.iter().map(Vec::len).collect()
    }

    /// Returns the number of AND gates in the circuit.
    pub fn and_count(&self) -> usize {
        self.count(GateType::And)
    }

    /// Returns the number of XOR gates in the circuit.
    pub fn xor_count(&self) -> usize {
        self.count(GateType::Xor)
    }

    /// Returns the number of NOT gates in the circuit.
    pub fn not_count(&self) -> usize {
        self.count(GateType::Not)
    }

    fn count(&self, typ: GateType) -> usize {
        self.gates.iter().filter(|g| g.gate_type() == typ).count()
    }

    /// Returns the highest wire id mentioned anywhere in the circuit.
    pub fn max_wire(&self) -> Option<WireId> {
        self.gates
            .iter()
            .flat_map(|g| g.inputs().chain(iter::once(g.z())))
            .chain(self.inputs.iter().flatten().copied())
            .chain(self.outputs.iter().flatten().copied())
            .max()
    }

    /// Returns the number of wires, ie. the highest wire id plus one.
    ///
    /// Saturates at `usize::MAX`.
    pub fn wire_count(&self) -> usize {
        self.max_wire().map_or(0, |id| id.saturating_add(1))
    }

    /// Returns the set of wires read or written by any gate.
    pub fn gate_wires(&self) -> HashSet<WireId> {
        gate_wires(&self.gates)
    }
}

pub(crate) fn gate_wires(gates: &[Gate]) -> HashSet<WireId> {
    gates
        .iter()
        .flat_map(|g| g.inputs().chain(iter::once(g.z())))
        .collect()
}

/// Renames reads of `from` to `to`, scanning forward from the first gate.
///
/// The scan stops at the first gate which writes `from`, as from that point
/// on the id holds a different value. Returns the number of gates changed.
pub(crate) fn rename_forward(gates: &mut [Gate], from: WireId, to: WireId) -> usize {
    let mut count = 0;
    for gate in gates.iter_mut() {
        if gate.reads(from) {
            gate.inputs_mut()
                .filter(|x| **x == from)
                .for_each(|x| *x = to);
            count += 1;
        }
        if gate.writes(from) {
            break;
        }
    }
    count
}

/// Renames the last live range of `from` to `to`, scanning backward from the
/// last gate.
///
/// Reads are renamed until the most recent write of `from` is reached, which
/// is renamed as well. Returns the number of gates changed.
pub(crate) fn rename_backward(gates: &mut [Gate], from: WireId, to: WireId) -> usize {
    let mut count = 0;
    for gate in gates.iter_mut().rev() {
        if gate.writes(from) {
            *gate.z_mut() = to;
            return count + 1;
        }
        if gate.reads(from) {
            gate.inputs_mut()
                .filter(|x| **x == from)
                .for_each(|x| *x = to);
            count += 1;
        }
    }
    count
}
