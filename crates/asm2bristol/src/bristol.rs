//! Bristol Fashion circuit format.
//!
//! See `https://nigelsmart.github.io/MPC-Circuits/` for the description of
//! the format.

use std::{fmt::Write as _, io::Write, sync::OnceLock};

use regex::Regex;

use crate::circuit::{Circuit, Gate, WireGroup, WireId, MAX_WIRE_ID};

static GATE_PATTERN: &str = r"^(?P<input_count>\d+)\s+(?P<output_count>\d+)\s+(?P<xref>\d+)\s+(?:(?P<yref>\d+)\s+)?(?P<zref>\d+)\s+(?P<gate>[A-Z]+)$";

/// An error raised while reading a Bristol Fashion circuit.
#[derive(Debug, thiserror::Error)]
pub enum BristolError {
    /// A line does not have the expected shape.
    #[error("line {line}: {reason}")]
    Malformed {
        /// Line number, starting at 1.
        line: usize,
        /// What is wrong.
        reason: String,
    },
    /// A gate type other than XOR, AND, NOT or INV.
    #[error("line {line}: unsupported gate type: {name}")]
    UnsupportedGate {
        /// Line number, starting at 1.
        line: usize,
        /// The gate mnemonic.
        name: String,
    },
    /// The number of gate lines differs from the header.
    #[error("expected {expected} gates, found {actual}")]
    GateCount {
        /// Gate count from the header.
        expected: usize,
        /// Number of gate lines.
        actual: usize,
    },
}

impl Circuit {
    /// Writes the circuit in Bristol Fashion format.
    ///
    /// The circuit is expected to be relabeled, see [`Circuit::relabel`]. NOT
    /// gates are written as `INV` if `not_is_inv` is set.
    pub fn write_bristol<W: Write>(&self, mut writer: W, not_is_inv: bool) -> std::io::Result<()> {
        writer.write_all(self.to_bristol(not_is_inv).as_bytes())?;
        writer.flush()
    }

    /// Returns the circuit in Bristol Fashion format.
    ///
    /// See [`Circuit::write_bristol`].
    pub fn to_bristol(&self, not_is_inv: bool) -> String {
        let mut out = String::new();

        // Writing into a `String` can not fail.
        let _ = writeln!(out, "{} {}", self.gates.len(), self.wire_count());
        let _ = writeln!(out, "{}", header_line(&self.inputs));
        let _ = writeln!(out, "{}", header_line(&self.outputs));
        // Not part of the format description, but every known parser
        // expects it.
        out.push('\n');

        for gate in &self.gates {
            let typ = gate.gate_type();
            let _ = write!(out, "{} 1", typ.arity());
            for x in gate.inputs() {
                let _ = write!(out, " {x}");
            }
            let _ = writeln!(out, " {} {}", gate.z(), typ.mnemonic(not_is_inv));
        }

        out
    }

    /// Parses a circuit in Bristol Fashion format.
    ///
    /// Input wires are assigned from 0 upwards and output wires take the
    /// highest ids, as the format prescribes. Every wire id must be below the
    /// wire count of the header.
    pub fn parse_bristol(text: &str) -> Result<Self, BristolError> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(idx, line)| (idx + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty());

        let (line, header) = lines.next().ok_or(BristolError::Malformed {
            line: 1,
            reason: "missing header".to_string(),
        })?;
        let header = parse_ints(line, header)?;
        let &[gate_count, wire_count] = &header[..] else {
            return Err(BristolError::Malformed {
                line,
                reason: "expected `<n_gates> <n_wires>`".to_string(),
            });
        };
        if wire_count > MAX_WIRE_ID {
            return Err(BristolError::Malformed {
                line,
                reason: format!("wire count {wire_count} exceeds {MAX_WIRE_ID}"),
            });
        }

        let (_, input_widths) = parse_counts(lines.next())?;
        let (line, output_widths) = parse_counts(lines.next())?;

        let output_len = match (total(&input_widths), total(&output_widths)) {
            (Some(input_len), Some(output_len))
                if input_len
                    .checked_add(output_len)
                    .is_some_and(|len| len <= wire_count) =>
            {
                output_len
            }
            _ => {
                return Err(BristolError::Malformed {
                    line,
                    reason: format!("input and output widths exceed {wire_count} wires"),
                })
            }
        };

        let mut gates = Vec::new();
        for (line, text) in lines {
            let gate = parse_gate(line, text)?;
            if let Some(wire) = gate.inputs().chain([gate.z()]).find(|id| *id >= wire_count) {
                return Err(BristolError::Malformed {
                    line,
                    reason: format!("wire {wire} is out of range for {wire_count} wires"),
                });
            }
            gates.push(gate);
        }

        if gates.len() != gate_count {
            return Err(BristolError::GateCount {
                expected: gate_count,
                actual: gates.len(),
            });
        }

        let mut next = 0;
        let inputs = groups(&input_widths, &mut next);
        let mut next = wire_count - output_len;
        let outputs = groups(&output_widths, &mut next);

        Ok(Circuit::new(gates, inputs, outputs))
    }
}

fn header_line(groups: &[WireGroup]) -> String {
    std::iter::once(groups.len())
        .chain(groups.iter().map(Vec::len))
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Sums group widths, `None` on overflow.
fn total(widths: &[usize]) -> Option<usize> {
    widths.iter().try_fold(0usize, |acc, w| acc.checked_add(*w))
}

fn groups(widths: &[usize], next: &mut WireId) -> Vec<WireGroup> {
    widths
        .iter()
        .map(|width| {
            let group = (*next..*next + width).collect();
            *next += width;
            group
        })
        .collect()
}

fn parse_ints(line: usize, text: &str) -> Result<Vec<usize>, BristolError> {
    text.split_whitespace()
        .map(|token| parse_int(line, token))
        .collect()
}

fn parse_int(line: usize, token: &str) -> Result<usize, BristolError> {
    token.parse().map_err(|_| BristolError::Malformed {
        line,
        reason: format!("invalid integer `{token}`"),
    })
}

/// Parses a `<count> <w0> <w1> ...` header line.
fn parse_counts(line: Option<(usize, &str)>) -> Result<(usize, Vec<usize>), BristolError> {
    let (line, text) = line.ok_or(BristolError::Malformed {
        line: 0,
        reason: "missing input or output header".to_string(),
    })?;
    let values = parse_ints(line, text)?;
    match values.split_first() {
        Some((count, widths)) if *count == widths.len() => Ok((line, widths.to_vec())),
        _ => Err(BristolError::Malformed {
            line,
            reason: "group count does not match the number of widths".to_string(),
        }),
    }
}

fn parse_gate(line: usize, text: &str) -> Result<Gate, BristolError> {
    let captures = gate_pattern()
        .captures(text)
        .ok_or_else(|| BristolError::Malformed {
            line,
            reason: format!("invalid gate `{text}`"),
        })?;

    let name = &captures["gate"];
    let input_count = parse_int(line, &captures["input_count"])?;
    let output_count = parse_int(line, &captures["output_count"])?;
    let x = parse_int(line, &captures["xref"])?;
    let y = captures
        .name("yref")
        .map(|y| parse_int(line, y.as_str()))
        .transpose()?;
    let z = parse_int(line, &captures["zref"])?;

    let gate = match (name, input_count, output_count, y) {
        ("XOR", 2, 1, Some(y)) => Gate::Xor { x, y, z },
        ("AND", 2, 1, Some(y)) => Gate::And { x, y, z },
        ("NOT" | "INV", 1, 1, None) => Gate::Not { x, z },
        ("XOR" | "AND" | "NOT" | "INV", ..) => {
            return Err(BristolError::Malformed {
                line,
                reason: format!("wrong arity for {name} gate"),
            })
        }
        _ => {
            return Err(BristolError::UnsupportedGate {
                line,
                name: name.to_string(),
            })
        }
    };

    Ok(gate)
}

fn gate_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(GATE_PATTERN).expect("gate pattern is valid"))
}

#[cfg(test)]
mod tests {
    use rstest::*;

    use super::*;

    fn circuit() -> Circuit {
        Circuit::new(
            vec![
                Gate::Xor { x: 0, y: 1, z: 3 },
                Gate::Not { x: 3, z: 4 },
                Gate::And { x: 2, y: 4, z: 5 },
            ],
            vec![vec![0, 1], vec![2]],
            vec![vec![5]],
        )
    }

    #[test]
    fn test_to_bristol() {
        let expected = "\
3 6
2 2 1
1 1

2 1 0 1 3 XOR
1 1 3 4 NOT
2 1 2 4 5 AND
";
        assert_eq!(circuit().to_bristol(false), expected);
    }

    #[test]
    fn test_not_is_inv() {
        let text = circuit().to_bristol(true);

        assert!(text.contains("1 1 3 4 INV\n"));
        assert!(!text.contains("NOT"));
    }

    #[test]
    fn test_write_bristol() {
        let mut buf = Vec::new();
        circuit().write_bristol(&mut buf, false).unwrap();

        assert_eq!(String::from_utf8(buf).unwrap(), circuit().to_bristol(false));
    }

    #[test]
    fn test_parse_bristol() {
        let text = circuit().to_bristol(true);

        assert_eq!(Circuit::parse_bristol(&text).unwrap(), circuit());
    }

    #[test]
    fn test_parse_bristol_errors() {
        let err = Circuit::parse_bristol("1 3\n1 2\n1 1\n\n2 1 0 1 2 OR\n").unwrap_err();
        assert!(matches!(err, BristolError::UnsupportedGate { line: 5, .. }));

        let err = Circuit::parse_bristol("1 3\n1 2\n1 1\n\n1 1 0 1 2 XOR\n").unwrap_err();
        assert!(matches!(err, BristolError::Malformed { line: 5, .. }));

        let err = Circuit::parse_bristol("2 3\n1 2\n1 1\n\n2 1 0 1 2 XOR\n").unwrap_err();
        assert!(matches!(
            err,
            BristolError::GateCount {
                expected: 2,
                actual: 1
            }
        ));

        let err = Circuit::parse_bristol("1 3\n2 2\n1 1\n").unwrap_err();
        assert!(matches!(err, BristolError::Malformed { line: 2, .. }));

        let err = Circuit::parse_bristol("1 3\n1 2\n1 1\n\n2 1 0 1 3 AND\n").unwrap_err();
        assert!(matches!(err, BristolError::Malformed { line: 5, .. }));

        let err = Circuit::parse_bristol("1 3\n1 2\n1 1\n\n2 1 0 XOR\n").unwrap_err();
        assert!(matches!(err, BristolError::Malformed { line: 5, .. }));
    }

    #[rstest]
    #[case::huge_gate_count("18446744073709551615 3\n1 2\n1 1\n\n")]
    #[case::huge_wire_count("0 18446744073709551615\n1 1\n1 1\n\n")]
    #[case::huge_input_width("0 3\n1 18446744073709551615\n1 1\n\n")]
    #[case::huge_output_width("0 3\n1 1\n2 1 18446744073709551615\n\n")]
    #[case::widths_exceed_wires("0 3\n1 2\n1 2\n\n")]
    fn test_parse_bristol_rejects_oversized_header(#[case] text: &str) {
        assert!(Circuit::parse_bristol(text).is_err());
    }

    #[test]
    fn test_parse_bristol_widths_overflow() {
        let err = Circuit::parse_bristol("0 3\n1 18446744073709551615\n1 1\n\n").unwrap_err();

        assert!(matches!(err, BristolError::Malformed { line: 3, .. }));
    }
}
