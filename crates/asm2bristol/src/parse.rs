//! Reader for the gate listing of a compiled secure-computation program.
//!
//! The listing contains one instruction per line. Gates are declared in
//! groups by the `xors`, `ands` and `nots` instructions. Circuit inputs and
//! outputs are delimited by `Input i` and `Output i` comment markers, each
//! followed by a `reveal` instruction listing the wires of that region.

use std::{path::Path, sync::OnceLock};

use regex::Regex;
use tracing::{info, trace};

use crate::circuit::{Circuit, Gate, RegionKind, WireGroup, WireId, MAX_WIRE_ID};

static OPERAND_PATTERN: &str = r"^sb(?P<id>\d+)\(\d+\)$";
static MARKER_PATTERN: &str = r"(?P<kind>Input|Output) (?P<index>\d+)";

/// An error raised while reading a gate listing.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// An instruction does not have the expected shape.
    #[error("line {line}: malformed instruction: {reason}")]
    MalformedInstruction {
        /// Line number, starting at 1.
        line: usize,
        /// What is wrong.
        reason: String,
    },
    /// An instruction operates on more than one bit at a time.
    #[error("line {line}: {width}-bit operations are not supported")]
    UnsupportedWidth {
        /// Line number, starting at 1.
        line: usize,
        /// The declared width.
        width: usize,
    },
    /// A region marker is not followed by a `reveal` instruction.
    #[error("line {line}: expected `reveal` after {kind} {index} marker, found `{found}`")]
    UnexpectedInstruction {
        /// Line number, starting at 1.
        line: usize,
        /// Kind of the pending region.
        kind: RegionKind,
        /// Index of the pending region.
        index: usize,
        /// The instruction found instead.
        found: String,
    },
    /// A marker refers to a region which was not declared.
    #[error("line {line}: {kind} {index} is not declared, {count} declared")]
    UndeclaredRegion {
        /// Line number, starting at 1.
        line: usize,
        /// Kind of the region.
        kind: RegionKind,
        /// Index of the region.
        index: usize,
        /// Number of declared regions of this kind.
        count: usize,
    },
    /// A region is defined twice.
    #[error("line {line}: {kind} {index} is defined twice")]
    DuplicateRegion {
        /// Line number, starting at 1.
        line: usize,
        /// Kind of the region.
        kind: RegionKind,
        /// Index of the region.
        index: usize,
    },
    /// A declared region is never defined.
    #[error("{kind} {index} is never defined")]
    MissingRegion {
        /// Kind of the region.
        kind: RegionKind,
        /// Index of the region.
        index: usize,
    },
    /// A region does not have the declared number of wires.
    #[error("{kind} {index} has {actual} wires, expected {expected}")]
    WidthMismatch {
        /// Kind of the region.
        kind: RegionKind,
        /// Index of the region.
        index: usize,
        /// The declared width.
        expected: usize,
        /// The number of revealed wires.
        actual: usize,
    },
}

impl Circuit {
    /// Reads a circuit from a gate listing file.
    ///
    /// See [`Circuit::parse_asm`].
    pub fn parse_asm_file(
        path: impl AsRef<Path>,
        inputs: &[usize],
        outputs: &[usize],
    ) -> Result<Self, ParseError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse_asm(&text, inputs, outputs)
    }

    /// Reads a circuit from a gate listing.
    ///
    /// # Arguments
    ///
    /// * `text` - The listing.
    /// * `inputs` - The bit width of every input, in order.
    /// * `outputs` - The bit width of every output, in order.
    ///
    /// # Returns
    ///
    /// The circuit, with its gates in program order.
    pub fn parse_asm(text: &str, inputs: &[usize], outputs: &[usize]) -> Result<Self, ParseError> {
        let mut reader = Reader::new(inputs, outputs);
        for (idx, line) in text.lines().enumerate() {
            reader.read_line(idx + 1, line)?;
        }
        reader.finish()
    }
}

/// Region whose wires are given by the next instruction.
#[derive(Debug, Clone, Copy)]
struct Pending {
    kind: RegionKind,
    index: usize,
}

struct Reader<'a> {
    widths: [&'a [usize]; 2],
    regions: [Vec<Option<WireGroup>>; 2],
    gates: Vec<Gate>,
    pending: Option<Pending>,
}

impl<'a> Reader<'a> {
    fn new(inputs: &'a [usize], outputs: &'a [usize]) -> Self {
        Self {
            widths: [inputs, outputs],
            regions: [vec![None; inputs.len()], vec![None; outputs.len()]],
            gates: Vec::new(),
            pending: None,
        }
    }

    fn read_line(&mut self, line: usize, text: &str) -> Result<(), ParseError> {
        if text.starts_with('#') {
            return self.read_comment(line, text);
        }

        let code = text.split('#').next().unwrap_or_default().trim();
        if code.is_empty() {
            return Ok(());
        }

        let tokens = code
            .split_whitespace()
            .map(|token| token.trim_end_matches(','))
            .collect::<Vec<_>>();

        if let Some(Pending { kind, index }) = self.pending.take() {
            if tokens[0] != "reveal" {
                return Err(ParseError::UnexpectedInstruction {
                    line,
                    kind,
                    index,
                    found: tokens[0].to_string(),
                });
            }
            return self.define_region(line, kind, index, &tokens);
        }

        match tokens[0] {
            "xors" => self.read_binary(line, &tokens, |x, y, z| Gate::Xor { x, y, z }),
            "ands" => self.read_binary(line, &tokens, |x, y, z| Gate::And { x, y, z }),
            "nots" => self.read_not(line, &tokens),
            name => {
                trace!("line {}: skipping `{}`", line, name);
                Ok(())
            }
        }
    }

    fn read_comment(&mut self, line: usize, text: &str) -> Result<(), ParseError> {
        let Some(captures) = marker_pattern().captures(text) else {
            return Ok(());
        };

        let kind = match &captures["kind"] {
            "Input" => RegionKind::Input,
            _ => RegionKind::Output,
        };
        let index: usize = parse_int(line, &captures["index"])?;

        let count = self.regions(kind).len();
        match self.regions(kind).get(index) {
            None => {
                return Err(ParseError::UndeclaredRegion {
                    line,
                    kind,
                    index,
                    count,
                })
            }
            Some(Some(_)) => return Err(ParseError::DuplicateRegion { line, kind, index }),
            Some(None) => {}
        }

        self.pending = Some(Pending { kind, index });

        Ok(())
    }

    fn read_binary(
        &mut self,
        line: usize,
        tokens: &[&str],
        gate: impl Fn(WireId, WireId, WireId) -> Gate,
    ) -> Result<(), ParseError> {
        for args in group_args(line, tokens, 4)? {
            check_width(line, args[0])?;
            let z = parse_operand(line, args[1])?;
            let x = parse_operand(line, args[2])?;
            let y = parse_operand(line, args[3])?;
            self.gates.push(gate(x, y, z));
        }
        Ok(())
    }

    fn read_not(&mut self, line: usize, tokens: &[&str]) -> Result<(), ParseError> {
        if tokens.len() != 4 {
            return Err(ParseError::MalformedInstruction {
                line,
                reason: format!("`nots` takes 3 arguments, got {}", tokens.len() - 1),
            });
        }
        check_width(line, tokens[1])?;
        let z = parse_operand(line, tokens[2])?;
        let x = parse_operand(line, tokens[3])?;
        self.gates.push(Gate::Not { x, z });
        Ok(())
    }

    fn define_region(
        &mut self,
        line: usize,
        kind: RegionKind,
        index: usize,
        tokens: &[&str],
    ) -> Result<(), ParseError> {
        let wires = group_args(line, tokens, 3)?
            .map(|args| {
                check_width(line, args[0])?;
                parse_operand(line, args[2])
            })
            .collect::<Result<WireGroup, _>>()?;

        let expected = self.widths[kind as usize][index];
        if wires.len() != expected {
            return Err(ParseError::WidthMismatch {
                kind,
                index,
                expected,
                actual: wires.len(),
            });
        }

        info!("found {} #{} with {} bits", kind, index, wires.len());
        self.regions[kind as usize][index] = Some(wires);

        Ok(())
    }

    fn regions(&self, kind: RegionKind) -> &[Option<WireGroup>] {
        &self.regions[kind as usize]
    }

    fn finish(self) -> Result<Circuit, ParseError> {
        if let Some(Pending { kind, index }) = self.pending {
            return Err(ParseError::MissingRegion { kind, index });
        }

        let [inputs, outputs] = self.regions;
        let inputs = collect_regions(RegionKind::Input, inputs)?;
        let outputs = collect_regions(RegionKind::Output, outputs)?;

        Ok(Circuit::new(self.gates, inputs, outputs))
    }
}

fn collect_regions(
    kind: RegionKind,
    regions: Vec<Option<WireGroup>>,
) -> Result<Vec<WireGroup>, ParseError> {
    regions
        .into_iter()
        .enumerate()
        .map(|(index, wires)| wires.ok_or(ParseError::MissingRegion { kind, index }))
        .collect()
}

/// Splits the arguments of a grouped instruction into chunks of `stride`.
///
/// The first argument is the total argument count, which must be a multiple
/// of `stride` and match the number of arguments given.
fn group_args<'a, 'b>(
    line: usize,
    tokens: &'b [&'a str],
    stride: usize,
) -> Result<std::slice::Chunks<'b, &'a str>, ParseError> {
    let name = tokens[0];
    let Some(count) = tokens.get(1) else {
        return Err(ParseError::MalformedInstruction {
            line,
            reason: format!("`{name}` is missing its argument count"),
        });
    };
    let count: usize = parse_int(line, count)?;
    let args = &tokens[2..];

    if count % stride != 0 {
        return Err(ParseError::MalformedInstruction {
            line,
            reason: format!("`{name}` argument count {count} is not a multiple of {stride}"),
        });
    }
    if args.len() != count {
        return Err(ParseError::MalformedInstruction {
            line,
            reason: format!("`{name}` declares {count} arguments, got {}", args.len()),
        });
    }

    Ok(args.chunks(stride))
}

fn check_width(line: usize, token: &str) -> Result<(), ParseError> {
    match parse_int(line, token)? {
        1 => Ok(()),
        width => Err(ParseError::UnsupportedWidth { line, width }),
    }
}

fn parse_int(line: usize, token: &str) -> Result<usize, ParseError> {
    token
        .parse()
        .map_err(|err| ParseError::MalformedInstruction {
            line,
            reason: format!("invalid integer `{token}`: {err}"),
        })
}

/// Parses a register reference `sb<id>(<size>)` into a wire id.
fn parse_operand(line: usize, token: &str) -> Result<WireId, ParseError> {
    let captures =
        operand_pattern()
            .captures(token)
            .ok_or_else(|| ParseError::MalformedInstruction {
                line,
                reason: format!("invalid operand `{token}`"),
            })?;

    match parse_int(line, &captures["id"])? {
        id if id > MAX_WIRE_ID => Err(ParseError::MalformedInstruction {
            line,
            reason: format!("register {id} exceeds the maximum wire id {MAX_WIRE_ID}"),
        }),
        id => Ok(id),
    }
}

fn operand_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(OPERAND_PATTERN).expect("operand pattern is valid"))
}

fn marker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(MARKER_PATTERN).expect("marker pattern is valid"))
}

#[cfg(test)]
mod tests {
    use rstest::*;

    use super::*;

    static HALF_ADDER: &str = "\
# Input 0
reveal 6, 1, 0, sb0(1), 1, 0, sb1(1)
xors 4, 1, sb2(1), sb0(1), sb1(1)
ands 4, 1, sb3(1), sb0(1), sb1(1)
# Output 0
reveal 6, 1, 0, sb2(1), 1, 0, sb3(1)
";

    #[test]
    fn test_parse_half_adder() {
        let circ = Circuit::parse_asm(HALF_ADDER, &[2], &[2]).unwrap();

        assert_eq!(circ.inputs(), &[vec![0, 1]]);
        assert_eq!(circ.outputs(), &[vec![2, 3]]);
        assert_eq!(
            circ.gates(),
            &[
                Gate::Xor { x: 0, y: 1, z: 2 },
                Gate::And { x: 0, y: 1, z: 3 },
            ]
        );
    }

    #[test]
    fn test_parse_grouped_gates_and_comments() {
        let text = "\
# Input 0
reveal 3 1 0 sb7(1) # a
# Input 1
reveal 3 1 0 sb9(1)

# some comment
xors 8, 1, sb4(1), sb7(1), sb9(1), 1, sb5(1), sb4(1), sb7(1)
nots 1, sb6(1), sb5(1)
print_reg sb6(1)
reveal 3, 1, 0, sb6(1)
# Output 0
reveal 3, 1, 0, sb6(1)
";
        let circ = Circuit::parse_asm(text, &[1, 1], &[1]).unwrap();

        assert_eq!(circ.inputs(), &[vec![7], vec![9]]);
        assert_eq!(circ.outputs(), &[vec![6]]);
        assert_eq!(
            circ.gates(),
            &[
                Gate::Xor { x: 7, y: 9, z: 4 },
                Gate::Xor { x: 4, y: 7, z: 5 },
                Gate::Not { x: 5, z: 6 },
            ]
        );
    }

    #[test]
    fn test_parse_out_of_order_regions() {
        let text = "\
# Input 1
reveal 3, 1, 0, sb1(1)
# Input 0
reveal 3, 1, 0, sb0(1)
ands 4, 1, sb2(1), sb0(1), sb1(1)
# Output 0
reveal 3, 1, 0, sb2(1)
";
        let circ = Circuit::parse_asm(text, &[1, 1], &[1]).unwrap();

        assert_eq!(circ.inputs(), &[vec![0], vec![1]]);
    }

    #[rstest]
    #[case::xors_width("xors 4, 2, sb2(1), sb0(1), sb1(1)")]
    #[case::ands_width("ands 4, 8, sb2(1), sb0(1), sb1(1)")]
    #[case::nots_width("nots 32, sb2(1), sb0(1)")]
    fn test_unsupported_width(#[case] instruction: &str) {
        let err = Circuit::parse_asm(instruction, &[], &[]).unwrap_err();

        assert!(matches!(err, ParseError::UnsupportedWidth { line: 1, .. }));
    }

    #[rstest]
    #[case::not_multiple("xors 5, 1, sb2(1), sb0(1), sb1(1), 1")]
    #[case::count_mismatch("ands 8, 1, sb2(1), sb0(1), sb1(1)")]
    #[case::missing_count("xors")]
    #[case::bad_operand("xors 4, 1, r2, sb0(1), sb1(1)")]
    #[case::nots_arity("nots 1, sb2(1)")]
    #[case::id_too_large("nots 1, sb4294967296(1), sb0(1)")]
    #[case::id_max_usize("xors 4, 1, sb18446744073709551615(1), sb0(1), sb1(1)")]
    fn test_malformed_instruction(#[case] instruction: &str) {
        let err = Circuit::parse_asm(instruction, &[], &[]).unwrap_err();

        assert!(matches!(
            err,
            ParseError::MalformedInstruction { line: 1, .. }
        ));
    }

    #[test]
    fn test_max_wire_id() {
        let text = format!("nots 1, sb{MAX_WIRE_ID}(1), sb0(1)");
        let circ = Circuit::parse_asm(&text, &[], &[]).unwrap();

        assert_eq!(circ.gates(), &[Gate::Not { x: 0, z: MAX_WIRE_ID }]);
    }

    #[test]
    fn test_parse_asm_file() {
        let path = std::env::temp_dir()
            .join(format!("asm2bristol-{}-half-adder.asm", std::process::id()));
        std::fs::write(&path, HALF_ADDER).unwrap();

        let circ = Circuit::parse_asm_file(&path, &[2], &[2]).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(circ, Circuit::parse_asm(HALF_ADDER, &[2], &[2]).unwrap());
        assert!(matches!(
            Circuit::parse_asm_file(&path, &[2], &[2]),
            Err(ParseError::Io(_))
        ));
    }

    #[test]
    fn test_missing_region() {
        let text = "\
# Input 0
reveal 3, 1, 0, sb0(1)
nots 1, sb1(1), sb0(1)
";
        let err = Circuit::parse_asm(text, &[1], &[1]).unwrap_err();

        assert!(matches!(
            err,
            ParseError::MissingRegion {
                kind: RegionKind::Output,
                index: 0
            }
        ));
    }

    #[test]
    fn test_marker_at_end() {
        let text = "\
# Input 0
reveal 3, 1, 0, sb0(1)
# Output 0
";
        let err = Circuit::parse_asm(text, &[1], &[1]).unwrap_err();

        assert!(matches!(
            err,
            ParseError::MissingRegion {
                kind: RegionKind::Output,
                index: 0
            }
        ));
    }

    #[test]
    fn test_width_mismatch() {
        let text = "\
# Input 0
reveal 6, 1, 0, sb0(1), 1, 0, sb1(1)
";
        let err = Circuit::parse_asm(text, &[3], &[]).unwrap_err();

        assert!(matches!(
            err,
            ParseError::WidthMismatch {
                kind: RegionKind::Input,
                index: 0,
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_marker_not_followed_by_reveal() {
        let text = "\
# Input 0
xors 4, 1, sb2(1), sb0(1), sb1(1)
";
        let err = Circuit::parse_asm(text, &[1], &[]).unwrap_err();

        assert!(matches!(
            err,
            ParseError::UnexpectedInstruction { line: 2, found, .. } if found == "xors"
        ));
    }

    #[test]
    fn test_undeclared_and_duplicate_region() {
        let err = Circuit::parse_asm("# Output 2", &[], &[1]).unwrap_err();
        assert!(matches!(
            err,
            ParseError::UndeclaredRegion {
                index: 2,
                count: 1,
                ..
            }
        ));

        let text = "\
# Input 0
reveal 3, 1, 0, sb0(1)
# Input 0
reveal 3, 1, 0, sb0(1)
";
        let err = Circuit::parse_asm(text, &[1], &[]).unwrap_err();
        assert!(matches!(
            err,
            ParseError::DuplicateRegion { line: 3, index: 0, .. }
        ));
    }
}
