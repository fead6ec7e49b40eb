//! The stack-machine instruction set shared by both stages.
//!
//! The one-line text rendering produced by `Display` is the stable
//! interface between the front end and the back end: it round-trips
//! byte-for-byte through `parse`. The parse side also accepts hand-written
//! VM text, so `//` comments and blank lines are tolerated there.

use std::fmt;

use crate::error::{TranslateError, TranslateResult};

/// Abstract memory segments addressed by push/pop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
  Constant,
  Argument,
  Local,
  Static,
  This,
  That,
  Pointer,
  Temp,
}

impl Segment {
  fn parse(word: &str) -> Option<Self> {
    let seg = match word {
      "constant" => Self::Constant,
      "argument" => Self::Argument,
      "local" => Self::Local,
      "static" => Self::Static,
      "this" => Self::This,
      "that" => Self::That,
      "pointer" => Self::Pointer,
      "temp" => Self::Temp,
      _ => return None,
    };
    Some(seg)
  }
}

impl fmt::Display for Segment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Constant => "constant",
      Self::Argument => "argument",
      Self::Local => "local",
      Self::Static => "static",
      Self::This => "this",
      Self::That => "that",
      Self::Pointer => "pointer",
      Self::Temp => "temp",
    };
    f.write_str(name)
  }
}

/// Arithmetic and logical stack operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmOp {
  Add,
  Sub,
  Neg,
  Eq,
  Gt,
  Lt,
  And,
  Or,
  Not,
}

impl VmOp {
  fn parse(word: &str) -> Option<Self> {
    let op = match word {
      "add" => Self::Add,
      "sub" => Self::Sub,
      "neg" => Self::Neg,
      "eq" => Self::Eq,
      "gt" => Self::Gt,
      "lt" => Self::Lt,
      "and" => Self::And,
      "or" => Self::Or,
      "not" => Self::Not,
      _ => return None,
    };
    Some(op)
  }
}

impl fmt::Display for VmOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Add => "add",
      Self::Sub => "sub",
      Self::Neg => "neg",
      Self::Eq => "eq",
      Self::Gt => "gt",
      Self::Lt => "lt",
      Self::And => "and",
      Self::Or => "or",
      Self::Not => "not",
    };
    f.write_str(name)
  }
}

/// One stack-machine instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmInstruction {
  Push(Segment, i64),
  Pop(Segment, i64),
  Arith(VmOp),
  Label(String),
  Goto(String),
  IfGoto(String),
  Call(String, usize),
  Function(String, usize),
  Return,
}

impl fmt::Display for VmInstruction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Push(seg, index) => write!(f, "push {seg} {index}"),
      Self::Pop(seg, index) => write!(f, "pop {seg} {index}"),
      Self::Arith(op) => write!(f, "{op}"),
      Self::Label(name) => write!(f, "label {name}"),
      Self::Goto(name) => write!(f, "goto {name}"),
      Self::IfGoto(name) => write!(f, "if-goto {name}"),
      Self::Call(name, nargs) => write!(f, "call {name} {nargs}"),
      Self::Function(name, nlocals) => write!(f, "function {name} {nlocals}"),
      Self::Return => f.write_str("return"),
    }
  }
}

impl VmInstruction {
  /// Parse one line of VM text. `line_no` is 1-based, used in diagnostics.
  ///
  /// The caller strips trivia via [`strip_line`]; here the line is expected
  /// to hold exactly one instruction. Any mnemonic, segment or operand
  /// outside the fixed vocabulary is a fatal `MalformedInstruction`.
  pub fn parse(line: &str, line_no: usize) -> TranslateResult<Self> {
    let mut words = line.split_whitespace();
    let Some(mnemonic) = words.next() else {
      return Err(TranslateError::malformed(line_no, line, "empty instruction"));
    };
    let arity = |mut rest: std::str::SplitWhitespace<'_>| -> TranslateResult<()> {
      match rest.next() {
        Some(extra) => Err(TranslateError::malformed(
          line_no,
          line,
          format!("unexpected trailing operand \"{extra}\""),
        )),
        None => Ok(()),
      }
    };

    if let Some(op) = VmOp::parse(mnemonic) {
      arity(words)?;
      return Ok(Self::Arith(op));
    }

    match mnemonic {
      "push" | "pop" => {
        let seg_word = words
          .next()
          .ok_or_else(|| TranslateError::malformed(line_no, line, "missing segment"))?;
        let seg = Segment::parse(seg_word).ok_or_else(|| {
          TranslateError::malformed(line_no, line, format!("unknown segment \"{seg_word}\""))
        })?;
        let index_word = words
          .next()
          .ok_or_else(|| TranslateError::malformed(line_no, line, "missing index"))?;
        let index = index_word.parse::<i64>().map_err(|_| {
          TranslateError::malformed(line_no, line, format!("bad index \"{index_word}\""))
        })?;
        arity(words)?;
        if mnemonic == "push" {
          Ok(Self::Push(seg, index))
        } else if seg == Segment::Constant {
          Err(TranslateError::malformed(
            line_no,
            line,
            "cannot pop to the constant segment",
          ))
        } else {
          Ok(Self::Pop(seg, index))
        }
      }
      "label" | "goto" | "if-goto" => {
        let name = words
          .next()
          .ok_or_else(|| TranslateError::malformed(line_no, line, "missing label name"))?
          .to_string();
        arity(words)?;
        Ok(match mnemonic {
          "label" => Self::Label(name),
          "goto" => Self::Goto(name),
          _ => Self::IfGoto(name),
        })
      }
      "call" | "function" => {
        let name = words
          .next()
          .ok_or_else(|| TranslateError::malformed(line_no, line, "missing function name"))?
          .to_string();
        let count_word = words
          .next()
          .ok_or_else(|| TranslateError::malformed(line_no, line, "missing count"))?;
        let count = count_word.parse::<usize>().map_err(|_| {
          TranslateError::malformed(line_no, line, format!("bad count \"{count_word}\""))
        })?;
        arity(words)?;
        if mnemonic == "call" {
          Ok(Self::Call(name, count))
        } else {
          Ok(Self::Function(name, count))
        }
      }
      "return" => {
        arity(words)?;
        Ok(Self::Return)
      }
      _ => Err(TranslateError::malformed(
        line_no,
        line,
        format!("unknown mnemonic \"{mnemonic}\""),
      )),
    }
  }
}

/// Drop a trailing `//` comment and surrounding whitespace; `None` if the
/// line is blank after stripping.
pub fn strip_line(line: &str) -> Option<&str> {
  let code = match line.find("//") {
    Some(pos) => &line[..pos],
    None => line,
  };
  let code = code.trim();
  if code.is_empty() { None } else { Some(code) }
}

/// Render an instruction sequence as VM text, one instruction per line.
pub fn render(instructions: &[VmInstruction]) -> String {
  let mut out = String::new();
  for instruction in instructions {
    out.push_str(&instruction.to_string());
    out.push('\n');
  }
  out
}
