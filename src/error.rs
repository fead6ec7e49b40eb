//! Shared error utilities used across the compilation pipeline.
//!
//! Diagnostics are kept lightweight on purpose – front-end errors point at
//! the offending byte with a caret, back-end errors carry the line of VM
//! text that failed to parse. The first structural fault aborts the unit;
//! there is no recovery or multi-error reporting.

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;
pub type TranslateResult<T> = Result<T, TranslateError>;

/// Errors raised while lexing or compiling one Jack compilation unit.
#[derive(Debug, Snafu)]
pub enum CompileError {
  #[snafu(display("{context_line}\n{marker} {message}"))]
  WithLocation {
    context_line: String,
    marker: String,
    message: String,
  },
}

impl CompileError {
  /// Construct an error anchored at a specific byte offset in the source.
  ///
  /// The caret points into the source line containing `loc` rather than the
  /// whole unit, which can run to hundreds of lines.
  pub fn at(source: &str, loc: usize, message: impl Into<String>) -> Self {
    let safe_loc = loc.min(source.len());
    let line_start = source[..safe_loc].rfind('\n').map_or(0, |p| p + 1);
    let line_end = source[safe_loc..]
      .find('\n')
      .map_or(source.len(), |p| safe_loc + p);
    let context_line = source[line_start..line_end].to_string();
    let char_offset = source[line_start..safe_loc].chars().count();
    let marker = format!("{}^", " ".repeat(char_offset));
    Self::WithLocation {
      context_line,
      marker,
      message: message.into(),
    }
  }
}

/// Errors raised while lowering VM text into Hack assembly.
///
/// Well-formed IR cannot fail translation; anything outside the fixed
/// mnemonic/operand vocabulary is fatal.
#[derive(Debug, Snafu)]
pub enum TranslateError {
  #[snafu(display("line {line}: malformed instruction \"{text}\": {message}"))]
  MalformedInstruction {
    line: usize,
    text: String,
    message: String,
  },
}

impl TranslateError {
  pub fn malformed(line: usize, text: impl Into<String>, message: impl Into<String>) -> Self {
    Self::MalformedInstruction {
      line,
      text: text.into(),
      message: message.into(),
    }
  }
}
