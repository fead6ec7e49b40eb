//! Lexical analysis: turns the raw input string into a vector of tokens.
//!
//! The tokenizer is intentionally tiny – it knows nothing about semantics
//! beyond classifying keywords, symbols, identifiers and the two literal
//! forms. Whitespace and both comment styles are elided here so the parser
//! never sees trivia.

use crate::error::{CompileError, CompileResult};

/// The fixed keyword set of the source language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
  Class,
  Constructor,
  Function,
  Method,
  Field,
  Static,
  Var,
  Int,
  Char,
  Boolean,
  Void,
  True,
  False,
  Null,
  This,
  Let,
  Do,
  If,
  Else,
  While,
  Return,
}

impl Keyword {
  /// Map identifier text onto a keyword, if it is one.
  fn from_str(word: &str) -> Option<Self> {
    let kw = match word {
      "class" => Self::Class,
      "constructor" => Self::Constructor,
      "function" => Self::Function,
      "method" => Self::Method,
      "field" => Self::Field,
      "static" => Self::Static,
      "var" => Self::Var,
      "int" => Self::Int,
      "char" => Self::Char,
      "boolean" => Self::Boolean,
      "void" => Self::Void,
      "true" => Self::True,
      "false" => Self::False,
      "null" => Self::Null,
      "this" => Self::This,
      "let" => Self::Let,
      "do" => Self::Do,
      "if" => Self::If,
      "else" => Self::Else,
      "while" => Self::While,
      "return" => Self::Return,
      _ => return None,
    };
    Some(kw)
  }

  /// The source spelling, used in diagnostics.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Class => "class",
      Self::Constructor => "constructor",
      Self::Function => "function",
      Self::Method => "method",
      Self::Field => "field",
      Self::Static => "static",
      Self::Var => "var",
      Self::Int => "int",
      Self::Char => "char",
      Self::Boolean => "boolean",
      Self::Void => "void",
      Self::True => "true",
      Self::False => "false",
      Self::Null => "null",
      Self::This => "this",
      Self::Let => "let",
      Self::Do => "do",
      Self::If => "if",
      Self::Else => "else",
      Self::While => "while",
      Self::Return => "return",
    }
  }
}

/// Kinds of tokens recognised by the front-end, payload included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
  Keyword(Keyword),
  Symbol(char),
  Identifier(String),
  IntConst(i64),
  StrConst(String),
}

/// Thin wrapper for lexical information needed by later stages. `loc` and
/// `len` are byte offsets into the source, kept for caret diagnostics.
#[derive(Debug, Clone)]
pub struct Token {
  pub kind: TokenKind,
  pub loc: usize,
  pub len: usize,
}

impl Token {
  /// Convenience constructor to keep the `tokenize` loop readable.
  fn new(kind: TokenKind, loc: usize, len: usize) -> Self {
    Self { kind, loc, len }
  }
}

const SYMBOLS: &[u8] = b"{}()[].,;+-*/&|<>=~";

/// Lex one compilation unit into a flat vector of tokens.
///
/// Trivia rules are deliberately lenient: an unclosed block comment
/// consumes the rest of the input, and an unterminated string literal ends
/// at the line break. Neither is an error. Anything outside the language's
/// character set is fatal.
pub fn tokenize(input: &str) -> CompileResult<Vec<Token>> {
  let mut tokens = Vec::new();
  let bytes = input.as_bytes();
  let mut i = 0;

  while i < bytes.len() {
    let c = bytes[i];
    if c.is_ascii_whitespace() {
      i += 1;
      continue;
    }

    // Line comment runs to the newline, block comment to `*/` or EOF.
    if c == b'/' && i + 1 < bytes.len() && bytes[i + 1] == b'/' {
      i += 2;
      while i < bytes.len() && bytes[i] != b'\n' {
        i += 1;
      }
      continue;
    }
    if c == b'/' && i + 1 < bytes.len() && bytes[i + 1] == b'*' {
      i += 2;
      while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
        i += 1;
      }
      i = if i + 1 < bytes.len() { i + 2 } else { bytes.len() };
      continue;
    }

    if SYMBOLS.contains(&c) {
      tokens.push(Token::new(TokenKind::Symbol(c as char), i, 1));
      i += 1;
      continue;
    }

    if c == b'"' {
      let start = i;
      i += 1;
      let body_start = i;
      while i < bytes.len() && bytes[i] != b'"' && bytes[i] != b'\n' {
        i += 1;
      }
      let body = input[body_start..i].to_string();
      if i < bytes.len() && bytes[i] == b'"' {
        i += 1;
      }
      tokens.push(Token::new(TokenKind::StrConst(body), start, i - start));
      continue;
    }

    if c.is_ascii_digit() {
      let start = i;
      while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
      }
      // Digits accumulate with wrapping arithmetic; values beyond the
      // machine word flow through untouched and what the assembler makes
      // of them is implementation-defined.
      let mut value = 0i64;
      for &digit in &bytes[start..i] {
        value = value
          .wrapping_mul(10)
          .wrapping_add(i64::from(digit - b'0'));
      }
      tokens.push(Token::new(TokenKind::IntConst(value), start, i - start));
      continue;
    }

    if c.is_ascii_alphabetic() || c == b'_' {
      let start = i;
      while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
      }
      let word = &input[start..i];
      let kind = match Keyword::from_str(word) {
        Some(kw) => TokenKind::Keyword(kw),
        None => TokenKind::Identifier(word.to_string()),
      };
      tokens.push(Token::new(kind, start, i - start));
      continue;
    }

    let invalid_char = input[i..].chars().next().unwrap_or('\0');
    return Err(CompileError::at(
      input,
      i,
      format!("invalid character: '{invalid_char}'"),
    ));
  }

  Ok(tokens)
}

/// Human-friendly description used in diagnostics.
pub fn describe_token(token: Option<&Token>) -> String {
  match token {
    Some(t) => match &t.kind {
      TokenKind::Keyword(kw) => format!("\"{}\"", kw.as_str()),
      TokenKind::Symbol(c) => format!("\"{c}\""),
      TokenKind::Identifier(name) => format!("\"{name}\""),
      TokenKind::IntConst(value) => value.to_string(),
      TokenKind::StrConst(s) => format!("\"{s}\""),
    },
    None => "end of input".to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn kinds(input: &str) -> Vec<TokenKind> {
    tokenize(input)
      .unwrap()
      .into_iter()
      .map(|t| t.kind)
      .collect()
  }

  #[test]
  fn classifies_keywords_and_identifiers() {
    assert_eq!(
      kinds("class Main classless _x"),
      vec![
        TokenKind::Keyword(Keyword::Class),
        TokenKind::Identifier("Main".to_string()),
        TokenKind::Identifier("classless".to_string()),
        TokenKind::Identifier("_x".to_string()),
      ]
    );
  }

  #[test]
  fn single_character_symbols() {
    assert_eq!(
      kinds("a<b"),
      vec![
        TokenKind::Identifier("a".to_string()),
        TokenKind::Symbol('<'),
        TokenKind::Identifier("b".to_string()),
      ]
    );
  }

  #[test]
  fn skips_line_and_block_comments() {
    let src = "let // trailing\n/* block\nspanning */ x";
    assert_eq!(
      kinds(src),
      vec![
        TokenKind::Keyword(Keyword::Let),
        TokenKind::Identifier("x".to_string()),
      ]
    );
  }

  #[test]
  fn unclosed_block_comment_consumes_rest() {
    assert_eq!(
      kinds("let /* never closed"),
      vec![TokenKind::Keyword(Keyword::Let)]
    );
  }

  #[test]
  fn string_literal_body_excludes_quotes() {
    assert_eq!(
      kinds("\"hi there\""),
      vec![TokenKind::StrConst("hi there".to_string())]
    );
  }

  #[test]
  fn unterminated_string_stops_at_newline() {
    assert_eq!(
      kinds("\"oops\nx"),
      vec![
        TokenKind::StrConst("oops".to_string()),
        TokenKind::Identifier("x".to_string()),
      ]
    );
  }

  #[test]
  fn integer_literal_is_maximal_digit_run() {
    assert_eq!(
      kinds("x12 345"),
      vec![
        TokenKind::Identifier("x12".to_string()),
        TokenKind::IntConst(345),
      ]
    );
  }

  #[test]
  fn oversized_integer_literal_wraps_instead_of_failing() {
    let twenty_digits = "99999999999999999999";
    let mut expected = 0i64;
    for digit in twenty_digits.bytes() {
      expected = expected.wrapping_mul(10).wrapping_add(i64::from(digit - b'0'));
    }
    assert_eq!(kinds(twenty_digits), vec![TokenKind::IntConst(expected)]);
  }

  #[test]
  fn tracks_byte_offsets() {
    let tokens = tokenize("if (x)").unwrap();
    assert_eq!(tokens[0].loc, 0);
    assert_eq!(tokens[1].loc, 3);
    assert_eq!(tokens[2].loc, 4);
  }

  #[test]
  fn rejects_foreign_characters() {
    let err = tokenize("let x = @;").unwrap_err();
    assert!(err.to_string().contains("invalid character"));
  }
}
