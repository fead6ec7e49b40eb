//! The front end: a syntax-directed compiler from Jack source to VM code.
//!
//! Parsing and code generation happen in one pass. A small set of mutually
//! recursive `compile_*` methods mirrors the grammar; each emits VM
//! instructions as its production is recognised, so no syntax tree is ever
//! built. The compiler owns the symbol table and the label generator for
//! the duration of one compilation unit.
//!
//! Expressions are a single left-associative tier: `1 + 2 * 3` compiles as
//! `(1 + 2) * 3`, matching the language rule that any other grouping must
//! be parenthesised.

use crate::error::{CompileError, CompileResult};
use crate::labels::LabelGen;
use crate::symbols::{SymbolTable, VarKind};
use crate::tokenizer::{Keyword, Token, TokenKind, describe_token, tokenize};
use crate::vm::{Segment, VmInstruction, VmOp};

/// Compile one compilation unit into a VM instruction sequence.
pub fn compile(source: &str) -> CompileResult<Vec<VmInstruction>> {
  let tokens = tokenize(source)?;
  let mut compiler = Compiler::new(tokens, source);
  compiler.compile_class()?;
  Ok(compiler.code)
}

/// Map a storage kind onto the VM segment backing it.
fn kind_segment(kind: VarKind) -> Segment {
  match kind {
    VarKind::Static => Segment::Static,
    VarKind::Field => Segment::This,
    VarKind::Arg => Segment::Argument,
    VarKind::Local => Segment::Local,
  }
}

struct Compiler<'a> {
  stream: TokenStream<'a>,
  symbols: SymbolTable,
  labels: LabelGen,
  class_name: String,
  code: Vec<VmInstruction>,
}

impl<'a> Compiler<'a> {
  fn new(tokens: Vec<Token>, source: &'a str) -> Self {
    Self {
      stream: TokenStream::new(tokens, source),
      symbols: SymbolTable::new(),
      labels: LabelGen::new(),
      class_name: String::new(),
      code: Vec::new(),
    }
  }

  fn emit(&mut self, instruction: VmInstruction) {
    self.code.push(instruction);
  }

  /// Unit: `class` Name `{` classVarDec* subroutineDec* `}`.
  fn compile_class(&mut self) -> CompileResult<()> {
    self.symbols.start_class();
    self.stream.expect_keyword(Keyword::Class, "at start of unit")?;
    let (name, _) = self.stream.expect_identifier("class name")?;
    self.class_name = name;
    self.stream.expect_symbol('{', "after class name")?;
    while self
      .stream
      .check_keywords(&[Keyword::Static, Keyword::Field])
    {
      self.compile_class_var_dec()?;
    }
    while self.stream.check_keywords(&[
      Keyword::Constructor,
      Keyword::Function,
      Keyword::Method,
    ]) {
      self.compile_subroutine()?;
    }
    self.stream.expect_symbol('}', "at end of class")?;
    Ok(())
  }

  /// Declared types are recorded for call resolution but never checked.
  fn read_type(&mut self) -> CompileResult<String> {
    for kw in [Keyword::Int, Keyword::Char, Keyword::Boolean, Keyword::Void] {
      if self.stream.eat_keyword(kw) {
        return Ok(kw.as_str().to_string());
      }
    }
    let (name, _) = self.stream.expect_identifier("type name")?;
    Ok(name)
  }

  fn compile_class_var_dec(&mut self) -> CompileResult<()> {
    let kind = if self.stream.eat_keyword(Keyword::Static) {
      VarKind::Static
    } else {
      self.stream.expect_keyword(Keyword::Field, "class var kind")?;
      VarKind::Field
    };
    let ty = self.read_type()?;
    loop {
      let (name, _) = self.stream.expect_identifier("class var name")?;
      self.symbols.define(&name, &ty, kind);
      if !self.stream.eat_symbol(',') {
        break;
      }
    }
    self.stream.expect_symbol(';', "after class var declaration")?;
    Ok(())
  }

  fn compile_subroutine(&mut self) -> CompileResult<()> {
    let is_constructor = self.stream.eat_keyword(Keyword::Constructor);
    let is_method = !is_constructor && self.stream.eat_keyword(Keyword::Method);
    if !is_constructor && !is_method {
      self.stream.expect_keyword(Keyword::Function, "subroutine kind")?;
    }
    let _return_type = self.read_type()?;
    let (name, _) = self.stream.expect_identifier("subroutine name")?;

    self.symbols.start_subroutine();
    if is_method {
      // The receiver is argument 0; explicit parameters start at 1.
      let class_name = self.class_name.clone();
      self.symbols.define("this", &class_name, VarKind::Arg);
    }
    self.stream.expect_symbol('(', "before parameter list")?;
    self.compile_parameter_list()?;
    self.stream.expect_symbol(')', "after parameter list")?;
    self.stream.expect_symbol('{', "at start of subroutine body")?;
    while self.stream.check_keywords(&[Keyword::Var]) {
      self.compile_var_dec()?;
    }

    let n_locals = self.symbols.count_of(VarKind::Local);
    let qualified = format!("{}.{name}", self.class_name);
    self.emit(VmInstruction::Function(qualified, n_locals));
    if is_constructor {
      let n_fields = self.symbols.count_of(VarKind::Field) as i64;
      self.emit(VmInstruction::Push(Segment::Constant, n_fields));
      self.emit(VmInstruction::Call("Memory.alloc".to_string(), 1));
      self.emit(VmInstruction::Pop(Segment::Pointer, 0));
    } else if is_method {
      self.emit(VmInstruction::Push(Segment::Argument, 0));
      self.emit(VmInstruction::Pop(Segment::Pointer, 0));
    }

    self.compile_statements()?;
    self.stream.expect_symbol('}', "at end of subroutine body")?;
    Ok(())
  }

  fn compile_parameter_list(&mut self) -> CompileResult<()> {
    if self.stream.check_symbol(')') {
      return Ok(());
    }
    loop {
      let ty = self.read_type()?;
      let (name, _) = self.stream.expect_identifier("parameter name")?;
      self.symbols.define(&name, &ty, VarKind::Arg);
      if !self.stream.eat_symbol(',') {
        break;
      }
    }
    Ok(())
  }

  fn compile_var_dec(&mut self) -> CompileResult<()> {
    self.stream.expect_keyword(Keyword::Var, "local var declaration")?;
    let ty = self.read_type()?;
    loop {
      let (name, _) = self.stream.expect_identifier("local var name")?;
      self.symbols.define(&name, &ty, VarKind::Local);
      if !self.stream.eat_symbol(',') {
        break;
      }
    }
    self.stream.expect_symbol(';', "after var declaration")?;
    Ok(())
  }

  /// Zero or more statements, ending at the first token that starts none.
  fn compile_statements(&mut self) -> CompileResult<()> {
    loop {
      if self.stream.eat_keyword(Keyword::Let) {
        self.compile_let()?;
      } else if self.stream.eat_keyword(Keyword::If) {
        self.compile_if()?;
      } else if self.stream.eat_keyword(Keyword::While) {
        self.compile_while()?;
      } else if self.stream.eat_keyword(Keyword::Do) {
        self.compile_do()?;
      } else if self.stream.eat_keyword(Keyword::Return) {
        self.compile_return()?;
      } else {
        return Ok(());
      }
    }
  }

  fn compile_let(&mut self) -> CompileResult<()> {
    let (name, loc) = self.stream.expect_identifier("variable after \"let\"")?;
    let (segment, index) = self.resolve_var(&name, loc)?;

    let indexed = self.stream.eat_symbol('[');
    if indexed {
      self.compile_expression()?;
      self.stream.expect_symbol(']', "after array index")?;
      self.emit(VmInstruction::Push(segment, index));
      self.emit(VmInstruction::Arith(VmOp::Add));
    }
    self.stream.expect_symbol('=', "in let statement")?;
    self.compile_expression()?;
    self.stream.expect_symbol(';', "after let statement")?;

    if indexed {
      // The target address and the value sit on the stack in that order;
      // stashing the value in temp 0 lets `that` take the address first.
      self.emit(VmInstruction::Pop(Segment::Temp, 0));
      self.emit(VmInstruction::Pop(Segment::Pointer, 1));
      self.emit(VmInstruction::Push(Segment::Temp, 0));
      self.emit(VmInstruction::Pop(Segment::That, 0));
    } else {
      self.emit(VmInstruction::Pop(segment, index));
    }
    Ok(())
  }

  fn compile_if(&mut self) -> CompileResult<()> {
    let l_false = self.labels.fresh("IF_FALSE");
    let l_end = self.labels.fresh("IF_END");
    self.stream.expect_symbol('(', "after \"if\"")?;
    self.compile_expression()?;
    self.stream.expect_symbol(')', "after if condition")?;
    self.emit(VmInstruction::Arith(VmOp::Not));
    self.emit(VmInstruction::IfGoto(l_false.clone()));
    self.stream.expect_symbol('{', "before if body")?;
    self.compile_statements()?;
    self.stream.expect_symbol('}', "after if body")?;
    if self.stream.eat_keyword(Keyword::Else) {
      self.emit(VmInstruction::Goto(l_end.clone()));
      self.emit(VmInstruction::Label(l_false));
      self.stream.expect_symbol('{', "before else body")?;
      self.compile_statements()?;
      self.stream.expect_symbol('}', "after else body")?;
      self.emit(VmInstruction::Label(l_end));
    } else {
      self.emit(VmInstruction::Label(l_false));
    }
    Ok(())
  }

  fn compile_while(&mut self) -> CompileResult<()> {
    let l_top = self.labels.fresh("WHILE_EXP");
    let l_end = self.labels.fresh("WHILE_END");
    self.emit(VmInstruction::Label(l_top.clone()));
    self.stream.expect_symbol('(', "after \"while\"")?;
    self.compile_expression()?;
    self.stream.expect_symbol(')', "after while condition")?;
    self.emit(VmInstruction::Arith(VmOp::Not));
    self.emit(VmInstruction::IfGoto(l_end.clone()));
    self.stream.expect_symbol('{', "before while body")?;
    self.compile_statements()?;
    self.stream.expect_symbol('}', "after while body")?;
    self.emit(VmInstruction::Goto(l_top));
    self.emit(VmInstruction::Label(l_end));
    Ok(())
  }

  fn compile_do(&mut self) -> CompileResult<()> {
    let (first, _) = self.stream.expect_identifier("call after \"do\"")?;
    self.compile_call(first)?;
    self.stream.expect_symbol(';', "after do statement")?;
    // Every call leaves one value; a statement-level call discards it.
    self.emit(VmInstruction::Pop(Segment::Temp, 0));
    Ok(())
  }

  fn compile_return(&mut self) -> CompileResult<()> {
    if self.stream.check_symbol(';') {
      // Void subroutines still return one value, per the call contract.
      self.emit(VmInstruction::Push(Segment::Constant, 0));
    } else {
      self.compile_expression()?;
    }
    self.stream.expect_symbol(';', "after return statement")?;
    self.emit(VmInstruction::Return);
    Ok(())
  }

  /// One flat tier of left-associative binary operators, evaluated
  /// strictly left to right. `*` and `/` lower to runtime calls since the
  /// target machine has no hardware multiply or divide.
  fn compile_expression(&mut self) -> CompileResult<()> {
    self.compile_term()?;
    loop {
      let op = match self.stream.peek_symbol() {
        Some(c) if "+-*/&|<>=".contains(c) => c,
        _ => break,
      };
      self.stream.advance();
      self.compile_term()?;
      match op {
        '+' => self.emit(VmInstruction::Arith(VmOp::Add)),
        '-' => self.emit(VmInstruction::Arith(VmOp::Sub)),
        '*' => self.emit(VmInstruction::Call("Math.multiply".to_string(), 2)),
        '/' => self.emit(VmInstruction::Call("Math.divide".to_string(), 2)),
        '&' => self.emit(VmInstruction::Arith(VmOp::And)),
        '|' => self.emit(VmInstruction::Arith(VmOp::Or)),
        '<' => self.emit(VmInstruction::Arith(VmOp::Lt)),
        '>' => self.emit(VmInstruction::Arith(VmOp::Gt)),
        '=' => self.emit(VmInstruction::Arith(VmOp::Eq)),
        _ => unreachable!(),
      }
    }
    Ok(())
  }

  fn compile_term(&mut self) -> CompileResult<()> {
    let Some(token) = self.stream.peek().cloned() else {
      return Err(self.stream.error_here("expected a term"));
    };
    match token.kind {
      TokenKind::IntConst(value) => {
        self.stream.advance();
        self.emit(VmInstruction::Push(Segment::Constant, value));
      }
      TokenKind::StrConst(text) => {
        self.stream.advance();
        self.emit(VmInstruction::Push(Segment::Constant, text.len() as i64));
        self.emit(VmInstruction::Call("String.new".to_string(), 1));
        for byte in text.bytes() {
          self.emit(VmInstruction::Push(Segment::Constant, byte as i64));
          self.emit(VmInstruction::Call("String.appendChar".to_string(), 2));
        }
      }
      TokenKind::Keyword(Keyword::True) => {
        self.stream.advance();
        // All-bits-set is the canonical true value.
        self.emit(VmInstruction::Push(Segment::Constant, 0));
        self.emit(VmInstruction::Arith(VmOp::Not));
      }
      TokenKind::Keyword(Keyword::False) | TokenKind::Keyword(Keyword::Null) => {
        self.stream.advance();
        self.emit(VmInstruction::Push(Segment::Constant, 0));
      }
      TokenKind::Keyword(Keyword::This) => {
        self.stream.advance();
        self.emit(VmInstruction::Push(Segment::Pointer, 0));
      }
      TokenKind::Keyword(_) => {
        return Err(CompileError::at(
          self.stream.source,
          token.loc,
          format!("{} cannot start a term", describe_token(Some(&token))),
        ));
      }
      TokenKind::Symbol('(') => {
        self.stream.advance();
        self.compile_expression()?;
        self.stream.expect_symbol(')', "after parenthesised expression")?;
      }
      TokenKind::Symbol('-') => {
        self.stream.advance();
        self.compile_term()?;
        self.emit(VmInstruction::Arith(VmOp::Neg));
      }
      TokenKind::Symbol('~') => {
        self.stream.advance();
        self.compile_term()?;
        self.emit(VmInstruction::Arith(VmOp::Not));
      }
      TokenKind::Symbol(_) => {
        return Err(CompileError::at(
          self.stream.source,
          token.loc,
          format!("{} cannot start a term", describe_token(Some(&token))),
        ));
      }
      TokenKind::Identifier(name) => {
        self.stream.advance();
        // One token of lookahead splits array access, calls, and plain
        // variable references.
        if self.stream.eat_symbol('[') {
          let (segment, index) = self.resolve_var(&name, token.loc)?;
          self.compile_expression()?;
          self.stream.expect_symbol(']', "after array index")?;
          self.emit(VmInstruction::Push(segment, index));
          self.emit(VmInstruction::Arith(VmOp::Add));
          self.emit(VmInstruction::Pop(Segment::Pointer, 1));
          self.emit(VmInstruction::Push(Segment::That, 0));
        } else if self.stream.check_symbol('(') || self.stream.check_symbol('.') {
          self.compile_call(name)?;
        } else {
          let (segment, index) = self.resolve_var(&name, token.loc)?;
          self.emit(VmInstruction::Push(segment, index));
        }
      }
    }
    Ok(())
  }

  /// Subroutine call, `first` already consumed.
  ///
  /// `first.m(...)` dispatches on whether `first` names a variable: if so
  /// it becomes the implicit receiver and the target is its declared type;
  /// otherwise `first` is taken to be a class name, unvalidated. Plain
  /// `f(...)` is a method call on the current object.
  fn compile_call(&mut self, first: String) -> CompileResult<()> {
    let (callee, mut n_args) = if self.stream.eat_symbol('.') {
      let (method, _) = self.stream.expect_identifier("subroutine name after \".\"")?;
      let receiver = self
        .symbols
        .resolve(&first)
        .map(|s| (kind_segment(s.kind), s.index as i64, s.ty.clone()));
      match receiver {
        Some((segment, index, ty)) => {
          self.emit(VmInstruction::Push(segment, index));
          (format!("{ty}.{method}"), 1)
        }
        None => (format!("{first}.{method}"), 0),
      }
    } else {
      self.emit(VmInstruction::Push(Segment::Pointer, 0));
      (format!("{}.{first}", self.class_name), 1)
    };
    self.stream.expect_symbol('(', "before argument list")?;
    n_args += self.compile_expression_list()?;
    self.stream.expect_symbol(')', "after argument list")?;
    self.emit(VmInstruction::Call(callee, n_args));
    Ok(())
  }

  fn compile_expression_list(&mut self) -> CompileResult<usize> {
    if self.stream.check_symbol(')') {
      return Ok(0);
    }
    let mut count = 1;
    self.compile_expression()?;
    while self.stream.eat_symbol(',') {
      self.compile_expression()?;
      count += 1;
    }
    Ok(count)
  }

  fn resolve_var(&self, name: &str, loc: usize) -> CompileResult<(Segment, i64)> {
    match self.symbols.resolve(name) {
      Some(symbol) => Ok((kind_segment(symbol.kind), symbol.index as i64)),
      None => Err(CompileError::at(
        self.stream.source,
        loc,
        format!("unresolved variable \"{name}\""),
      )),
    }
  }
}

/// Lightweight cursor over the token vector.
struct TokenStream<'a> {
  tokens: Vec<Token>,
  source: &'a str,
  pos: usize,
}

impl<'a> TokenStream<'a> {
  fn new(tokens: Vec<Token>, source: &'a str) -> Self {
    Self {
      tokens,
      source,
      pos: 0,
    }
  }

  fn peek(&self) -> Option<&Token> {
    self.tokens.get(self.pos)
  }

  fn advance(&mut self) {
    self.pos += 1;
  }

  fn peek_symbol(&self) -> Option<char> {
    match self.peek().map(|t| &t.kind) {
      Some(TokenKind::Symbol(c)) => Some(*c),
      _ => None,
    }
  }

  fn check_symbol(&self, symbol: char) -> bool {
    self.peek_symbol() == Some(symbol)
  }

  /// Consume the current token if it is the given symbol.
  fn eat_symbol(&mut self, symbol: char) -> bool {
    if self.check_symbol(symbol) {
      self.pos += 1;
      return true;
    }
    false
  }

  fn check_keywords(&self, set: &[Keyword]) -> bool {
    match self.peek().map(|t| &t.kind) {
      Some(TokenKind::Keyword(kw)) => set.contains(kw),
      _ => false,
    }
  }

  fn eat_keyword(&mut self, keyword: Keyword) -> bool {
    if self.check_keywords(&[keyword]) {
      self.pos += 1;
      return true;
    }
    false
  }

  fn expect_symbol(&mut self, symbol: char, context: &str) -> CompileResult<()> {
    if self.eat_symbol(symbol) {
      Ok(())
    } else {
      Err(self.error_here(format!(
        "expected \"{symbol}\" {context}, but got {}",
        describe_token(self.peek())
      )))
    }
  }

  fn expect_keyword(&mut self, keyword: Keyword, context: &str) -> CompileResult<()> {
    if self.eat_keyword(keyword) {
      Ok(())
    } else {
      Err(self.error_here(format!(
        "expected \"{}\" {context}, but got {}",
        keyword.as_str(),
        describe_token(self.peek())
      )))
    }
  }

  /// Consume an identifier, returning its text and location.
  fn expect_identifier(&mut self, context: &str) -> CompileResult<(String, usize)> {
    if let Some(token) = self.peek()
      && let TokenKind::Identifier(name) = &token.kind
    {
      let result = (name.clone(), token.loc);
      self.pos += 1;
      return Ok(result);
    }
    Err(self.error_here(format!(
      "expected {context}, but got {}",
      describe_token(self.peek())
    )))
  }

  fn error_here(&self, message: impl Into<String>) -> CompileError {
    let loc = self.peek().map_or(self.source.len(), |t| t.loc);
    CompileError::at(self.source, loc, message)
  }
}
