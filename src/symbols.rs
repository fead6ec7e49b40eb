//! Two-scope symbol table mapping names to storage locations.
//!
//! Class scope (statics and fields) persists for the whole compilation
//! unit; subroutine scope (arguments and locals) is cleared per subroutine
//! and shadows the class scope on lookup. Indices are dense per kind, in
//! declaration order. Redefinition silently overwrites the previous entry
//! while still advancing the kind counter – last write wins, a documented
//! leniency of the language.

use std::collections::HashMap;

/// Storage kind of a resolved name. Determines the VM segment a reference
/// lowers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
  Static,
  Field,
  Arg,
  Local,
}

impl VarKind {
  fn is_class_kind(self) -> bool {
    matches!(self, Self::Static | Self::Field)
  }
}

/// One resolved name: declared type, storage kind, index within the kind.
#[derive(Debug, Clone)]
pub struct Symbol {
  pub ty: String,
  pub kind: VarKind,
  pub index: usize,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
  class: HashMap<String, Symbol>,
  subroutine: HashMap<String, Symbol>,
  static_count: usize,
  field_count: usize,
  arg_count: usize,
  local_count: usize,
}

impl SymbolTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// Reset class scope and its counters at the start of a unit.
  pub fn start_class(&mut self) {
    self.class.clear();
    self.static_count = 0;
    self.field_count = 0;
  }

  /// Reset subroutine scope and its counters; indices restart at 0.
  pub fn start_subroutine(&mut self) {
    self.subroutine.clear();
    self.arg_count = 0;
    self.local_count = 0;
  }

  /// Insert `name` at the next free index of `kind`.
  pub fn define(&mut self, name: &str, ty: &str, kind: VarKind) {
    let index = self.count_of(kind);
    let symbol = Symbol {
      ty: ty.to_string(),
      kind,
      index,
    };
    let scope = if kind.is_class_kind() {
      &mut self.class
    } else {
      &mut self.subroutine
    };
    scope.insert(name.to_string(), symbol);
    match kind {
      VarKind::Static => self.static_count += 1,
      VarKind::Field => self.field_count += 1,
      VarKind::Arg => self.arg_count += 1,
      VarKind::Local => self.local_count += 1,
    }
  }

  /// Look `name` up, subroutine scope first so locals and arguments shadow
  /// fields of the same name.
  pub fn resolve(&self, name: &str) -> Option<&Symbol> {
    self.subroutine.get(name).or_else(|| self.class.get(name))
  }

  pub fn kind_of(&self, name: &str) -> Option<VarKind> {
    self.resolve(name).map(|s| s.kind)
  }

  pub fn type_of(&self, name: &str) -> Option<&str> {
    self.resolve(name).map(|s| s.ty.as_str())
  }

  pub fn index_of(&self, name: &str) -> Option<usize> {
    self.resolve(name).map(|s| s.index)
  }

  /// Number of names defined so far under `kind`, in the scope owning it.
  pub fn count_of(&self, kind: VarKind) -> usize {
    match kind {
      VarKind::Static => self.static_count,
      VarKind::Field => self.field_count,
      VarKind::Arg => self.arg_count,
      VarKind::Local => self.local_count,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn indices_are_dense_per_kind() {
    let mut table = SymbolTable::new();
    table.start_class();
    table.define("a", "int", VarKind::Field);
    table.define("s", "int", VarKind::Static);
    table.define("b", "int", VarKind::Field);
    assert_eq!(table.index_of("a"), Some(0));
    assert_eq!(table.index_of("b"), Some(1));
    assert_eq!(table.index_of("s"), Some(0));
    assert_eq!(table.count_of(VarKind::Field), 2);
    assert_eq!(table.count_of(VarKind::Static), 1);
  }

  #[test]
  fn subroutine_scope_shadows_class_scope() {
    let mut table = SymbolTable::new();
    table.start_class();
    table.define("x", "int", VarKind::Field);
    table.start_subroutine();
    table.define("x", "boolean", VarKind::Local);
    assert_eq!(table.kind_of("x"), Some(VarKind::Local));
    assert_eq!(table.type_of("x"), Some("boolean"));
  }

  #[test]
  fn start_subroutine_restarts_indices() {
    let mut table = SymbolTable::new();
    table.start_class();
    table.start_subroutine();
    table.define("a", "int", VarKind::Arg);
    table.define("v", "int", VarKind::Local);
    table.start_subroutine();
    table.define("w", "int", VarKind::Local);
    assert_eq!(table.index_of("w"), Some(0));
    assert_eq!(table.resolve("a").map(|s| s.index), None);
    assert_eq!(table.count_of(VarKind::Arg), 0);
  }

  #[test]
  fn class_scope_survives_subroutines() {
    let mut table = SymbolTable::new();
    table.start_class();
    table.define("f", "Point", VarKind::Field);
    table.start_subroutine();
    table.start_subroutine();
    assert_eq!(table.kind_of("f"), Some(VarKind::Field));
  }

  #[test]
  fn redefinition_overwrites_but_counter_advances() {
    let mut table = SymbolTable::new();
    table.start_class();
    table.start_subroutine();
    table.define("x", "int", VarKind::Local);
    table.define("x", "char", VarKind::Local);
    assert_eq!(table.index_of("x"), Some(1));
    assert_eq!(table.type_of("x"), Some("char"));
    assert_eq!(table.count_of(VarKind::Local), 2);
  }

  #[test]
  fn miss_resolves_to_none() {
    let table = SymbolTable::new();
    assert!(table.resolve("ghost").is_none());
    assert_eq!(table.kind_of("ghost"), None);
  }
}
