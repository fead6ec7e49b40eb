//! Crate root: wires together the two-stage toolchain.
//!
//! The stages are intentionally small and composable so they can be evolved
//! independently:
//! - `tokenizer` performs lexical analysis and produces a flat token stream.
//! - `symbols` resolves names to storage locations across two scopes.
//! - `compiler` consumes tokens and emits VM instructions in one pass.
//! - `vm` defines the instruction set and its stable one-line text form.
//! - `translator` lowers VM text into Hack assembly, calling convention
//!   included.
//! - `error` centralises reporting utilities shared by the other modules.
//!
//! The VM text produced by [`compile_to_vm`] is the interface between the
//! stages: it round-trips byte for byte and can be fed unchanged to
//! [`translate_vm`] or [`assemble_program`].

pub mod compiler;
pub mod error;
pub mod labels;
pub mod symbols;
pub mod tokenizer;
pub mod translator;
pub mod vm;

pub use error::{CompileError, CompileResult, TranslateError, TranslateResult};

use translator::Translator;

/// Compile one Jack compilation unit into VM text.
pub fn compile_to_vm(source: &str) -> CompileResult<String> {
  let instructions = compiler::compile(source)?;
  Ok(vm::render(&instructions))
}

/// Translate one unit of VM text into Hack assembly.
///
/// `module` is the tag qualifying static names; label counters start fresh,
/// so the output is deterministic for a given input. No bootstrap is
/// emitted – use [`assemble_program`] to link a runnable program.
pub fn translate_vm(vm_text: &str, module: &str) -> TranslateResult<String> {
  let mut translator = Translator::new();
  translator.set_module(module);
  translator.translate_unit(vm_text)?;
  Ok(translator.finish())
}

/// Compile one unit straight to Hack assembly, chaining both stages.
///
/// Equivalent to [`compile_to_vm`] followed by [`translate_vm`], without
/// re-parsing the intermediate text. No bootstrap is emitted.
pub fn compile_to_asm(source: &str, module: &str) -> CompileResult<String> {
  let instructions = compiler::compile(source)?;
  let mut translator = Translator::new();
  translator.set_module(module);
  translator.translate(&instructions);
  Ok(translator.finish())
}

/// Link whole-program assembly from `(module, vm_text)` units.
///
/// Emits the bootstrap (SP init plus a protocol call to `Sys.init`) once,
/// then each unit in the order given. One translator is shared so return
/// and comparison labels never collide across units; callers pass units in
/// a stable order to keep output reproducible.
pub fn assemble_program(units: &[(&str, &str)]) -> TranslateResult<String> {
  let mut translator = Translator::new();
  translator.bootstrap();
  for (module, vm_text) in units {
    translator.set_module(module);
    translator.translate_unit(vm_text)?;
  }
  Ok(translator.finish())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn vm_text_round_trips_through_parse() {
    let vm_text = compile_to_vm("class C { function void f(){ return; } }").unwrap();
    let reparsed: Vec<_> = vm_text
      .lines()
      .map(|l| vm::VmInstruction::parse(l, 1).unwrap().to_string())
      .collect();
    assert_eq!(reparsed.join("\n") + "\n", vm_text);
  }

  #[test]
  fn compilation_is_deterministic() {
    let source = "class C { function int f(int x){ if (x) { return 1; } return 2; } }";
    assert_eq!(compile_to_vm(source).unwrap(), compile_to_vm(source).unwrap());
  }

  #[test]
  fn compile_to_asm_matches_the_two_stage_route() {
    let source = "class C { function int f(){ return 3; } }";
    let two_stage = translate_vm(&compile_to_vm(source).unwrap(), "C").unwrap();
    assert_eq!(compile_to_asm(source, "C").unwrap(), two_stage);
  }

  #[test]
  fn assemble_program_starts_with_bootstrap() {
    let out = assemble_program(&[("Main", "function Main.main 0\npush constant 0\nreturn")])
      .unwrap();
    assert!(out.starts_with("// bootstrap\n@256\n"));
    assert!(out.contains("(Main.main)"));
  }
}
