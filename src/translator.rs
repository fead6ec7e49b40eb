//! The back end: lower VM instructions into Hack assembly.
//!
//! The emitter appends text to one growing output buffer, never mutated
//! after a line is written. Per-unit state is the module tag (qualifies
//! static names so units sharing an output do not alias) and the current
//! function name (qualifies control-flow labels). Two counters keep
//! comparison branch labels and call-site return labels unique across the
//! whole output.
//!
//! Register conventions of the target machine: `SP` at RAM 0, `LCL` at 1,
//! `ARG` at 2, `THIS` at 3, `THAT` at 4, temp segment at 5..12, `R13`/`R14`
//! as translator scratch.

use crate::error::TranslateResult;
use crate::vm::{Segment, VmInstruction, VmOp, strip_line};

#[derive(Debug, Default)]
pub struct Translator {
  out: String,
  module: String,
  function: String,
  cmp_count: usize,
  ret_count: usize,
}

impl Translator {
  pub fn new() -> Self {
    Self {
      function: "Bootstrap".to_string(),
      ..Self::default()
    }
  }

  /// Set the tag qualifying `static` names for subsequent instructions.
  pub fn set_module(&mut self, module: &str) {
    self.module = module.to_string();
  }

  /// Emit the once-per-program preamble: point SP at the stack base, then
  /// enter the program through the ordinary call protocol.
  pub fn bootstrap(&mut self) {
    self.line("// bootstrap");
    self.line("@256");
    self.line("D=A");
    self.line("@SP");
    self.line("M=D");
    self.write_call("Sys.init", 0);
  }

  /// Lower already-parsed instructions, echoing each one as a comment.
  /// Infallible: validation happened at parse or compile time.
  pub fn translate(&mut self, instructions: &[VmInstruction]) {
    for instruction in instructions {
      self.line(&format!("// {instruction}"));
      self.write(instruction);
    }
  }

  /// Translate one unit's worth of VM text, appending to the output.
  pub fn translate_unit(&mut self, vm_text: &str) -> TranslateResult<()> {
    for (index, raw) in vm_text.lines().enumerate() {
      let Some(code) = strip_line(raw) else {
        continue;
      };
      let instruction = VmInstruction::parse(code, index + 1)?;
      self.line(&format!("// {code}"));
      self.write(&instruction);
    }
    Ok(())
  }

  /// Consume the translator, yielding the finished assembly text.
  pub fn finish(self) -> String {
    self.out
  }

  fn line(&mut self, text: &str) {
    self.out.push_str(text);
    self.out.push('\n');
  }

  fn write(&mut self, instruction: &VmInstruction) {
    match instruction {
      VmInstruction::Push(segment, index) => self.write_push(*segment, *index),
      VmInstruction::Pop(segment, index) => self.write_pop(*segment, *index),
      VmInstruction::Arith(op) => self.write_arith(*op),
      VmInstruction::Label(name) => {
        let qualified = self.qualify(name);
        self.line(&format!("({qualified})"));
      }
      VmInstruction::Goto(name) => {
        let qualified = self.qualify(name);
        self.line(&format!("@{qualified}"));
        self.line("0;JMP");
      }
      VmInstruction::IfGoto(name) => {
        let qualified = self.qualify(name);
        self.line("@SP");
        self.line("AM=M-1");
        self.line("D=M");
        self.line(&format!("@{qualified}"));
        self.line("D;JNE");
      }
      VmInstruction::Call(name, n_args) => self.write_call(name, *n_args),
      VmInstruction::Function(name, n_locals) => self.write_function(name, *n_locals),
      VmInstruction::Return => self.write_return(),
    }
  }

  /// Control-flow labels are scoped to the function being lowered.
  fn qualify(&self, label: &str) -> String {
    format!("{}${label}", self.function)
  }

  /// Push the value in D onto the stack.
  fn push_d(&mut self) {
    self.line("@SP");
    self.line("A=M");
    self.line("M=D");
    self.line("@SP");
    self.line("M=M+1");
  }

  /// Leave the segment slot's value (for push) or address (for pop) in D.
  fn segment_addr(&mut self, segment: Segment, index: i64, for_push: bool) {
    match segment {
      Segment::Constant => {
        self.line(&format!("@{index}"));
        self.line("D=A");
      }
      Segment::Static => {
        self.line(&format!("@{}.{index}", self.module));
        self.line(if for_push { "D=M" } else { "D=A" });
      }
      Segment::Temp => {
        self.line(&format!("@{}", 5 + index));
        self.line(if for_push { "D=M" } else { "D=A" });
      }
      Segment::Pointer => {
        self.line(&format!("@{}", 3 + index));
        self.line(if for_push { "D=M" } else { "D=A" });
      }
      Segment::Local | Segment::Argument | Segment::This | Segment::That => {
        let base = match segment {
          Segment::Local => "LCL",
          Segment::Argument => "ARG",
          Segment::This => "THIS",
          _ => "THAT",
        };
        self.line(&format!("@{base}"));
        self.line("D=M");
        self.line(&format!("@{index}"));
        if for_push {
          self.line("A=D+A");
          self.line("D=M");
        } else {
          self.line("D=D+A");
        }
      }
    }
  }

  fn write_push(&mut self, segment: Segment, index: i64) {
    self.segment_addr(segment, index, true);
    self.push_d();
  }

  fn write_pop(&mut self, segment: Segment, index: i64) {
    // Target address goes through R13 so D is free for the popped value.
    self.segment_addr(segment, index, false);
    self.line("@R13");
    self.line("M=D");
    self.line("@SP");
    self.line("AM=M-1");
    self.line("D=M");
    self.line("@R13");
    self.line("A=M");
    self.line("M=D");
  }

  fn write_arith(&mut self, op: VmOp) {
    match op {
      VmOp::Add | VmOp::Sub | VmOp::And | VmOp::Or => {
        self.line("@SP");
        self.line("AM=M-1");
        self.line("D=M");
        self.line("A=A-1");
        self.line(match op {
          VmOp::Add => "M=M+D",
          VmOp::Sub => "M=M-D",
          VmOp::And => "M=M&D",
          _ => "M=M|D",
        });
      }
      VmOp::Neg | VmOp::Not => {
        self.line("@SP");
        self.line("A=M-1");
        self.line(if op == VmOp::Neg { "M=-M" } else { "M=!M" });
      }
      VmOp::Eq | VmOp::Gt | VmOp::Lt => {
        // No boolean-valued compare on this machine: branch on the sign of
        // the difference and materialise 0 or -1 on the two paths.
        let l_true = format!("CMP_T_{}", self.cmp_count);
        let l_end = format!("CMP_E_{}", self.cmp_count);
        self.cmp_count += 1;
        self.line("@SP");
        self.line("AM=M-1");
        self.line("D=M");
        self.line("A=A-1");
        self.line("D=M-D");
        self.line(&format!("@{l_true}"));
        self.line(match op {
          VmOp::Eq => "D;JEQ",
          VmOp::Gt => "D;JGT",
          _ => "D;JLT",
        });
        self.line("@SP");
        self.line("A=M-1");
        self.line("M=0");
        self.line(&format!("@{l_end}"));
        self.line("0;JMP");
        self.line(&format!("({l_true})"));
        self.line("@SP");
        self.line("A=M-1");
        self.line("M=-1");
        self.line(&format!("({l_end})"));
      }
    }
  }

  fn write_function(&mut self, name: &str, n_locals: usize) {
    self.function = name.to_string();
    self.line(&format!("({name})"));
    // Locals must start at zero; the language guarantees it.
    for _ in 0..n_locals {
      self.line("@SP");
      self.line("A=M");
      self.line("M=0");
      self.line("@SP");
      self.line("M=M+1");
    }
  }

  fn write_call(&mut self, name: &str, n_args: usize) {
    let ret = format!("{}$RET.{}", self.function, self.ret_count);
    self.ret_count += 1;
    self.line(&format!("@{ret}"));
    self.line("D=A");
    self.push_d();
    for base in ["@LCL", "@ARG", "@THIS", "@THAT"] {
      self.line(base);
      self.line("D=M");
      self.push_d();
    }
    // ARG = SP - 5 - nArgs, LCL = SP, then transfer control.
    self.line("@SP");
    self.line("D=M");
    self.line("@5");
    self.line("D=D-A");
    self.line(&format!("@{n_args}"));
    self.line("D=D-A");
    self.line("@ARG");
    self.line("M=D");
    self.line("@SP");
    self.line("D=M");
    self.line("@LCL");
    self.line("M=D");
    self.line(&format!("@{name}"));
    self.line("0;JMP");
    self.line(&format!("({ret})"));
  }

  fn write_return(&mut self) {
    // Frame base in R13, return address in R14. The return address is read
    // before repositioning the return value: with zero arguments ARG[0]
    // and the saved return address occupy the same slot.
    self.line("@LCL");
    self.line("D=M");
    self.line("@R13");
    self.line("M=D");
    self.line("@5");
    self.line("A=D-A");
    self.line("D=M");
    self.line("@R14");
    self.line("M=D");
    // Return value lands at ARG[0]; SP comes to rest one past it.
    self.line("@SP");
    self.line("AM=M-1");
    self.line("D=M");
    self.line("@ARG");
    self.line("A=M");
    self.line("M=D");
    self.line("@ARG");
    self.line("D=M+1");
    self.line("@SP");
    self.line("M=D");
    // Restore the caller's bases walking down from the callee's frame base.
    for base in ["@THAT", "@THIS", "@ARG", "@LCL"] {
      self.line("@R13");
      self.line("AM=M-1");
      self.line("D=M");
      self.line(base);
      self.line("M=D");
    }
    self.line("@R14");
    self.line("A=M");
    self.line("0;JMP");
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn asm(vm: &str, module: &str) -> String {
    let mut translator = Translator::new();
    translator.set_module(module);
    translator.translate_unit(vm).unwrap();
    translator.finish()
  }

  #[test]
  fn push_constant_is_immediate() {
    let out = asm("push constant 7", "M");
    assert!(out.contains("@7\nD=A\n@SP\nA=M\nM=D\n@SP\nM=M+1\n"));
  }

  #[test]
  fn push_local_is_base_indirect() {
    let out = asm("push local 2", "M");
    assert!(out.contains("@LCL\nD=M\n@2\nA=D+A\nD=M\n"));
  }

  #[test]
  fn pop_argument_routes_address_through_r13() {
    let out = asm("pop argument 1", "M");
    assert!(out.contains("@ARG\nD=M\n@1\nD=D+A\n@R13\nM=D\n"));
    assert!(out.contains("@SP\nAM=M-1\nD=M\n@R13\nA=M\nM=D\n"));
  }

  #[test]
  fn static_names_carry_module_tag() {
    let first = asm("pop static 0", "Alpha");
    let second = asm("pop static 0", "Beta");
    assert!(first.contains("@Alpha.0"));
    assert!(second.contains("@Beta.0"));
    assert!(!first.contains("@Beta.0"));
  }

  #[test]
  fn temp_and_pointer_are_fixed_offsets() {
    let out = asm("push temp 3\npush pointer 1", "M");
    assert!(out.contains("@8\nD=M"));
    assert!(out.contains("@4\nD=M"));
  }

  #[test]
  fn comparison_mints_fresh_label_pair_each_time() {
    let out = asm("eq\nlt", "M");
    assert!(out.contains("(CMP_T_0)"));
    assert!(out.contains("(CMP_E_0)"));
    assert!(out.contains("(CMP_T_1)"));
    assert!(out.contains("D;JEQ"));
    assert!(out.contains("D;JLT"));
  }

  #[test]
  fn unary_ops_rewrite_top_of_stack_in_place() {
    let out = asm("neg", "M");
    assert!(out.contains("@SP\nA=M-1\nM=-M\n"));
    assert!(!out.contains("M=M+1"));
  }

  #[test]
  fn control_flow_labels_are_function_qualified() {
    let out = asm("function Main.loop 0\nlabel TOP\ngoto TOP\nif-goto TOP", "M");
    assert!(out.contains("(Main.loop$TOP)"));
    assert!(out.contains("@Main.loop$TOP\n0;JMP"));
    assert!(out.contains("@Main.loop$TOP\nD;JNE"));
  }

  #[test]
  fn function_prologue_zeroes_locals() {
    let out = asm("function Main.f 2", "M");
    let zeroed = out.matches("@SP\nA=M\nM=0\n@SP\nM=M+1\n").count();
    assert_eq!(zeroed, 2);
  }

  #[test]
  fn call_saves_frame_and_repositions_arg() {
    let out = asm("function Main.f 0\ncall Other.g 2", "M");
    assert!(out.contains("@Main.f$RET.0\nD=A\n"));
    let lcl = out.find("@LCL\nD=M\n@SP\nA=M\nM=D").unwrap();
    let arg = out.find("@ARG\nD=M\n@SP\nA=M\nM=D").unwrap();
    let this = out.find("@THIS\nD=M\n@SP\nA=M\nM=D").unwrap();
    let that = out.find("@THAT\nD=M\n@SP\nA=M\nM=D").unwrap();
    assert!(lcl < arg && arg < this && this < that);
    assert!(out.contains("@5\nD=D-A\n@2\nD=D-A\n@ARG\nM=D\n"));
    assert!(out.contains("@Other.g\n0;JMP\n(Main.f$RET.0)\n"));
  }

  #[test]
  fn return_restores_bases_in_reverse_order() {
    let out = asm("return", "M");
    let that = out.find("@THAT\nM=D").unwrap();
    let this = out.find("@THIS\nM=D").unwrap();
    let arg = out.find("@ARG\nA=M\nM=D").unwrap();
    let lcl_restore = out.rfind("@LCL\nM=D").unwrap();
    assert!(that < this && this < lcl_restore);
    assert!(arg < that);
    assert!(out.ends_with("@R14\nA=M\n0;JMP\n"));
  }

  #[test]
  fn bootstrap_initialises_sp_then_calls_entry() {
    let mut translator = Translator::new();
    translator.bootstrap();
    let out = translator.finish();
    assert!(out.contains("@256\nD=A\n@SP\nM=D\n"));
    assert!(out.contains("@Sys.init\n0;JMP\n"));
  }

  #[test]
  fn source_lines_are_echoed_as_comments() {
    let out = asm("push constant 1 // one", "M");
    assert!(out.contains("// push constant 1\n"));
  }

  #[test]
  fn malformed_input_is_fatal() {
    let mut translator = Translator::new();
    let err = translator.translate_unit("push constant 1\nfly away").unwrap_err();
    assert!(err.to_string().contains("line 2"));
  }

  #[test]
  fn call_return_labels_stay_unique_across_units() {
    let mut translator = Translator::new();
    translator.set_module("A");
    translator.translate_unit("function A.f 0\ncall X.y 0").unwrap();
    translator.set_module("B");
    translator.translate_unit("function B.f 0\ncall X.y 0").unwrap();
    let out = translator.finish();
    assert!(out.contains("(A.f$RET.0)"));
    assert!(out.contains("(B.f$RET.1)"));
  }
}
