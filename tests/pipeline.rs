//! End-to-end assertions on the textual interfaces of both stages.

use jackc::{assemble_program, compile_to_vm, translate_vm};

#[test]
fn minimal_class_produces_exact_ir() {
  let vm = compile_to_vm("class C { function void f(){ return; } }").unwrap();
  assert_eq!(vm, "function C.f 0\npush constant 0\nreturn\n");
}

#[test]
fn compiled_ir_feeds_the_translator_unchanged() {
  let vm = compile_to_vm("class C { function void f(){ return; } }").unwrap();
  let asm = translate_vm(&vm, "C").unwrap();
  assert!(asm.contains("(C.f)"));
  assert!(asm.contains("// push constant 0"));
}

#[test]
fn pipeline_output_is_reproducible() {
  let source = "class Main {
    static int tally;
    function void main() {
      var int i;
      let i = 0;
      while (i < 10) { let tally = tally + i; let i = i + 1; }
      return;
    }
  }";
  let vm_a = compile_to_vm(source).unwrap();
  let vm_b = compile_to_vm(source).unwrap();
  assert_eq!(vm_a, vm_b);
  let asm_a = translate_vm(&vm_a, "Main").unwrap();
  let asm_b = translate_vm(&vm_b, "Main").unwrap();
  assert_eq!(asm_a, asm_b);
}

#[test]
fn units_are_compiled_in_isolation() {
  // Same construct in two units: identical labels, identical code shape.
  let unit = |class: &str| {
    compile_to_vm(&format!(
      "class {class} {{ function void f(int x){{ while (x) {{ let x = 0; }} return; }} }}"
    ))
    .unwrap()
  };
  let a = unit("A");
  let b = unit("B");
  assert_eq!(a.replace("A.f", "B.f"), b);
}

#[test]
fn linked_program_concatenates_units_in_given_order() {
  let a = compile_to_vm("class A { function void f(){ return; } }").unwrap();
  let b = compile_to_vm("class B { function void f(){ return; } }").unwrap();
  let out = assemble_program(&[("A", &a), ("B", &b)]).unwrap();
  let pos_a = out.find("(A.f)").unwrap();
  let pos_b = out.find("(B.f)").unwrap();
  assert!(out.starts_with("// bootstrap"));
  assert!(pos_a < pos_b);
}

#[test]
fn structural_error_names_the_expected_construct() {
  let err = compile_to_vm("class Main { function void f() return; } }").unwrap_err();
  let message = err.to_string();
  assert!(message.contains("expected \"{\""), "got: {message}");
  assert!(message.contains('^'));
}

#[test]
fn parse_failure_reports_line_of_bad_vm_text() {
  let err = translate_vm("push constant 1\npush lobal 2\n", "M").unwrap_err();
  assert!(err.to_string().contains("line 2"));
  assert!(err.to_string().contains("lobal"));
}

#[test]
fn comment_heavy_source_compiles_clean() {
  let source = "// header\nclass C { /* docs\n spanning lines */ function void f(){ return; } // tail\n}";
  let vm = compile_to_vm(source).unwrap();
  assert_eq!(vm, "function C.f 0\npush constant 0\nreturn\n");
}
