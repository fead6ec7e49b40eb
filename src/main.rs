use std::env;
use std::fs;
use std::path::Path;
use std::process;

use jackc::{compile_to_vm, translate_vm};

/// Thin driver: `.jack` input prints VM text, `.vm` input prints assembly.
/// File discovery and output naming live outside the toolchain proper.
fn main() {
  let args: Vec<String> = env::args().collect();
  if args.len() != 2 {
    let program = args.first().map(String::as_str).unwrap_or("jackc");
    eprintln!("usage: {program} <file.jack | file.vm>");
    process::exit(1);
  }

  let path = Path::new(&args[1]);
  let source = match fs::read_to_string(path) {
    Ok(text) => text,
    Err(err) => {
      eprintln!("cannot read {}: {err}", path.display());
      process::exit(1);
    }
  };

  let extension = path.extension().and_then(|e| e.to_str());
  let result = match extension {
    Some("jack") => compile_to_vm(&source).map_err(|e| e.to_string()),
    Some("vm") => {
      let module = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Main");
      translate_vm(&source, module).map_err(|e| e.to_string())
    }
    _ => {
      eprintln!("unsupported input {}: expected .jack or .vm", path.display());
      process::exit(1);
    }
  };

  match result {
    Ok(output) => print!("{output}"),
    Err(message) => {
      eprintln!("{message}");
      process::exit(1);
    }
  }
}
