/// Script Compiler — compiles a narrative script to IR JSON.
///
/// Usage: script_compiler --input <file.ink> [--output <file.json>] [--strict]
use narrative_script::core::compiler::compile;
use narrative_script::core::validator::validate;
use std::env;
use std::process;

const USAGE: &str = "Usage: script_compiler --input <file.ink> [--output <file.json>] [--strict]";

fn main() {
    narrative_script::init_tracing();
    let args: Vec<String> = env::args().collect();

    let mut input = None;
    let mut output = None;
    let mut strict = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--input" if i + 1 < args.len() => {
                i += 1;
                input = Some(args[i].clone());
            }
            "--output" if i + 1 < args.len() => {
                i += 1;
                output = Some(args[i].clone());
            }
            "--strict" => strict = true,
            "--help" | "-h" => {
                println!("{}", USAGE);
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                eprintln!("{}", USAGE);
                process::exit(1);
            }
        }
        i += 1;
    }

    let input_path = input.unwrap_or_else(|| {
        eprintln!("Error: --input is required");
        eprintln!("{}", USAGE);
        process::exit(1);
    });

    let source = std::fs::read_to_string(&input_path).unwrap_or_else(|e| {
        eprintln!("Error reading input file '{}': {}", input_path, e);
        process::exit(1);
    });

    if strict {
        let report = validate(&source);
        if !report.is_ok() {
            for error in &report.errors {
                eprintln!("ERROR: {}", error);
            }
            process::exit(1);
        }
    }

    let ir = compile(&source);
    let json = ir.to_json().unwrap_or_else(|e| {
        eprintln!("Error serialising IR: {}", e);
        process::exit(1);
    });

    match output {
        Some(path) => {
            std::fs::write(&path, json).unwrap_or_else(|e| {
                eprintln!("Error writing '{}': {}", path, e);
                process::exit(1);
            });
            eprintln!("Compiled {} steps to '{}'", ir.steps.len(), path);
        }
        None => println!("{}", json),
    }
}
