/// Preview — plays a narrative script in the terminal.
///
/// Usage: preview <file.ink|file.json> [--config <engine.ron>] [--auto] [--seed <n>]
///
/// Commands while a choice is open:
///   <n>      — pick option n
///   vars     — show variables
///   history  — show visited steps
///   help     — list commands
///   quit     — exit

use narrative_script::core::compiler::compile;
use narrative_script::core::config::EngineConfig;
use narrative_script::core::runtime::{Outcome, Session, SessionEvent, Turn};
use narrative_script::core::validator::validate;
use narrative_script::schema::ir::ScriptIr;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process;

fn main() {
    narrative_script::init_tracing();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let script_path = args[1].clone();
    let mut config_path = None;
    let mut auto = false;
    let mut seed: u64 = 42;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().unwrap_or(42);
            }
            "--auto" => auto = true,
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    let config = match config_path {
        Some(path) => EngineConfig::load_from_ron(Path::new(&path)).unwrap_or_else(|e| {
            eprintln!("ERROR: Failed to load config '{}': {}", path, e);
            process::exit(1);
        }),
        None => EngineConfig::default(),
    };

    let ir = load_script(Path::new(&script_path));
    println!("Loaded {} steps from '{}'", ir.steps.len(), script_path);

    let mut session = Session::builder(ir).config(config).build();
    let mut turn = match session.start() {
        Ok(turn) => turn,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    };

    let mut rng = StdRng::seed_from_u64(seed);
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    print_turn(&turn);
    loop {
        let count = turn.choices().len();
        if count == 0 {
            break;
        }

        let index = if auto {
            let pick = rng.gen_range(0..count);
            println!("> {}", pick + 1);
            pick
        } else {
            print!("choice> ");
            stdout.flush().ok();

            let mut line = String::new();
            if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
                break;
            }
            match line.trim() {
                "quit" | "exit" | "q" => break,
                "vars" => {
                    for (name, value) in session.vars() {
                        println!("  {} = {}", name, value);
                    }
                    continue;
                }
                "history" => {
                    println!("  {}", session.history().join(" -> "));
                    continue;
                }
                "help" => {
                    print_help();
                    continue;
                }
                other => match other.parse::<usize>() {
                    Ok(n) if (1..=count).contains(&n) => n - 1,
                    _ => {
                        println!("Pick a number between 1 and {}, or 'help'.", count);
                        continue;
                    }
                },
            }
        };

        turn = match session.choose(index) {
            Ok(turn) => turn,
            Err(e) => {
                eprintln!("ERROR: {}", e);
                break;
            }
        };
        print_turn(&turn);
    }

    println!("\nState: {:?}", session.state());
}

/// Compile `.ink` sources, load anything else as IR JSON.
fn load_script(path: &Path) -> ScriptIr {
    if path.extension().and_then(|s| s.to_str()) == Some("json") {
        return ScriptIr::load(path).unwrap_or_else(|e| {
            eprintln!("ERROR: Failed to load IR '{}': {}", path.display(), e);
            process::exit(1);
        });
    }

    let source = std::fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("ERROR: Failed to read '{}': {}", path.display(), e);
        process::exit(1);
    });
    let report = validate(&source);
    for warning in &report.warnings {
        eprintln!("WARNING: {}", warning);
    }
    for error in &report.errors {
        eprintln!("ERROR: {}", error);
    }
    compile(&source)
}

fn print_turn(turn: &Turn) {
    for event in &turn.events {
        match event {
            SessionEvent::Passage { speaker, text, .. } => match speaker {
                Some(speaker) => println!("\n{}: {}", speaker, text),
                None => println!("\n{}", text),
            },
            SessionEvent::ExternalCall { name, args } => println!("  [call {}({})]", name, args),
            SessionEvent::ActionSkipped { action, reason } => {
                println!("  [skipped ~ {}: {}]", action, reason)
            }
            SessionEvent::Chose { .. } | SessionEvent::Assigned { .. } => {}
        }
    }

    match &turn.outcome {
        Outcome::Choices(options) => {
            println!();
            for option in options {
                println!("  {}. {}", option.index + 1, option.label);
            }
        }
        Outcome::Ended => println!("\n-- THE END --"),
        Outcome::Stuck(step) => println!("\n-- stuck at '{}' --", step),
        Outcome::Fault(fault) => println!("\n-- fault: {} --", fault),
    }
}

fn print_usage() {
    println!("Usage: preview <file.ink|file.json> [--config <engine.ron>] [--auto] [--seed <n>]");
}

fn print_help() {
    println!("  <n>      pick option n");
    println!("  vars     show variables");
    println!("  history  show visited steps");
    println!("  quit     exit");
}
