/// Coffee shop example — validates, compiles and plays a short script.
///
/// Picks the first option at every choice until the story ends.
///
/// Run with: cargo run --example coffee_shop

use narrative_script::core::compiler::compile;
use narrative_script::core::runtime::{Outcome, Session, SessionEvent};
use narrative_script::core::validator::validate;

fn main() {
    narrative_script::init_tracing();

    let source = std::fs::read_to_string("scripts/coffee_shop.ink")
        .expect("Failed to read coffee shop script");

    // --- Validate ---
    let report = validate(&source);
    println!(
        "Validated: {} knots, {} stitches, {} errors",
        report.knots.len(),
        report.stitches.len(),
        report.errors.len()
    );
    for error in &report.errors {
        println!("  {}", error);
    }

    // --- Compile ---
    let ir = compile(&source);
    println!("Compiled {} steps\n", ir.steps.len());

    // --- Play ---
    let mut session = Session::builder(ir).build();
    let mut turn = session.start().expect("Failed to start session");

    loop {
        for event in &turn.events {
            match event {
                SessionEvent::Passage { speaker: Some(who), text, .. } => println!("{}: {}", who, text),
                SessionEvent::Passage { text, .. } => println!("{}", text),
                SessionEvent::Chose { label, .. } => println!("  > {}", label),
                SessionEvent::ExternalCall { name, args } => println!("  [{}({})]", name, args),
                _ => {}
            }
        }

        match &turn.outcome {
            Outcome::Choices(options) => {
                for option in options {
                    println!("  {}. {}", option.index + 1, option.label);
                }
                turn = session.choose(0).expect("Failed to choose");
            }
            other => {
                println!("\n{:?}", other);
                break;
            }
        }
    }

    println!("Coins left: {:?}", session.var("coins"));
}
