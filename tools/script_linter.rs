/// Script Linter — validates narrative scripts and prints the report.
///
/// Usage: script_linter <file.ink|dir> [--json]
use narrative_script::core::validator::validate;
use narrative_script::schema::report::ValidationReport;
use std::path::{Path, PathBuf};
use std::process;

fn main() {
    narrative_script::init_tracing();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: script_linter <file.ink|dir> [--json]");
        process::exit(0);
    }

    let target = Path::new(&args[1]);
    let json = args[2..].iter().any(|a| a == "--json");

    let mut files = Vec::new();
    if target.is_file() {
        files.push(target.to_path_buf());
    } else if target.is_dir() {
        collect_scripts(target, &mut files);
        files.sort();
    } else {
        eprintln!("ERROR: Path '{}' does not exist", target.display());
        process::exit(1);
    }

    let mut failed = 0;
    for path in &files {
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("ERROR: Failed to read {}: {}", path.display(), e);
                failed += 1;
                continue;
            }
        };
        let report = validate(&source);
        if !report.is_ok() {
            failed += 1;
        }
        if json {
            match report.to_json() {
                Ok(out) => println!("{}", out),
                Err(e) => {
                    eprintln!("ERROR: Failed to serialise report: {}", e);
                    process::exit(1);
                }
            }
        } else {
            print_report(path, &report);
        }
    }

    if failed > 0 {
        process::exit(1);
    }
}

fn collect_scripts(dir: &Path, files: &mut Vec<PathBuf>) {
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                collect_scripts(&path, files);
            } else if path.extension().and_then(|s| s.to_str()) == Some("ink") {
                files.push(path);
            }
        }
    }
}

fn print_report(path: &Path, report: &ValidationReport) {
    println!("\n=== {} ===\n", path.display());

    if report.errors.is_empty() && report.warnings.is_empty() {
        println!("All checks passed!");
    }
    for info in &report.infos {
        println!("INFO: {}", info);
    }
    for warning in &report.warnings {
        println!("WARNING: {}", warning);
    }
    for error in &report.errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nKnots: {}\nStitches: {}\nVars: {}\nExternals: {}\nLists: {}",
        report.knots.join(", "),
        report.stitches.join(", "),
        report.vars.join(", "),
        report.externals.join(", "),
        report.lists.join(", ")
    );
    println!(
        "Summary: {} errors, {} warnings",
        report.errors.len(),
        report.warnings.len()
    );
}
