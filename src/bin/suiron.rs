//! suiron CLI - a Prolog-style inference engine.
//!
//! Usage:
//! - `suiron <rules-file>` - load a rule file and start the query shell
//! - `suiron --help` - show usage
//!
//! The shell prompts with `?-`. Enter a goal to query the knowledge
//! base; press Enter to see the next solution; enter an empty line to
//! exit.

use std::io;
use std::process::ExitCode;
use suiron::repl::Repl;

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        None => {
            eprintln!("Missing rule file.");
            print_help();
            ExitCode::FAILURE
        }
        Some("--help") | Some("-h") | Some("help") => {
            print_help();
            ExitCode::SUCCESS
        }
        Some(filename) => run_shell(filename),
    }
}

fn print_help() {
    println!("suiron - Prolog-style logic inference engine\n");
    println!("Usage:");
    println!("  suiron <rules-file>    Load rules and start the query shell");
    println!("  suiron --help          Show this help\n");
    println!("In the shell, enter a goal such as:");
    println!("  ?- ancestor(Charles, $Y)");
    println!("Press Enter for the next solution; an empty query exits.");
}

fn run_shell(filename: &str) -> ExitCode {
    let text = match std::fs::read_to_string(filename) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("Cannot read {}: {}", filename, err);
            return ExitCode::FAILURE;
        }
    };

    let mut repl = Repl::new();
    if let Err(err) = repl.load_text(&text) {
        eprintln!("Error loading {}: {}", filename, err);
        return ExitCode::FAILURE;
    }
    println!("Loaded {} rules from {}.", repl.kb().len(), filename);

    let stdin = io::stdin();
    let mut input = stdin.lock();
    match repl.run(&mut input, io::stdout()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
