//! Transcend Binary

use std::process;
use transcend::cli::Cli;

fn main() {
    if let Err(e) = Cli::new().run() {
        eprintln!("❌ {}", e);
        process::exit(1);
    }
}
