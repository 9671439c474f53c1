// FILE: src/cli/handlers.rs
use crate::{
    cli::OutputFormat,
    core::constants::WATCH_DEBOUNCE_MS,
    CompilationStats, CompilerError, Project, ProjectOptions, Result,
};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::time::Duration;

// --- COMPILE ---
pub fn handle_compile_command(options: ProjectOptions, matches: &clap::ArgMatches) -> Result<()> {
    println!("🔨 Compiling {} -> {}", options.input.display(), options.output.display());

    let mut project = Project::new(options)?;
    let stats = project.compile()?;
    project.reset()?;

    println!("✅ Compilation successful!");
    println!("   Files: {} written, {} hidden", stats.files_written, stats.files_hidden);
    println!("   Output: {} bytes", stats.output_size);
    println!("   Time: {}ms", stats.compile_time_ms);

    if matches.get_flag("stats") {
        match matches.get_one::<OutputFormat>("format") {
            Some(OutputFormat::Json) => {
                let json = serde_json::to_string_pretty(&stats).map_err(std::io::Error::from)?;
                println!("{}", json);
            }
            _ => print_detailed_stats(&stats),
        }
    }

    Ok(())
}

// --- WATCH ---
pub fn handle_watch_command(options: ProjectOptions) -> Result<()> {
    let mut project = Project::new(options)?;
    let input = project.input_dir().to_path_buf();
    let output = project.output_dir().to_path_buf();

    println!("👀 Watching {} for changes...", input.display());

    let (tx, rx) = channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(e) = tx.send(event) {
                    eprintln!("Watch error: {}", e);
                }
            }
            Err(e) => log::warn!("Watcher reported an error: {}", e),
        },
        notify::Config::default(),
    )
    .map_err(|e| CompilerError::Watch {
        message: format!("Failed to create file watcher: {}", e),
    })?;

    run_watch_pass(&mut project, "Initial compilation");

    watcher
        .watch(&input, RecursiveMode::Recursive)
        .map_err(|e| CompilerError::Watch {
            message: format!("Failed to watch {}: {}", input.display(), e),
        })?;

    let quiet = Duration::from_millis(WATCH_DEBOUNCE_MS);
    loop {
        let event = rx.recv().map_err(|e| CompilerError::Watch {
            message: format!("Watcher channel closed: {}", e),
        })?;
        if !is_relevant(&event, &output) {
            continue;
        }
        let coalesced = drain_burst(&rx, quiet, &output);
        log::debug!("Change detected ({} further events coalesced)", coalesced);
        println!("🔄 Change detected, recompiling...");
        run_watch_pass(&mut project, "Recompilation");
    }
}

/// One pass in watch mode. Failures are reported and the watcher keeps
/// running; every pass is followed by a reset.
fn run_watch_pass(project: &mut Project, label: &str) {
    match project.compile() {
        Ok(stats) => println!(
            "✅ {} successful ({} files, {} bytes, {}ms)",
            label, stats.files_written, stats.output_size, stats.compile_time_ms
        ),
        Err(e) => eprintln!("❌ {} failed: {}", label, e),
    }
    if let Err(e) = project.reset() {
        eprintln!("❌ Reset failed: {}", e);
    }
}

/// Events that should trigger a pass: anything but plain reads, touching at
/// least one path outside the output root.
fn is_relevant(event: &Event, output: &Path) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }
    event.paths.is_empty() || event.paths.iter().any(|path| !path.starts_with(output))
}

/// Swallow events until the channel stays quiet for `quiet`. Returns the
/// number of relevant events coalesced.
fn drain_burst(rx: &Receiver<Event>, quiet: Duration, output: &Path) -> usize {
    let mut coalesced = 0;
    loop {
        match rx.recv_timeout(quiet) {
            Ok(event) => {
                if is_relevant(&event, output) {
                    coalesced += 1;
                }
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => return coalesced,
        }
    }
}

// --- HELPERS ---
fn print_detailed_stats(stats: &CompilationStats) {
    println!("\n📊 Detailed Compilation Statistics:");
    println!("   Files discovered: {}", stats.files_discovered);
    println!("   Files written: {}", stats.files_written);
    println!("   Files hidden: {}", stats.files_hidden);
    println!("   Directives: {}", stats.directive_count);
    println!("   Dependencies spliced: {}", stats.dependency_edges);
    println!("   Output size: {} bytes", stats.output_size);
    println!("   Compile time: {}ms", stats.compile_time_ms);
}
