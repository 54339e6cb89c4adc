//! `mnemos-cli` – interactive shell for the Mnemos memory store.
//!
//! 1. Initialises structured logging.
//! 2. Loads `~/.mnemos/config.toml` (defaults when absent) and applies
//!    `MNEMOS_*` environment overrides.
//! 3. Opens the memory snapshot and drops the user into a REPL with
//!    slash-commands (`/learn`, `/query`, `/recall`, `/help`, …).
//! 4. Intercepts **Ctrl-C** to leave the REPL cleanly.

mod config;
mod repl;

use colored::Colorize;
use mnemos_memory::MemoryManager;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG sets the filter (default "info"); MNEMOS_LOG_FORMAT=json
    // switches to newline-delimited JSON.  User-facing output stays on
    // println!.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("MNEMOS_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }

    print_banner();

    // ── Shutdown flag ─────────────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – leaving Mnemos …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; use /quit to exit");
    }

    // ── Configuration ─────────────────────────────────────────────────────
    let (cfg, load_error) = config::load_or_default();
    match load_error {
        Some(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
        }
        None => println!(
            "  Config: {}",
            config::config_path().display().to_string().bold()
        ),
    }

    // ── Memory ────────────────────────────────────────────────────────────
    let mut memory = MemoryManager::open(&cfg.memory);
    println!(
        "  Memory: {} ({} long-term, {} strategy, {} index)",
        memory.path().display().to_string().bold(),
        memory.len(),
        memory.strategy().to_string().yellow(),
        memory.backend().to_string().yellow()
    );

    println!();
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    repl::run(&mut memory, &cfg, shutdown);
}

fn print_banner() {
    println!();
    println!(
        "  {} {}",
        "Mnemos".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Semantic memory for autonomous agents");
    println!();
}
