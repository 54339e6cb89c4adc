//! REPL – interactive shell over one memory manager.
//!
//! Supported slash-commands:
//!   /remember <text> – buffer a short-term note
//!   /learn <text>    – store a long-term memory (persisted)
//!   /recall          – list short-term notes
//!   /recall-long     – list long-term memories
//!   /query <text>    – rank long-term memories by similarity
//!   /clear           – empty the short-term buffer
//!   /stats           – backend, strategy and sizes
//!   /config [save]   – show (or save) the active configuration
//!   /help            – show this list
//!   /quit | /exit    – leave the shell

use colored::Colorize;
use mnemos_memory::MemoryManager;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::{self, Config};

/// A parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Remember(String),
    Learn(String),
    Recall,
    RecallLong,
    Query(String),
    Clear,
    Stats,
    ShowConfig,
    SaveConfig,
    Help,
    Quit,
    Unknown(String),
    /// A known command given without its required text.
    MissingText(&'static str),
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((h, r)) => (h, r.trim()),
            None => (line, ""),
        };
        let with_text = |name: &'static str, build: fn(String) -> Command| {
            if rest.is_empty() {
                Command::MissingText(name)
            } else {
                build(rest.to_string())
            }
        };
        Some(match head {
            "/remember" => with_text("/remember", Command::Remember),
            "/learn" => with_text("/learn", Command::Learn),
            "/query" => with_text("/query", Command::Query),
            "/recall" => Command::Recall,
            "/recall-long" => Command::RecallLong,
            "/clear" => Command::Clear,
            "/stats" => Command::Stats,
            "/config" if rest == "save" => Command::SaveConfig,
            "/config" => Command::ShowConfig,
            "/help" => Command::Help,
            "/quit" | "/exit" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        })
    }
}

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(memory: &mut MemoryManager, cfg: &Config, shutdown: Arc<AtomicBool>) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "mnemos>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        let Some(cmd) = Command::parse(&line) else {
            continue;
        };
        if cmd == Command::Quit {
            println!("{}", "Goodbye.".green());
            shutdown.store(true, Ordering::SeqCst);
            break;
        }
        execute(memory, cfg, cmd);
    }
}

fn execute(memory: &mut MemoryManager, cfg: &Config, cmd: Command) {
    match cmd {
        Command::Remember(text) => {
            memory.remember(&text, false);
            println!("  {} short-term ({} buffered)", "✓".green(), memory.short_term_len());
        }
        Command::Learn(text) => {
            memory.remember(&text, true);
            println!("  {} long-term ({} stored)", "✓".green(), memory.len());
        }
        Command::Recall => print_list("Short-term", &memory.recall(false)),
        Command::RecallLong => print_list("Long-term", &memory.recall(true)),
        Command::Query(text) => cmd_query(memory, &text, cfg.top_k),
        Command::Clear => {
            memory.clear_short_term();
            println!("  {} short-term buffer cleared", "✓".green());
        }
        Command::Stats => cmd_stats(memory),
        Command::ShowConfig => cmd_show_config(cfg),
        Command::SaveConfig => match config::save(cfg) {
            Ok(()) => println!(
                "{} {}",
                "✓ Settings saved to".green(),
                config::config_path().display().to_string().bold()
            ),
            Err(e) => println!("{}: {}", "Error saving config".red(), e),
        },
        Command::Help => cmd_help(),
        Command::MissingText(name) => {
            println!("{} {} <text>", "Usage:".yellow(), name.bold());
        }
        Command::Unknown(other) => {
            println!(
                "{} '{}'. Type {} for available commands.",
                "Unknown command:".red(),
                other.yellow(),
                "/help".bold()
            );
        }
        Command::Quit => {}
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    println!();
    println!("{}", "Mnemos Commands".bold().underline());
    println!("  {} – buffer a short-term note", "/remember <text>".bold().cyan());
    println!("  {}    – store a long-term memory", "/learn <text>".bold().cyan());
    println!("  {}          – list short-term notes", "/recall".bold().cyan());
    println!("  {}     – list long-term memories", "/recall-long".bold().cyan());
    println!("  {}    – most similar long-term memories", "/query <text>".bold().cyan());
    println!("  {}           – empty the short-term buffer", "/clear".bold().cyan());
    println!("  {}           – index and store statistics", "/stats".bold().cyan());
    println!("  {}   – show or save the configuration", "/config [save]".bold().cyan());
    println!("  {}    – exit the CLI", "/quit  /exit".bold().cyan());
    println!();
}

fn cmd_query(memory: &MemoryManager, text: &str, top_k: usize) {
    let hits = memory.query(text, top_k);
    if hits.is_empty() {
        println!("  {}", "no long-term memories yet".dimmed());
        return;
    }
    for (rank, hit) in hits.iter().enumerate() {
        println!(
            "  {}. {} {}",
            rank + 1,
            format!("[{:.3}]", hit.score).yellow(),
            hit.text
        );
    }
}

fn cmd_stats(memory: &MemoryManager) {
    println!("{}", "Memory Statistics".bold().underline());
    println!("  Snapshot   : {}", memory.path().display().to_string().bold());
    println!("  Strategy   : {}", memory.strategy().to_string().yellow());
    println!("  Backend    : {}", memory.backend().to_string().yellow());
    println!("  Long-term  : {}", memory.len());
    println!("  Short-term : {}", memory.short_term_len());
    if let Some(size) = memory.vocabulary_size() {
        println!("  Vocabulary : {}", size);
    }
}

fn cmd_show_config(cfg: &Config) {
    println!("{}", "Configuration".bold().underline());
    println!("  top_k            : {}", cfg.top_k);
    println!("  path             : {}", cfg.memory.path.display());
    println!("  strategy         : {}", cfg.memory.strategy);
    println!("  hash_dimensions  : {}", cfg.memory.hash_dimensions);
    println!("  normalize_counts : {}", cfg.memory.normalize_counts);
    println!("  backend          : {}", cfg.memory.backend);
}

fn print_list(title: &str, items: &[String]) {
    println!("{} ({})", title.bold().underline(), items.len());
    for (i, item) in items.iter().enumerate() {
        println!("  {:>3}  {}", i + 1, item);
    }
}
