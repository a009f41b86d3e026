use clap::{Parser, Subcommand};
use crossterm::style::Stylize;
use serde::Serialize;
use std::io::{stdin, stdout, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info};
use typeahead_core::core::index::{PrefixIndex, PrefixIndexStore};
use typeahead_core::{
    dictionary, logging, AutocompleteEngine, AutocompleteError, DictionaryEntry, EngineConfig, EngineCredentials,
    IndexBackend, KeyCustody, KeyPair, Opener, Result,
};

const DEFAULT_SNAPSHOT_PATH: &str = "typeahead.snapshot";

const STARTER_WORDS: [&str; 10] = ["cat", "car", "cart", "carbon", "case", "dog", "door", "dot", "dove", "data"];

/// Interactive front end for the typeahead engine. Holds the private
/// credential; the engine it drives only ever sees the public one.
#[derive(Parser, Debug)]
#[command(name = "typeahead", version, about)]
struct Args {
    /// Snapshot file, loaded at start and written on exit.
    #[arg(long, default_value = DEFAULT_SNAPSHOT_PATH)]
    snapshot: PathBuf,

    /// Private credential (hex). Generated on first run. Defaults to the snapshot path with a `.key` extension.
    #[arg(long)]
    key_file: Option<PathBuf>,

    /// Engine configuration in TOML.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the configured index backend (trie, ternary, ordered).
    #[arg(long)]
    backend: Option<IndexBackend>,

    /// Word list (.json entries or one word per line) merged in at start.
    #[arg(long)]
    dictionary: Option<PathBuf>,

    /// Number of suggestions to show.
    #[arg(short, long)]
    k: Option<usize>,

    /// Log level filter, e.g. `debug` or `typeahead_core=trace`. Overrides RUST_LOG.
    #[arg(long)]
    log_level: Option<String>,

    /// Print suggestion lists as JSON.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Time prefix collection on every backend over the loaded words.
    Compare {
        prefix: String,
        #[arg(long, default_value_t = 100)]
        repeats: u32,
    },
}

#[derive(Serialize)]
struct ShownSuggestion {
    word: String,
    frequency: u64,
}

fn main() {
    let args = Args::parse();
    logging::init(args.log_level.as_deref());
    if let Err(e) = run(args) {
        error!(error = %e, "fatal");
        eprintln!("[ERROR] {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_toml_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    let k = args.k.unwrap_or(config.default_k);

    let key_path = args.key_file.clone().unwrap_or_else(|| args.snapshot.with_extension("key"));
    let keys = KeyPair::load_or_generate(&key_path, &args.snapshot)?;
    let opener = Opener::new(keys.private().clone());
    let credentials = match config.custody {
        KeyCustody::Split => EngineCredentials::Split(keys.public()),
        KeyCustody::Shared => EngineCredentials::Shared(keys.clone()),
    };

    let mut engine = AutocompleteEngine::from_file_or_new(&args.snapshot, config, credentials)?;
    if let Some(path) = &args.dictionary {
        let added = engine.add_entries(dictionary::load(path)?)?;
        info!(path = %path.display(), added, "dictionary merged");
    }
    if engine.is_empty() {
        engine.add_entries(STARTER_WORDS.iter().map(|w| DictionaryEntry::new(*w)))?;
    }

    match args.command {
        Some(Command::Compare { prefix, repeats }) => compare(&engine, &prefix, repeats),
        None => {
            // Save even when the terminal went away mid-session.
            let session = repl(&mut engine, &opener, k, args.json);
            println!("\nSaving snapshot...");
            engine.save_snapshot()?;
            println!("Snapshot saved to '{}'", args.snapshot.display());
            session
        }
    }
}

/// Suggestions opened on the client side of the boundary. A payload that
/// will not open is reported next to the ones that did, never dropped silently.
struct Opened {
    shown: Vec<ShownSuggestion>,
    failures: Vec<(usize, AutocompleteError)>,
}

fn open_suggestions(engine: &AutocompleteEngine, opener: &Opener, prefix: &str, k: usize) -> Result<Opened> {
    let mut opened = Opened { shown: Vec::new(), failures: Vec::new() };
    for (rank, suggestion) in engine.suggest(prefix, k)?.into_iter().enumerate() {
        match opener.unwrap(&suggestion.payload) {
            Ok(word) => opened.shown.push(ShownSuggestion { word, frequency: suggestion.frequency }),
            Err(e) => opened.failures.push((rank + 1, e)),
        }
    }
    Ok(opened)
}

fn report_failures(failures: &[(usize, AutocompleteError)]) {
    for (rank, e) in failures {
        println!("{} suggestion #{rank} could not be opened: {e}", "error:".red());
    }
}

fn repl(engine: &mut AutocompleteEngine, opener: &Opener, k: usize, json: bool) -> Result<()> {
    println!("{}", "Typeahead engine. Type 'exit' to save and quit.".bold());
    println!("---------------------------------------------------------------");
    println!("Type a prefix to see suggestions, ':N' to pick one, '+word' to add a word, ':save' to save.");

    let mut prefix = String::new();
    let mut shown: Vec<ShownSuggestion> = Vec::new();

    loop {
        print!("\n> ");
        stdout().flush()?;
        let mut input = String::new();
        if stdin().read_line(&mut input)? == 0 {
            break;
        }
        let cmd = input.trim();

        match cmd {
            "exit" | "quit" => break,
            "" => continue,
            ":save" => match engine.save_snapshot() {
                Ok(()) => println!("{}", "Snapshot saved.".green()),
                Err(e) => println!("{} {e}", "error:".red()),
            },
            s if s.starts_with('+') => {
                let word = &s[1..];
                let credential = engine.public_credential();
                match engine.add_word(word, &credential) {
                    Ok(true) => println!("Added '{}'", word.green()),
                    Ok(false) => println!("'{word}' is already known"),
                    Err(e) => println!("{} {e}", "error:".red()),
                }
            }
            s if s.starts_with(':') && s.len() > 1 => {
                let Ok(n) = s[1..].parse::<usize>() else {
                    println!("{} unknown command '{s}'", "error:".red());
                    continue;
                };
                if n == 0 || n > shown.len() {
                    println!("{} no suggestion numbered {n}", "error:".red());
                    continue;
                }
                let chosen = shown[n - 1].word.clone();
                match engine.confirm_from(&prefix, &chosen) {
                    Ok(count) => println!("Committing: '{}' (selected {count} times)", chosen.green()),
                    Err(e) => println!("{} {e}", "error:".red()),
                }
            }
            s => {
                prefix = s.to_string();
                match open_suggestions(engine, opener, &prefix, k) {
                    Ok(opened) => {
                        print_suggestions(&prefix, &opened.shown, json);
                        report_failures(&opened.failures);
                        shown = opened.shown;
                    }
                    Err(e) => {
                        println!("{} {e}", "error:".red());
                        shown.clear();
                    }
                }
            }
        }
    }
    Ok(())
}

fn print_suggestions(prefix: &str, suggestions: &[ShownSuggestion], json: bool) {
    if json {
        match serde_json::to_string(suggestions) {
            Ok(line) => println!("{line}"),
            Err(e) => println!("{} {e}", "error:".red()),
        }
        return;
    }
    if suggestions.is_empty() {
        println!("No suggestions for '{prefix}'.");
        return;
    }
    println!("\nSuggestions for '{}':", prefix.bold());
    for (i, s) in suggestions.iter().enumerate() {
        println!("  :{}: {} {}", i + 1, s.word.as_str().cyan(), format!("(freq={})", s.frequency).dark_grey());
    }
}

fn compare(engine: &AutocompleteEngine, prefix: &str, repeats: u32) -> Result<()> {
    let words: Vec<String> = engine.words().cloned().collect();
    let repeats = repeats.max(1);
    println!("{} words, prefix '{}', {} runs each", words.len(), prefix, repeats);
    for backend in IndexBackend::ALL {
        let index = PrefixIndexStore::build(backend, &words);
        let started = Instant::now();
        let mut matches = 0;
        for _ in 0..repeats {
            matches = index.collect(prefix)?.len();
        }
        let per_run = started.elapsed() / repeats;
        println!("  {:<8} {:>6} matches  {:>10.1?} per collect", backend.name(), matches, per_run);
    }
    Ok(())
}
