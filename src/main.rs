use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use tagvault::naming::display_name;
use tagvault::{TagTree, Vault, VaultConfig, VaultError};

#[derive(Debug, Parser)]
#[command(
    name = "tagvault",
    version,
    about = "Tag hierarchy indexes and backlinks for a flat markdown vault"
)]
struct Cli {
    /// Vault directory holding the notes
    #[arg(long, short = 'v', default_value = ".")]
    vault: PathBuf,

    /// Config file (defaults to <vault>/.tagvault/config.json when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print reports as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write one index document per tag plus the home document
    Index,
    /// Reconcile backlink lines in every note
    Backlinks,
    /// List notes whose backlinks are out of sync without writing
    Check,
    /// Index, then reconcile backlinks
    All,
    /// Print the tag hierarchy
    Tree,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            log::error!("[main] {}", e);
            eprintln!("error: {}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode, VaultError> {
    let config = VaultConfig::load(&cli.vault, cli.config.as_deref())?;
    let vault = Vault::open(config);

    match cli.command {
        Commands::Index => {
            let report = vault.build_indexes()?;
            emit(cli.json, &report, &report);
            Ok(exit_for(report.errors.is_empty()))
        }
        Commands::Backlinks => {
            let report = vault.sync_backlinks()?;
            emit(cli.json, &report, &report);
            Ok(exit_for(report.errors.is_empty()))
        }
        Commands::Check => {
            let report = vault.check_backlinks()?;
            emit(cli.json, &report, &report);
            Ok(exit_for(report.pending.is_empty() && report.errors.is_empty()))
        }
        Commands::All => {
            let report = vault.run_all()?;
            if cli.json {
                print_json(&report);
            } else {
                print!("{}{}", report.index, report.backlinks);
            }
            Ok(exit_for(report.index.errors.is_empty() && report.backlinks.errors.is_empty()))
        }
        Commands::Tree => {
            let tree = vault.tree()?;
            if cli.json {
                print_json(&tree);
            } else {
                for root in tree.root_tags() {
                    print_subtree(&tree, root, 0);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_subtree(tree: &TagTree, tag: &str, depth: usize) {
    let files = tree.node(tag).map(|node| node.files.len()).unwrap_or(0);
    println!("{}{} ({} notes)", "  ".repeat(depth), display_name(tag), files);
    for child in tree.child_paths(tag) {
        print_subtree(tree, &child, depth + 1);
    }
}

fn emit<T: Serialize>(json: bool, value: &T, text: &dyn std::fmt::Display) {
    if json {
        print_json(value);
    } else {
        print!("{}", text);
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => log::error!("[main] Failed to serialize report: {}", e),
    }
}

fn exit_for(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
