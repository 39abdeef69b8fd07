//! `lit-walk` command line entry point.

mod picker;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use litwalk_core::{
    default_config_path, init_logging, open_db, pick_article, Article, ArticleRepository,
    CommandEditor, Config, EventKind, EventRepository, IngestService, NoteSession, QueryService,
    SqliteArticleRepository, SqliteEventRepository, WalkService,
};
use log::{info, warn};
use picker::TerminalPicker;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "lit-walk")]
#[command(version)]
#[command(about = "Take random walks through your research literature", long_about = None)]
struct Cli {
    /// Config file; created with defaults when missing.
    #[arg(short, long, value_name = "FILE", env = "LIT_WALK_CONFIG")]
    config: Option<PathBuf>,

    /// Echo informational log lines to stderr.
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import articles from a BibTeX file
    Add {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    /// Show collection statistics
    Info,

    /// Print one random article, optionally among those matching QUERY
    Walk {
        #[arg(value_name = "QUERY")]
        query: Option<String>,
    },

    /// Pick an article and open its note in an editor
    Notes {
        /// Only offer articles that already have a note
        #[arg(long)]
        existing_only: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref(), cli.verbose)?;

    match cli.command {
        Commands::Add { path } => add(&config, &path),
        Commands::Info => show_info(&config),
        Commands::Walk { query } => walk(&config, query.as_deref()),
        Commands::Notes { existing_only } => notes(&config, existing_only),
    }
}

fn load_config(explicit: Option<&Path>, verbose: bool) -> Result<Config> {
    let path = match explicit {
        Some(path) if path.is_relative() => std::env::current_dir()
            .context("failed to resolve the working directory")?
            .join(path),
        Some(path) => path.to_path_buf(),
        None => default_config_path(),
    };

    let loaded = Config::load_or_create(&path)
        .context("fix the config file or delete it to regenerate defaults")?;
    let config = loaded.config;

    let logging = init_logging(&config.log_level, &config.log_dir, verbose);
    if let Err(err) = &logging {
        eprintln!("[WARN] file logging disabled: {err}");
    }
    for warning in &loaded.warnings {
        if logging.is_ok() {
            warn!("event=config_load module=cli status=error message={warning}");
        } else {
            eprintln!("[WARN] {warning}");
        }
    }
    if loaded.created {
        println!("Created default config at {}", loaded.path.display());
    }
    info!(
        "event=config_load module=cli status=ok path={}",
        loaded.path.display()
    );
    Ok(config)
}

fn add(config: &Config, path: &Path) -> Result<()> {
    println!("Scanning {} for new entries...", path.display());

    let mut conn = open_db(&config.db_path).context("failed to open the article store")?;
    let summary = IngestService::new(&mut conn, config.parse_options())
        .add(path)
        .with_context(|| format!("failed to import `{}`", path.display()))?;

    println!(
        "Added {} new, updated {}, unchanged {} ({} skipped, {} duplicates)",
        summary.added, summary.updated, summary.unchanged, summary.skipped, summary.duplicates
    );
    Ok(())
}

fn show_info(config: &Config) -> Result<()> {
    let conn = open_db(&config.db_path).context("failed to open the article store")?;
    let stats = SqliteArticleRepository::new(&conn)
        .stats()
        .context("failed to read collection statistics")?;
    let walks = SqliteEventRepository::new(&conn)
        .count_events(Some(EventKind::Walked))
        .context("failed to count walks")?;

    println!("# Articles: {}", stats.articles);
    println!("Incomplete metadata:");
    println!("- Missing \"DOI\": {}", stats.missing_doi);
    println!("- Missing \"abstract\": {}", stats.missing_abstract);
    println!("- Missing \"keywords\": {}", stats.missing_keywords);
    println!("# Walks: {walks}");
    println!("Store: {}", config.db_path.display());
    Ok(())
}

fn walk(config: &Config, query: Option<&str>) -> Result<()> {
    let conn = open_db(&config.db_path).context("failed to open the article store")?;
    let service = WalkService::new(
        SqliteArticleRepository::new(&conn),
        SqliteEventRepository::new(&conn),
    );

    let result = match query {
        Some(query) => service.walk_filtered(query),
        None => service.walk(),
    }?;

    if query.is_some_and(|q| !q.trim().is_empty()) {
        println!(
            "Including {}/{} articles...",
            result.num_included, result.num_total
        );
    }
    print_article(&result.article);
    Ok(())
}

fn print_article(article: &Article) {
    let year = article
        .year
        .map(|year| year.to_string())
        .unwrap_or_else(|| "n.d.".to_string());
    println!("{} ({year})", article.title);
    println!("{}", article.author_line());
    if let Some(abstract_text) = &article.abstract_text {
        println!();
        println!("  {abstract_text}");
        println!();
    }
    println!(" - url: {}", article.url.as_deref().unwrap_or("-"));
    println!(" - doi: {}", article.doi.as_deref().unwrap_or("-"));
}

fn notes(config: &Config, existing_only: bool) -> Result<()> {
    let conn = open_db(&config.db_path).context("failed to open the article store")?;
    let session = NoteSession::new(&config.notes_dir);
    let service = QueryService::new(SqliteArticleRepository::new(&conn), &session);

    let mut picker = TerminalPicker;
    let Some(article) = pick_article(&service, &mut picker, existing_only)
        .context("article selection failed")?
    else {
        println!("No article selected.");
        return Ok(());
    };

    let editor = CommandEditor::resolve(config.editor.as_deref());
    let note = session
        .open_note(&article, &editor)
        .with_context(|| format!("failed to edit notes for `{}`", article.id))?;
    println!("Notes saved at {}", note.path.display());
    Ok(())
}
