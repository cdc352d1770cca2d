use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use java_cleanup::config::{load_from_path, parse_assignment, suggest, LoadedConfig};
use java_cleanup::workspace::{discover_java_files, guarded_write};
use java_cleanup::{
    CleanUpResult, Diagnostics, Engine, Options, RuleDescriptor, SchedulerState, Severity,
    WorkspaceGuard,
};
use rayon::prelude::*;
use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Configuration picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG: &str = "java-cleanup.toml";

#[derive(Parser)]
#[command(name = "java-cleanup")]
#[command(about = "Batch clean-up rewrites for Java sources", long_about = None)]
#[command(version)]
struct Cli {
    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    /// More logging (-v info, -vv debug, -vvv trace); RUST_LOG wins when unset
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Args)]
struct RunArgs {
    /// Files or directories to clean up (default: current directory)
    paths: Vec<PathBuf>,

    /// Clean-up configuration file (default: ./java-cleanup.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable a rule by id; repeatable
    #[arg(short, long = "enable", value_name = "ID")]
    enable: Vec<String>,

    /// Set an option, e.g. `engine.max_passes=5`; repeatable
    #[arg(short, long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite files in place
    Apply {
        #[command(flatten)]
        run: RunArgs,

        /// Dry run - show what would change without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Report files that would change; exits 1 if any would
    Check {
        #[command(flatten)]
        run: RunArgs,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// List available rules and their options
    Rules {
        /// Include `[[template]]` rules from this configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Apply { run, dry_run, diff } => cmd_apply(run, cli.format, dry_run, diff),
        Commands::Check { run, diff } => cmd_check(run, cli.format, diff),
        Commands::Rules { config } => cmd_rules(config, cli.format),
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error")),
        1 => EnvFilter::new("java_cleanup=info"),
        2 => EnvFilter::new("java_cleanup=debug"),
        _ => EnvFilter::new("java_cleanup=trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Load `path`, or the default config in `workspace` when it exists.
fn load_config(path: Option<PathBuf>, workspace: &Path) -> Result<LoadedConfig> {
    let path = path.or_else(|| {
        let default = workspace.join(DEFAULT_CONFIG);
        default.is_file().then_some(default)
    });
    let Some(path) = path else {
        return Ok(LoadedConfig::default());
    };
    tracing::info!(config = %path.display(), "loading clean-up config");
    let loaded = load_from_path(&path)?;
    for warning in &loaded.warnings {
        eprintln!("{} {}", "warning:".yellow(), warning);
    }
    Ok(loaded)
}

/// Everything a run over a set of files needs.
struct Session {
    engine: Engine,
    options: Options,
    guard: WorkspaceGuard,
    files: Vec<PathBuf>,
}

impl Session {
    fn prepare(run: RunArgs) -> Result<Self> {
        let workspace = env::current_dir().context("cannot determine current directory")?;
        let loaded = load_config(run.config, &workspace)?;
        let engine = Engine::with_templates(&loaded.templates)?;
        let mut options = loaded.options;

        for id in &run.enable {
            if engine.catalog().get(id).is_none() {
                let ids: Vec<&str> = engine.catalog().descriptors().map(|d| d.id.as_str()).collect();
                match suggest(id, ids) {
                    Some(hint) => anyhow::bail!("unknown rule '{id}' (did you mean '{hint}'?)"),
                    None => anyhow::bail!("unknown rule '{id}'; run `java-cleanup rules` to list them"),
                }
            }
            options.set(format!("cleanup.{id}"), true);
        }
        for assignment in &run.set {
            let (key, value) = parse_assignment(assignment)
                .with_context(|| format!("expected KEY=VALUE, got '{assignment}'"))?;
            options.set(key, value);
        }

        let roots = if run.paths.is_empty() {
            vec![workspace.clone()]
        } else {
            run.paths
        };
        let files = discover_java_files(&roots)?;
        let guard = WorkspaceGuard::new(&workspace)?;
        tracing::info!(files = files.len(), "discovered Java sources");

        Ok(Self {
            engine,
            options,
            guard,
            files,
        })
    }

    /// One engine call per file, in parallel; results keep discovery order.
    fn run(&self) -> Vec<FileOutcome> {
        self.files
            .par_iter()
            .map(|path| {
                let result = fs::read_to_string(path)
                    .map_err(|e| format!("cannot read: {e}"))
                    .and_then(|original| {
                        self.engine
                            .clean_up(&original, &self.options)
                            .map(|result| (original, result))
                            .map_err(|e| e.to_string())
                    });
                FileOutcome {
                    path: path.clone(),
                    result,
                }
            })
            .collect()
    }
}

struct FileOutcome {
    path: PathBuf,
    /// Original text and engine result, or a failure message.
    result: Result<(String, CleanUpResult), String>,
}

impl FileOutcome {
    fn is_changed(&self) -> bool {
        matches!(&self.result, Ok((_, result)) if result.is_changed())
    }
}

#[derive(Serialize)]
struct FileReport<'a> {
    path: &'a Path,
    changed: bool,
    written: bool,
    applied_rules: Option<&'a BTreeSet<String>>,
    passes: usize,
    state: Option<SchedulerState>,
    diagnostics: Option<&'a Diagnostics>,
    error: Option<&'a str>,
}

impl<'a> FileReport<'a> {
    fn new(outcome: &'a FileOutcome, written: bool) -> Self {
        match &outcome.result {
            Ok((_, result)) => Self {
                path: &outcome.path,
                changed: result.is_changed(),
                written,
                applied_rules: Some(&result.applied_rules),
                passes: result.passes,
                state: Some(result.state),
                diagnostics: Some(&result.diagnostics),
                error: None,
            },
            Err(error) => Self {
                path: &outcome.path,
                changed: false,
                written: false,
                applied_rules: None,
                passes: 0,
                state: None,
                diagnostics: None,
                error: Some(error),
            },
        }
    }
}

/// Helper: Show unified diff between original and cleaned content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!("{}", format!("--- {} (original)", file.display()).dimmed());
    println!("{}", format!("+++ {} (cleaned)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Delete => print!("{}", format!("-{}", change).red()),
            ChangeTag::Insert => print!("{}", format!("+{}", change).green()),
            ChangeTag::Equal => {}
        }
    }
    println!();
}

fn print_diagnostics(result: &CleanUpResult) {
    for diagnostic in result.diagnostics.at_least(Severity::Warning) {
        eprintln!("  {}", diagnostic.to_string().yellow());
    }
}

fn print_outcome(outcome: &FileOutcome, verb: &str, show_diff: bool) {
    match &outcome.result {
        Ok((original, result)) if result.is_changed() => {
            let rules: Vec<&str> = result.applied_rules.iter().map(String::as_str).collect();
            println!(
                "{} {}: {} ({}; {} pass{})",
                "✓".green(),
                outcome.path.display(),
                verb,
                rules.join(", "),
                result.passes,
                if result.passes == 1 { "" } else { "es" }
            );
            if result.state == SchedulerState::Exhausted {
                println!("  {}", "pass budget exhausted; output may not be fully cleaned".yellow());
            }
            print_diagnostics(result);
            if show_diff {
                display_diff(&outcome.path, original, &result.text);
            }
        }
        Ok((_, result)) => {
            tracing::debug!(path = %outcome.path.display(), "unchanged");
            print_diagnostics(result);
        }
        Err(error) => {
            eprintln!("{} {}: {}", "✗".red(), outcome.path.display(), error);
        }
    }
}

fn cmd_apply(run: RunArgs, format: OutputFormat, dry_run: bool, show_diff: bool) -> Result<()> {
    let session = Session::prepare(run)?;
    if format == OutputFormat::Text && dry_run {
        println!("{}", "[DRY RUN - no files will be written]".cyan());
    }

    let outcomes = session.run();
    let mut reports = Vec::new();
    let mut changed = 0;
    let mut failed = 0;

    for outcome in &outcomes {
        let mut written = false;
        let mut write_error = None;
        if let Ok((_, result)) = &outcome.result {
            if result.is_changed() {
                changed += 1;
                if !dry_run {
                    match guarded_write(&session.guard, &outcome.path, &result.text) {
                        Ok(()) => written = true,
                        Err(e) => write_error = Some(e),
                    }
                }
            }
        } else {
            failed += 1;
        }

        if format == OutputFormat::Text {
            let verb = if dry_run { "would clean" } else { "cleaned" };
            print_outcome(outcome, verb, show_diff);
        }
        if let Some(e) = write_error {
            eprintln!("{} {}: write refused: {}", "✗".red(), outcome.path.display(), e);
            failed += 1;
        }
        reports.push(FileReport::new(outcome, written));
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        OutputFormat::Text => {
            println!();
            println!("{}", "Summary:".bold());
            println!("  {} files scanned", outcomes.len());
            println!("  {} changed", format!("{}", changed).green());
            println!("  {} failed", format!("{}", failed).red());
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_check(run: RunArgs, format: OutputFormat, show_diff: bool) -> Result<()> {
    let session = Session::prepare(run)?;
    let outcomes = session.run();
    let changed = outcomes.iter().filter(|o| o.is_changed()).count();
    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();

    match format {
        OutputFormat::Json => {
            let reports: Vec<FileReport<'_>> = outcomes.iter().map(|o| FileReport::new(o, false)).collect();
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
        OutputFormat::Text => {
            for outcome in &outcomes {
                print_outcome(outcome, "would clean", show_diff);
            }
            if changed == 0 && failed == 0 {
                println!("{} {} files clean", "✓".green(), outcomes.len());
            } else {
                println!();
                println!("{}", "Summary:".bold());
                println!("  {} would change", format!("{}", changed).yellow());
                println!("  {} failed", format!("{}", failed).red());
            }
        }
    }

    if changed > 0 || failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_rules(config: Option<PathBuf>, format: OutputFormat) -> Result<()> {
    let workspace = env::current_dir().context("cannot determine current directory")?;
    let loaded = load_config(config, &workspace)?;
    let engine = Engine::with_templates(&loaded.templates)?;
    let descriptors: Vec<&RuleDescriptor> = engine.catalog().descriptors().collect();

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&descriptors)?);
        return Ok(());
    }

    println!("{}", "Rules (priority order):".bold());
    for descriptor in descriptors {
        println!(
            "  {:<28} {:<17} {}",
            descriptor.id.green(),
            descriptor.shape.to_string().dimmed(),
            descriptor.summary
        );
        for option in &descriptor.sub_options {
            let values = if option.choices.is_empty() {
                "true|false".to_string()
            } else {
                option.choices.join("|")
            };
            println!(
                "  {:<28} {} = {} (default {})",
                "",
                descriptor.sub_option_key(option.name).cyan(),
                values,
                option.default
            );
        }
    }
    Ok(())
}
