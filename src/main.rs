//! reconcile - compare two directory trees and reconcile them.
//!
//! Usage:
//!   reconcile scan PATH                 Export an inventory to JSON
//!   reconcile diff SOURCE TARGET        Compare and write an action table
//!   reconcile defaults TABLE            Fill undecided rows with default actions
//!   reconcile execute TABLE -d DIR      Replay a reviewed action table
//!   reconcile --help                    Show help

mod logging;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, bail};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};

use reconcile_analyze::{DiffConfig, StructureAnalyzer, StructureConfig, StructureReport, TreeDiffer};
use reconcile_core::{Action, Inventory, InventoryLabel, Profile, ScanConfig};
use reconcile_ops::{ExecuteConfig, ExecuteEvent, start_execute};
use reconcile_plan::ActionTable;
use reconcile_scan::TreeScanner;

#[derive(Parser)]
#[command(
    name = "reconcile",
    version,
    about = "Compare two directory trees and reconcile them",
    long_about = "reconcile inventories a source and a target tree, lists every path that \
                  differs, and writes a CSV action table for review.\n\n\
                  Set the Action column to Copy, Delete or Ignore, then replay the table \
                  with `reconcile execute`. Use --what-if to preview a run."
)]
struct Cli {
    /// Profile file (defaults to <config dir>/reconcile/config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a directory and export its inventory as JSON
    Scan {
        /// Directory to scan
        path: PathBuf,

        /// Label recorded in the inventory
        #[arg(short, long, default_value = "source")]
        label: InventoryLabel,

        #[command(flatten)]
        scan: ScanArgs,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compare two trees and write an action table
    Diff {
        /// Source directory or exported inventory (.json)
        source: PathBuf,

        /// Target directory or exported inventory (.json)
        target: PathBuf,

        #[command(flatten)]
        scan: ScanArgs,

        /// Action table to write
        #[arg(short, long, default_value = "actions.csv")]
        output: PathBuf,

        /// Earlier action table whose decisions and notes are carried over
        #[arg(long)]
        previous: Option<PathBuf>,

        /// Fill undecided rows with default actions
        #[arg(long)]
        defaults: bool,

        /// Seconds within which modification times count as equal
        #[arg(long)]
        time_tolerance: Option<u64>,

        /// Output format for the summary
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Apply default actions to undecided rows
    Defaults {
        /// Action table to update
        table: PathBuf,

        /// Write here instead of updating the table in place
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Execute the Copy and Delete rows of an action table
    Execute {
        /// Reviewed action table
        table: PathBuf,

        /// Root that copied entries land under
        #[arg(short, long)]
        destination: PathBuf,

        /// Leading relative-path segments to drop, e.g. "Users/ann"
        #[arg(long)]
        strip_prefix: Option<String>,

        /// Where targets are copied before deletion
        #[arg(long)]
        backup_dir: Option<PathBuf>,

        /// Report what would happen without changing anything
        #[arg(long)]
        what_if: bool,

        /// Skip hash verification of backups
        #[arg(long)]
        no_verify: bool,
    },
}

/// Scan options shared by `scan` and `diff`.
#[derive(Args)]
struct ScanArgs {
    /// Glob matched against entry names (repeatable)
    #[arg(short, long = "exclude")]
    exclude: Vec<String>,

    /// Maximum depth below the root (0 = unlimited)
    #[arg(long)]
    max_depth: Option<u32>,

    /// Skip entries whose name starts with '.'
    #[arg(long)]
    no_hidden: bool,

    /// Also drop everything below an excluded directory
    #[arg(long)]
    exclude_subtrees: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let profile = Profile::discover(cli.config.as_deref()).context("Failed to load profile")?;

    match cli.command {
        Command::Scan {
            path,
            label,
            scan,
            output,
        } => {
            run_scan(&profile, &path, label, &scan, output)?;
        }
        Command::Diff {
            source,
            target,
            scan,
            output,
            previous,
            defaults,
            time_tolerance,
            format,
        } => {
            let options = DiffOptions {
                output,
                previous,
                defaults,
                time_tolerance,
                format,
            };
            run_diff(&profile, &source, &target, &scan, options)?;
        }
        Command::Defaults { table, output } => {
            run_defaults(&table, output)?;
        }
        Command::Execute {
            table,
            destination,
            strip_prefix,
            backup_dir,
            what_if,
            no_verify,
        } => {
            let config = execute_config(
                &profile,
                destination,
                strip_prefix,
                backup_dir,
                what_if,
                !no_verify,
            )?;
            run_execute(&table, config).await?;
        }
    }

    Ok(())
}

/// Merge profile scan settings with command-line flags.
fn scan_config(profile: &Profile, root: &Path, args: &ScanArgs) -> Result<ScanConfig> {
    let mut exclude = profile.scan.exclude.clone();
    exclude.extend(args.exclude.iter().cloned());

    ScanConfig::builder()
        .root(root)
        .exclude_patterns(exclude)
        .max_depth(args.max_depth.or(profile.scan.max_depth))
        .include_hidden(!args.no_hidden && profile.scan.include_hidden.unwrap_or(true))
        .exclude_subtrees(args.exclude_subtrees || profile.scan.exclude_subtrees.unwrap_or(false))
        .build()
        .context("Invalid scan configuration")
}

fn scan_tree(config: &ScanConfig, label: InventoryLabel) -> Result<Inventory> {
    eprintln!("Scanning {} ({label})...", config.root.display());

    let scanner = TreeScanner::new();
    let mut progress = scanner.subscribe();
    let reporter = tokio::spawn(async move {
        loop {
            match progress.recv().await {
                Ok(p) => debug!(
                    files = p.files_scanned,
                    dirs = p.dirs_scanned,
                    "{:.0} entries/s, at {}",
                    p.entries_per_second(),
                    p.current_path.display()
                ),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let result = scanner.scan(config, label);
    drop(scanner);
    reporter.abort();

    let inventory =
        result.with_context(|| format!("Scan of {} failed", config.root.display()))?;

    if inventory.has_warnings() {
        eprintln!(
            "{} entries could not be read under {}",
            inventory.warnings.len(),
            config.root.display()
        );
    }
    Ok(inventory)
}

/// Scan a directory, or load an inventory exported by `reconcile scan`.
fn load_or_scan(
    profile: &Profile,
    path: &Path,
    label: InventoryLabel,
    args: &ScanArgs,
) -> Result<Inventory> {
    if path.is_file() {
        let file = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
        let inventory: Inventory = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("{} is not an exported inventory", path.display()))?;
        info!(path = %path.display(), entries = inventory.len(), "inventory loaded");
        return Ok(inventory);
    }
    scan_tree(&scan_config(profile, path, args)?, label)
}

/// Scan a directory and export the inventory.
fn run_scan(
    profile: &Profile,
    path: &Path,
    label: InventoryLabel,
    args: &ScanArgs,
    output: Option<PathBuf>,
) -> Result<()> {
    let inventory = scan_tree(&scan_config(profile, path, args)?, label)?;

    eprintln!(
        "{} files, {} directories, {} in {:.2}s",
        inventory.file_count,
        inventory.dir_count,
        format_size(inventory.total_size),
        inventory.scan_duration.as_secs_f64()
    );

    let json = serde_json::to_string_pretty(&inventory)?;
    match output {
        Some(output_path) => {
            std::fs::write(&output_path, json)
                .with_context(|| format!("Cannot write {}", output_path.display()))?;
            eprintln!("Exported to {}", output_path.display());
        }
        None => {
            println!("{}", json);
        }
    }

    Ok(())
}

struct DiffOptions {
    output: PathBuf,
    previous: Option<PathBuf>,
    defaults: bool,
    time_tolerance: Option<u64>,
    format: OutputFormat,
}

/// Compare two trees, write the action table and print the structure report.
fn run_diff(
    profile: &Profile,
    source: &Path,
    target: &Path,
    args: &ScanArgs,
    options: DiffOptions,
) -> Result<()> {
    let source = load_or_scan(profile, source, InventoryLabel::Source, args)?;
    let target = load_or_scan(profile, target, InventoryLabel::Target, args)?;

    let tolerance = options
        .time_tolerance
        .unwrap_or(profile.diff.time_tolerance_secs);
    let differ = TreeDiffer::with_config(
        DiffConfig::builder()
            .time_tolerance(Duration::from_secs(tolerance))
            .build()
            .context("Invalid diff configuration")?,
    );
    let report = differ.diff(&source, &target);

    let structure = StructureAnalyzer::with_config(
        StructureConfig::builder()
            .prefix_depth(profile.report.prefix_depth)
            .top_n(profile.report.top)
            .min_missing_size(profile.report.min_missing_size)
            .build()
            .context("Invalid report configuration")?,
    )
    .analyze(&report);

    let mut table = ActionTable::from_report(&report);
    if let Some(previous) = &options.previous {
        let previous = ActionTable::read_csv(previous)
            .with_context(|| format!("Cannot load previous table {}", previous.display()))?;
        table.merge_previous(&previous);
    }
    if options.defaults {
        table.apply_defaults();
    }
    table
        .write_csv(&options.output)
        .with_context(|| format!("Cannot write {}", options.output.display()))?;

    match options.format {
        OutputFormat::Text => {
            print_structure(&report.source_root, &report.target_root, &structure);
            println!(" Action table: {} ({} rows)", options.output.display(), table.len());
            println!();
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&structure)?);
        }
    }

    Ok(())
}

fn print_structure(source: &Path, target: &Path, report: &StructureReport) {
    println!();
    println!("{}", "─".repeat(70));
    println!(" {} -> {}", source.display(), target.display());
    println!("{}", "─".repeat(70));
    println!();

    if report.total == 0 {
        println!(" Trees are equivalent.");
        println!();
        return;
    }

    println!(" {} differences", report.total);
    for count in report.counts.iter().filter(|c| c.count > 0) {
        println!("   {:<10} {:<16} {:>8}", count.kind, count.status, count.count);
    }
    println!();

    if !report.top_prefixes.is_empty() {
        println!(" Busiest paths:");
        for prefix in &report.top_prefixes {
            println!(
                "   {:>8}  {:>10}  {}",
                prefix.count,
                format_size(prefix.bytes),
                prefix.prefix
            );
        }
        println!();
    }

    println!(" Missing from target: {}", format_size(report.missing_bytes));
    for missing in &report.largest_missing {
        println!(
            "   {:>10}  {}",
            format_size(missing.size_bytes),
            missing.relative_path
        );
    }
    println!();
}

/// Fill undecided rows with default actions.
fn run_defaults(path: &Path, output: Option<PathBuf>) -> Result<()> {
    let mut table = ActionTable::read_csv(path)
        .with_context(|| format!("Cannot load action table {}", path.display()))?;
    for warning in &table.warnings {
        eprintln!("warning: {warning}");
    }

    let filled = table.apply_defaults();
    let output = output.unwrap_or_else(|| path.to_path_buf());
    table
        .write_csv(&output)
        .with_context(|| format!("Cannot write {}", output.display()))?;

    println!("{filled} rows filled, written to {}", output.display());
    for (action, count) in table.counts_by_action() {
        println!("   {:<8} {:>8}", action, count);
    }

    Ok(())
}

/// Merge profile execute settings with command-line flags.
///
/// Without a configured backup directory, backups go next to the destination.
fn execute_config(
    profile: &Profile,
    destination: PathBuf,
    strip_prefix: Option<String>,
    backup_dir: Option<PathBuf>,
    dry_run: bool,
    verify_backups: bool,
) -> Result<ExecuteConfig> {
    let backup_root = match backup_dir.or_else(|| profile.execute.backup_root.clone()) {
        Some(dir) => dir,
        None => default_backup_root(&destination)?,
    };

    let mut builder = ExecuteConfig::builder();
    builder
        .destination_root(destination)
        .backup_root(backup_root)
        .dry_run(dry_run)
        .verify_backups(verify_backups);
    if let Some(prefix) = strip_prefix.or_else(|| profile.execute.strip_prefix.clone()) {
        builder.strip_prefix(prefix);
    }

    builder.build().context("Invalid execute configuration")
}

/// `<destination>.backup-<timestamp>` next to the destination.
///
/// The destination is resolved first so `.` or `dir/` still get a sibling.
fn default_backup_root(destination: &Path) -> Result<PathBuf> {
    let resolved = destination
        .canonicalize()
        .or_else(|_| std::path::absolute(destination))
        .with_context(|| format!("Cannot resolve {}", destination.display()))?;
    let Some(name) = resolved.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        bail!(
            "No default backup location beside {}; pass --backup-dir",
            destination.display()
        );
    };

    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    Ok(resolved.with_file_name(format!("{name}.backup-{stamp}")))
}

/// Replay an action table, printing one line per row and a summary.
async fn run_execute(path: &Path, config: ExecuteConfig) -> Result<()> {
    let table = ActionTable::read_csv(path)
        .with_context(|| format!("Cannot load action table {}", path.display()))?;
    for warning in &table.warnings {
        eprintln!("warning: {warning}");
    }

    if table.with_action(Action::Delete).next().is_some() {
        if let Some(backup) = &config.backup_root {
            eprintln!("Backups go to {}", backup.display());
        }
    }

    let mut rx = start_execute(table, config);
    while let Some(event) = rx.recv().await {
        match event {
            ExecuteEvent::Progress(_) => {}
            ExecuteEvent::Row(report) => println!("{report}"),
            ExecuteEvent::Complete(result) => {
                let summary = result.context("Execution refused")?;
                println!();
                println!("{}", summary.summary());
                if summary.bytes_copied > 0 {
                    println!("{} copied", format_size(summary.bytes_copied));
                }
            }
        }
    }

    Ok(())
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::DECIMAL)
}
