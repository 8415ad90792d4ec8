use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use es3_harmony::config::{load_optional, Engine};
use es3_harmony::matcher::MatchMode;
use es3_harmony::tracing_config::init_tracing;
use es3_harmony::write::write_if_changed;
use es3_harmony::{RewriteWarning, Rewriter, SourceUnit, UnitReport};
use similar::{ChangeTag, TextDiff};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "es3-harmony")]
#[command(about = "Rewrite webpack harmony modules for ES3 engines", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite emitted code units
    Rewrite {
        /// Files or directories to rewrite
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Rewrite configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the configured engine
        #[arg(short, long, value_enum)]
        engine: Option<EngineArg>,

        /// File name suffix selecting units inside directories
        #[arg(short, long, default_value = ".js")]
        pattern: String,

        /// Write results here instead of in place
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Show what would change without writing
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Write a `.map.json` position map next to each output
        #[arg(long)]
        source_map: bool,
    },

    /// Patch a runtime preamble file
    Preamble {
        file: PathBuf,

        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Match all substitutions against the original text at once
        #[arg(long)]
        single_pass: bool,

        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// List the effective rule catalog and preamble substitutions
    Rules {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum EngineArg {
    Text,
    Tree,
}

impl From<EngineArg> for Engine {
    fn from(arg: EngineArg) -> Self {
        match arg {
            EngineArg::Text => Engine::Text,
            EngineArg::Tree => Engine::Tree,
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Rewrite {
            paths,
            config,
            engine,
            pattern,
            out_dir,
            dry_run,
            diff,
            source_map,
        } => cmd_rewrite(RewriteArgs {
            paths,
            config,
            engine,
            pattern,
            out_dir,
            dry_run,
            diff,
            source_map,
        }),

        Commands::Preamble {
            file,
            config,
            single_pass,
            dry_run,
        } => cmd_preamble(&file, config.as_deref(), single_pass, dry_run),

        Commands::Rules { config } => cmd_rules(config.as_deref()),
    }
}

struct RewriteArgs {
    paths: Vec<PathBuf>,
    config: Option<PathBuf>,
    engine: Option<EngineArg>,
    pattern: String,
    out_dir: Option<PathBuf>,
    dry_run: bool,
    diff: bool,
    source_map: bool,
}

/// A discovered unit file and its path below the walked root.
struct UnitFile {
    path: PathBuf,
    relative: PathBuf,
}

/// Expand the given paths into unit files, sorted and deduplicated.
///
/// Files named explicitly are always taken; directories are walked and
/// filtered by `suffix`.
fn discover_units(paths: &[PathBuf], suffix: &str) -> Result<Vec<UnitFile>> {
    let mut files = Vec::new();
    for root in paths {
        if root.is_file() {
            let name = root.file_name().map(PathBuf::from).unwrap_or_default();
            files.push(UnitFile {
                path: root.clone(),
                relative: name,
            });
            continue;
        }
        if !root.exists() {
            anyhow::bail!("{} does not exist", root.display());
        }
        for entry in WalkDir::new(root) {
            let entry = entry?;
            let matches = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(suffix));
            if entry.file_type().is_file() && matches {
                let relative = entry.path().strip_prefix(root)?.to_path_buf();
                files.push(UnitFile {
                    path: entry.into_path(),
                    relative,
                });
            }
        }
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    files.dedup_by(|a, b| a.path == b.path);
    Ok(files)
}

fn display_diff(file: &Path, original: &str, modified: &str) {
    println!("\n{}", format!("--- {} (original)", file.display()).dimmed());
    println!("{}", format!("+++ {} (rewritten)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);
    for change in diff.iter_all_changes() {
        let line = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", line);
    }
}

fn cmd_rewrite(args: RewriteArgs) -> Result<()> {
    let mut config = load_optional(args.config.as_deref())?;
    if let Some(engine) = args.engine {
        config.options.engine = engine.into();
    }
    if args.source_map {
        config.options.source_map = Some(true);
    }
    let rewriter = Rewriter::new(&config, false)?;

    let files = discover_units(&args.paths, &args.pattern)?;
    if files.is_empty() {
        println!("{}", format!("No files ending in '{}' found", args.pattern).yellow());
        return Ok(());
    }

    let mut units = Vec::with_capacity(files.len());
    for file in &files {
        let text = fs::read_to_string(&file.path)
            .with_context(|| format!("failed to read {}", file.path.display()))?;
        units.push(SourceUnit::new(file.path.display().to_string(), text));
    }

    println!(
        "Rewriting {} unit(s) with the {} engine{}",
        units.len(),
        rewriter.engine(),
        if args.dry_run { " [DRY RUN]".cyan().to_string() } else { String::new() }
    );
    println!();

    let reports = rewriter.rewrite_batch(&units);

    let mut changed = 0;
    let mut unchanged = 0;
    let mut failed = 0;
    let mut warnings = 0;

    for ((file, unit), report) in files.iter().zip(&units).zip(&reports) {
        let rewritten = match &report.outcome {
            Ok(rewritten) => rewritten,
            Err(failure) => {
                eprintln!("{} {}: {}", "✗".red(), report.identity, failure.error);
                failed += 1;
                if !args.dry_run && args.out_dir.is_some() {
                    write_unit(file, args.out_dir.as_deref(), report)?;
                }
                continue;
            }
        };

        for warning in &rewritten.warnings {
            let label = match warning {
                RewriteWarning::Conflict(_) => "conflict",
                RewriteWarning::SyntaxRegression(_) => "syntax",
            };
            eprintln!("  {} {} [{}]: {}", "!".yellow(), report.identity, label, warning);
            warnings += 1;
        }

        if rewritten.text == unit.text() {
            println!("{} {}: unchanged", "⊙".yellow(), report.identity);
            unchanged += 1;
            if !args.dry_run && args.out_dir.is_some() {
                write_unit(file, args.out_dir.as_deref(), report)?;
            }
            continue;
        }

        println!(
            "{} {}: {} edit(s)",
            "✓".green(),
            report.identity,
            rewritten.applied.len()
        );
        changed += 1;
        if args.diff {
            display_diff(&file.path, unit.text(), &rewritten.text);
        }
        if !args.dry_run {
            write_unit(file, args.out_dir.as_deref(), report)?;
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} rewritten", format!("{}", changed).green());
    println!("  {} unchanged", format!("{}", unchanged).yellow());
    println!("  {} warnings", format!("{}", warnings).yellow());
    println!("  {} failed", format!("{}", failed).red());

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn write_unit(file: &UnitFile, out_dir: Option<&Path>, report: &UnitReport) -> Result<()> {
    let target = match out_dir {
        Some(dir) => dir.join(&file.relative),
        None => file.path.clone(),
    };
    write_if_changed(&target, report.text())
        .with_context(|| format!("failed to write {}", target.display()))?;

    if let Ok(rewritten) = &report.outcome {
        if let Some(map) = &rewritten.position_map {
            let mut map_path = target.clone().into_os_string();
            map_path.push(".map.json");
            let map_path = PathBuf::from(map_path);
            write_if_changed(&map_path, &map.to_json()?)
                .with_context(|| format!("failed to write {}", map_path.display()))?;
        }
    }
    Ok(())
}

fn cmd_preamble(file: &Path, config: Option<&Path>, single_pass: bool, dry_run: bool) -> Result<()> {
    let rewriter = Rewriter::new(&load_optional(config)?, false)?;
    let text = fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;

    let patched = if single_pass {
        rewriter.patch_preamble_single_pass(&text)
    } else {
        rewriter.patch_preamble(&text)
    };

    for (id, count) in &patched.hits {
        if *count > 0 {
            println!("{} {}: {} replacement(s)", "✓".green(), id, count);
        } else {
            println!("{} {}: no match", "⊘".cyan(), id);
        }
    }

    if !patched.changed() {
        println!("{}", "Preamble unchanged".yellow());
    } else if dry_run {
        display_diff(file, &text, &patched.text);
    } else {
        write_if_changed(file, &patched.text)
            .with_context(|| format!("failed to write {}", file.display()))?;
    }
    Ok(())
}

fn cmd_rules(config: Option<&Path>) -> Result<()> {
    let rewriter = Rewriter::new(&load_optional(config)?, false)?;

    println!("{}", "Rules:".bold());
    for rule in rewriter.catalog().rules() {
        let origin = if rule.is_builtin() { "built-in" } else { "custom" };
        let mode = match rule.mode() {
            MatchMode::Simple => String::new(),
            MatchMode::Contextual(marker) => format!(" [{}]", marker),
        };
        println!("  {} ({}){}", rule.id().green(), origin.dimmed(), mode.cyan());
        if !rule.description().is_empty() {
            println!("      {}", rule.description());
        }
    }

    println!();
    println!("{}", "Preamble substitutions:".bold());
    for id in rewriter.preamble().ids() {
        println!("  {}", id.green());
    }
    Ok(())
}
