mod simulate;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use dda_core::{DecisionEngine, FuzzyConfig, FuzzyEngine, Metrics, RecordingSink};
use dda_store::{ConfigFormat, SessionLog, Settings, load_config, parse_config};
use uuid::Uuid;

use crate::simulate::SimOptions;

#[derive(Parser)]
#[command(name = "dda", about = "Dynamic difficulty adjustment engine CLI")]
struct Cli {
    /// Directory for the session log (overrides DDA_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a config once against the given metrics
    Eval {
        /// Engine config (.json or .toml)
        #[arg(long)]
        config: PathBuf,

        /// Normalized metrics as NAME=VALUE
        #[arg(value_parser = parse_assignment)]
        metrics: Vec<(String, f64)>,

        /// Print the adjustments as a JSON object
        #[arg(long)]
        json: bool,
    },

    /// Report configuration issues
    Check {
        #[arg(long)]
        config: PathBuf,

        /// Exit non-zero if any issue is found
        #[arg(long)]
        strict: bool,
    },

    /// Run the adjustment loop against seeded synthetic metrics
    Simulate {
        #[arg(long)]
        config: PathBuf,

        /// Runtime settings (.toml)
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Number of evaluation cycles
        #[arg(long, default_value_t = 100)]
        cycles: u64,

        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Session label stored in the log
        #[arg(long)]
        label: Option<String>,

        /// Do not record the session
        #[arg(long)]
        no_log: bool,
    },

    /// List recorded sessions
    Stats {
        /// Show per-rule coverage for one session
        #[arg(long)]
        session: Option<Uuid>,
    },
}

fn parse_assignment(s: &str) -> std::result::Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing metric name in '{s}'"));
    }
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|e| format!("invalid value in '{s}': {e}"))?;
    Ok((name.to_string(), value))
}

fn data_dir(cli: &Cli) -> PathBuf {
    cli.data_dir
        .clone()
        .unwrap_or_else(dda_store::default_base_dir)
}

fn open_log(cli: &Cli) -> Result<SessionLog> {
    let path = data_dir(cli).join("sessions.db");
    SessionLog::open(&path).with_context(|| format!("failed to open {}", path.display()))
}

fn read_config(path: &Path) -> Result<FuzzyConfig> {
    load_config(path).with_context(|| format!("failed to load config {}", path.display()))
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Eval {
            config,
            metrics,
            json,
        } => cmd_eval(&cli, config, metrics, *json),
        Commands::Check { config, strict } => cmd_check(config, *strict),
        Commands::Simulate {
            config,
            settings,
            cycles,
            seed,
            label,
            no_log,
        } => cmd_simulate(
            &cli,
            config,
            settings.as_deref(),
            &SimOptions {
                cycles: *cycles,
                seed: *seed,
            },
            label.as_deref(),
            *no_log,
        ),
        Commands::Stats { session } => cmd_stats(&cli, *session),
    }
}

fn cmd_eval(cli: &Cli, config: &Path, metrics: &[(String, f64)], json: bool) -> Result<()> {
    let engine = FuzzyEngine::new(read_config(config)?);
    let inputs: Metrics = metrics.iter().cloned().collect();

    let mut sink = RecordingSink::new();
    let deltas = engine.evaluate_observed(&inputs, &mut sink);

    let sorted: BTreeMap<&String, &f64> = deltas.iter().collect();
    if json {
        let out = serde_json::to_string_pretty(&sorted).context("failed to serialize output")?;
        println!("{out}");
    } else if sorted.is_empty() {
        println!("(no adjustments)");
    } else {
        for (name, value) in sorted {
            println!("{name} = {value:.4}");
        }
    }

    if cli.verbose {
        for fired in &sink.events {
            eprintln!("rule {} fired at {:.4}", fired.rule, fired.activation);
        }
        eprintln!(
            "--- {} of {} rules fired ---",
            sink.events.len(),
            engine.config().rules.len()
        );
    }

    Ok(())
}

fn cmd_check(path: &Path, strict: bool) -> Result<()> {
    let format = ConfigFormat::from_path(path)?;
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config = parse_config(&text, format)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    let issues = config.validate();
    println!(
        "{}: {} variables, {} rules",
        path.display(),
        config.variables.len(),
        config.rules.len()
    );
    if issues.is_empty() {
        println!("ok");
        return Ok(());
    }

    for issue in &issues {
        println!("  {issue}");
    }
    println!("{} issue(s)", issues.len());

    if strict {
        bail!("{} configuration issue(s) in {}", issues.len(), path.display());
    }
    Ok(())
}

fn cmd_simulate(
    cli: &Cli,
    config_path: &Path,
    settings_path: Option<&Path>,
    opts: &SimOptions,
    label: Option<&str>,
    no_log: bool,
) -> Result<()> {
    let config = read_config(config_path)?;
    let settings = match settings_path {
        Some(path) => Settings::load(path)
            .with_context(|| format!("failed to load settings {}", path.display()))?,
        None => Settings::default(),
    };

    let log = if no_log { None } else { Some(open_log(cli)?) };
    let session = match &log {
        Some(log) => {
            let label = label
                .map(str::to_string)
                .unwrap_or_else(|| format!("seed-{}", opts.seed));
            Some(
                log.start_session(&label, Some(&config))
                    .context("failed to start session")?,
            )
        }
        None => None,
    };

    let recorder = log.as_ref().zip(session);
    let report = simulate::run(config, &settings, opts, recorder)?;

    match session {
        Some(id) => println!("session:  {id}"),
        None => println!("session:  (not recorded)"),
    }
    println!("cycles:   {}", report.cycles);

    if !report.flow.is_empty() {
        println!("flow ratio:");
        for (metric, ratio) in &report.flow {
            println!("  {metric:<16} {ratio:.3}");
        }
    }

    println!("rule coverage ({} rules):", report.rule_count);
    for (rule, hits) in &report.coverage {
        println!("  rule {rule:<3} fired {hits}/{}", report.cycles);
    }
    if !report.never_fired.is_empty() {
        let ids: Vec<String> = report.never_fired.iter().map(ToString::to_string).collect();
        println!("never fired: {}", ids.join(", "));
    }

    if cli.verbose {
        for (name, value) in &report.last_deltas {
            eprintln!("last {name} = {value:.4}");
        }
    }

    Ok(())
}

fn cmd_stats(cli: &Cli, session: Option<Uuid>) -> Result<()> {
    let log = open_log(cli)?;

    if let Some(id) = session {
        let cycles = log.cycle_count(id).context("failed to count cycles")?;
        let rows = log.training_rows(id).context("failed to read cycles")?;
        let samples: usize = rows.iter().map(|r| r.metrics.len()).sum();
        println!("session:  {id}");
        println!("cycles:   {cycles}");
        println!("samples:  {samples}");
        for stat in log.rule_coverage(id).context("failed to read rule coverage")? {
            println!(
                "  rule {:<3} fired {}/{} mean {:.3}",
                stat.rule, stat.fires, cycles, stat.mean_activation
            );
        }
        return Ok(());
    }

    let sessions = log.list_sessions().context("failed to list sessions")?;
    if sessions.is_empty() {
        println!("(no sessions recorded)");
        return Ok(());
    }
    for s in &sessions {
        println!(
            "{}  {:<16} {}  {} cycles",
            s.id, s.label, s.started_at, s.cycles
        );
    }
    Ok(())
}
