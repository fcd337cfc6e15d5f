//! CLI command definitions, routing, and tracing setup.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use gridmerge_core::pipeline::{PipelineResult, ProgressReporter, run_pipeline};
use gridmerge_shared::{
    AppConfig, GridMergeError, PipelineConfig, init_config, load_config, load_config_from,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// GridMerge: attach eGRID emission data to subregion boundaries.
#[derive(Parser)]
#[command(
    name = "gridmerge",
    version,
    about = "Join eGRID subregion data onto a subregion shapefile and save the result.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.gridmerge/gridmerge.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Load, merge, and write the subregion shapefile.
    Run {
        /// Root directory that relative config paths resolve against
        /// (defaults to the repository root).
        #[arg(long, env = "GRIDMERGE_ROOT")]
        root: Option<PathBuf>,

        /// Print the run summary as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "gridmerge=info",
        1 => "gridmerge=debug",
        _ => "gridmerge=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Run { root, json } => cmd_run(config_path, root.as_deref(), json),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Repository root: the workspace directory two levels above this crate.
fn default_root() -> Result<PathBuf> {
    match Path::new(env!("CARGO_MANIFEST_DIR")).ancestors().nth(2) {
        Some(root) if root.is_dir() => Ok(root.to_path_buf()),
        _ => std::env::current_dir().map_err(|e| eyre!("cannot determine working directory: {e}")),
    }
}

fn cmd_run(config_path: Option<&Path>, root: Option<&Path>, json: bool) -> Result<()> {
    let config = resolve_config(config_path)?;
    let root = match root {
        Some(r) => r.to_path_buf(),
        None => default_root()?,
    };

    let pipeline_config = PipelineConfig::resolve(&config, &root);
    info!(
        root = %root.display(),
        output = %pipeline_config.output_path.display(),
        "merging subregion data"
    );

    let reporter = CliProgress::new(!json);

    let result = match run_pipeline(&pipeline_config, &reporter) {
        Ok(result) => result,
        Err(e) => {
            reporter.abandon();
            if let Some(code) = fatal_exit_code(&e, &mut std::io::stdout())? {
                std::process::exit(code);
            }
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!();
    println!("  Merged shapefile written!");
    println!("  Path:      {}", result.output_path.display());
    println!("  Features:  {}", result.features);
    println!("  Matched:   {}", result.matched);
    println!("  Unmatched: {}", result.features - result.matched);
    println!("  Fields:    {}", result.fields);
    println!("  Time:      {:.1}s", result.elapsed_ms as f64 / 1000.0);
    println!();

    Ok(())
}

const BAD_OUTPUT_NAME: &str =
    "ERROR: Filename for shapefile must end in '.shp'. File will not be saved.";

/// Exit code for errors that end the process with a plain message instead
/// of a report. The message is written to `out`.
fn fatal_exit_code(err: &GridMergeError, out: &mut impl Write) -> Result<Option<i32>> {
    if !err.is_fatal_output_error() {
        return Ok(None);
    }
    writeln!(out, "{BAD_OUTPUT_NAME}")?;
    Ok(Some(1))
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new(visible: bool) -> Self {
        if !visible {
            return Self {
                spinner: ProgressBar::hidden(),
            };
        }

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn abandon(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _result: &PipelineResult) {
        self.spinner.finish_and_clear();
    }
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_root() {
        let cli = Cli::try_parse_from(["gridmerge", "-vv", "run", "--root", "/data/egrid", "--json"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Run { root, json } => {
                assert_eq!(root, Some(PathBuf::from("/data/egrid")));
                assert!(json);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn parses_config_show_with_global_config() {
        let cli = Cli::try_parse_from(["gridmerge", "config", "show", "--config", "/tmp/gm.toml"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/gm.toml")));
        assert!(matches!(
            cli.command,
            Command::Config {
                action: ConfigAction::Show
            }
        ));
    }

    #[test]
    fn bad_output_name_exits_with_message() {
        let err = GridMergeError::InvalidOutputPath(PathBuf::from("out/merged.txt"));
        let mut out = Vec::new();
        assert_eq!(fatal_exit_code(&err, &mut out).unwrap(), Some(1));
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "ERROR: Filename for shapefile must end in '.shp'. File will not be saved.\n"
        );
    }

    #[test]
    fn other_errors_are_reported_normally() {
        let err = GridMergeError::validation("join key 'ZipSubregi' not found");
        let mut out = Vec::new();
        assert_eq!(fatal_exit_code(&err, &mut out).unwrap(), None);
        assert!(out.is_empty());
    }

    #[test]
    fn default_root_is_workspace_root() {
        let root = default_root().unwrap();
        assert!(root.join("Cargo.toml").exists());
        assert!(root.join("apps").join("cli").exists());
    }
}
