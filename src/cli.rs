use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::ArgAction;
use introspect::{FilteredRequirements, Options, process, storage::DEFAULT_COLLECTIONS_PATH};
use serde::Serialize;
use tracing::instrument;

#[derive(Debug, clap::Parser)]
#[command(
    name = "introspect",
    version,
    about = "Gather the Python and system requirements declared by installed collections"
)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        match self.command {
            Command::Introspect(command) => command.run(),
        }
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        // stdout carries the requirement data
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Report the requirements of every collection in a directory
    ///
    /// The merged Python and system requirements are printed to stdout and
    /// can optionally be written to requirement files.
    Introspect(Introspect),
}

#[derive(Debug, clap::Parser)]
pub struct Introspect {
    /// Directory containing an `ansible_collections` folder
    #[arg(default_value = DEFAULT_COLLECTIONS_PATH)]
    folder: PathBuf,

    /// Accepted for compatibility; requirements are always sanitized
    #[arg(long, hide = true)]
    sanitize: bool,

    /// Additional Python requirements, attributed to 'user'
    #[arg(long, value_name = "FILE")]
    user_pip: Option<PathBuf>,

    /// Additional system requirements, attributed to 'user'
    #[arg(long, value_name = "FILE")]
    user_bindep: Option<PathBuf>,

    /// Python requirement names to exclude, one per line ('~' prefix for a
    /// regular expression)
    #[arg(long = "exclude-pip-reqs", value_name = "FILE")]
    exclude_pip: Option<PathBuf>,

    /// System requirement names to exclude, one per line ('~' prefix for a
    /// regular expression)
    #[arg(long = "exclude-bindep-reqs", value_name = "FILE")]
    exclude_bindep: Option<PathBuf>,

    /// Collections to ignore entirely, one per line ('~' prefix for a
    /// regular expression)
    #[arg(long = "exclude-collection-reqs", value_name = "FILE")]
    exclude_collections: Option<PathBuf>,

    /// Write the merged Python requirements to this file
    #[arg(long, value_name = "FILE")]
    write_pip: Option<PathBuf>,

    /// Write the merged system requirements to this file
    #[arg(long, value_name = "FILE")]
    write_bindep: Option<PathBuf>,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "yaml")]
    output: OutputFormat,

    /// Print the unfiltered per-collection data instead of the merged lists
    #[arg(long)]
    raw: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl OutputFormat {
    fn render<T: Serialize>(self, value: &T) -> anyhow::Result<String> {
        Ok(match self {
            Self::Yaml => format!("---\n{}", serde_yaml::to_string(value)?),
            Self::Json => format!("{}\n", serde_json::to_string_pretty(value)?),
        })
    }
}

impl Introspect {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self) -> anyhow::Result<()> {
        print!("{}", self.execute()?);
        Ok(())
    }

    /// Gather, filter and write out requirements, returning the rendered
    /// report.
    fn execute(&self) -> anyhow::Result<String> {
        if self.sanitize {
            tracing::warn!("--sanitize is deprecated; requirements are always sanitized");
        }

        tracing::info!("# Dependency data for {}", self.folder.display());

        let data = process(&self.folder, &self.options()).with_context(|| {
            format!(
                "failed to gather requirements from {}",
                self.folder.display()
            )
        })?;
        let filtered = data.filter().context("invalid exclusion rule")?;

        self.write_files(&filtered)?;

        if self.raw {
            self.output.render(&data)
        } else {
            self.output.render(&filtered)
        }
    }

    fn options(&self) -> Options {
        Options {
            user_pip: self.user_pip.clone(),
            user_bindep: self.user_bindep.clone(),
            exclude_pip: self.exclude_pip.clone(),
            exclude_bindep: self.exclude_bindep.clone(),
            exclude_collections: self.exclude_collections.clone(),
        }
    }

    fn write_files(&self, filtered: &FilteredRequirements) -> anyhow::Result<()> {
        for (destination, lines) in [
            (&self.write_pip, &filtered.python),
            (&self.write_bindep, &filtered.system),
        ] {
            if let Some(path) = destination {
                write_if_any(path, lines)?;
            }
        }
        Ok(())
    }
}

fn write_if_any(path: &Path, lines: &[String]) -> anyhow::Result<()> {
    if lines.is_empty() {
        tracing::info!("No requirements to write to {}", path.display());
        return Ok(());
    }
    introspect::write_requirements(path, lines)
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!("Wrote {} requirements to {}", lines.len(), path.display());
    Ok(())
}
