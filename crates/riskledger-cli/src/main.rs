//! `riskledger`: command-line client for the riskledger server.
//!
//! # Usage
//!
//! ```
//! riskledger --url http://localhost:8640 migrate risks
//! riskledger capture
//! riskledger trends project --months 6
//! riskledger trend EPC7-R001 --field emv
//! riskledger --config ~/.config/riskledger/cli.toml master EPC7-R001
//! ```

mod client;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::ApiClient;
use riskledger_core::kind::EntityKind;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

const DEFAULT_URL: &str = "http://localhost:8640";

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "riskledger", about = "Command-line client for the riskledger server")]
struct Args {
  /// Path to a TOML config file (url).
  #[arg(short, long, value_name = "FILE")]
  config: Option<std::path::PathBuf>,

  /// Base URL of the riskledger server (default: http://localhost:8640).
  #[arg(long, env = "RISKLEDGER_URL")]
  url: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Run the one-shot legacy migration for `risks` or `issues`.
  Migrate {
    #[arg(value_parser = parse_kind)]
    kind: EntityKind,
  },
  /// Capture the current bi-weekly period for every active master.
  Capture,
  /// Portfolio dashboard series.
  Trends {
    #[command(subcommand)]
    which: TrendsCommand,
  },
  /// One metric per month for one kind.
  Monthly {
    #[arg(value_parser = parse_kind)]
    kind:    EntityKind,
    /// Metric name, e.g. `totalEMV` or `avgDaysOpen`.
    #[arg(long)]
    metric:  String,
    /// Restrict to a single project code.
    #[arg(long)]
    project: Option<String>,
    #[arg(long)]
    months:  Option<u32>,
  },
  /// The history of one field of one entity.
  Trend {
    entity_id: String,
    /// Field name; the server picks `emv` for risks, `daysOpen` for issues.
    #[arg(long)]
    field:     Option<String>,
  },
  /// Show a master record.
  Master { entity_id: String },
}

#[derive(Subcommand, Debug)]
enum TrendsCommand {
  /// Risk series: EMV, count, contingency and impact value.
  Project {
    #[arg(long)]
    months: Option<u32>,
  },
  /// Issue series: totals, open, critical, impact value and days open.
  Issues {
    #[arg(long)]
    months: Option<u32>,
  },
}

fn parse_kind(s: &str) -> Result<EntityKind, String> {
  EntityKind::parse(s).map_err(|e| e.to_string())
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url: String,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(tracing::Level::WARN.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let base_url = args
    .url
    .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
    .unwrap_or_else(|| DEFAULT_URL.to_string());

  let client = ApiClient::new(base_url)?;

  match args.command {
    Command::Migrate { kind } => print(&client.migrate(kind).await?),
    Command::Capture => print(&client.capture().await?),
    Command::Trends { which: TrendsCommand::Project { months } } => {
      print(&client.project_trends(months).await?)
    }
    Command::Trends { which: TrendsCommand::Issues { months } } => {
      print(&client.issue_trends(months).await?)
    }
    Command::Monthly { kind, metric, project, months } => {
      print(&client.monthly_trend(kind, &metric, project.as_deref(), months).await?)
    }
    Command::Trend { entity_id, field } => {
      print(&client.entity_trend(&entity_id, field.as_deref()).await?)
    }
    Command::Master { entity_id } => print(&client.master(&entity_id).await?),
  }
}

fn print<T: Serialize>(value: &T) -> Result<()> {
  let out = serde_json::to_string_pretty(value).context("serialising response")?;
  println!("{out}");
  Ok(())
}
