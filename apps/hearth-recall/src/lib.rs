pub mod cli;

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing_subscriber::EnvFilter;

use hearth_service::{RecallRequest, RecallService};
use hearth_store::SnapshotStore;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
	/// The full result envelope with scores and diagnostics.
	#[default]
	Json,
	/// The prompt-ready memory block.
	Context,
}

/// Run one memory recall against a snapshot of the memory tables.
#[derive(Debug, Parser)]
#[command(version = cli::VERSION, rename_all = "kebab", styles = cli::styles())]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[arg(long, short = 's', value_name = "FILE")]
	pub snapshot: PathBuf,
	#[arg(long, value_name = "ID")]
	pub elderly_id: String,
	#[arg(long, short = 'q', value_name = "TEXT", default_value = "")]
	pub query: String,
	/// Only consider records updated within this many days. Zero disables the window.
	#[arg(long, value_name = "DAYS")]
	pub window_days: Option<u32>,
	/// Score recency as of this RFC 3339 instant instead of now.
	#[arg(long, value_name = "RFC3339", value_parser = parse_instant)]
	pub as_of: Option<OffsetDateTime>,
	#[arg(long, short = 'f', value_enum, default_value_t)]
	pub format: OutputFormat,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = hearth_config::load(&args.config)?;

	init_tracing(&config)?;

	let output = recall(config, &args).await?;

	println!("{output}");

	Ok(())
}

/// Loads the snapshot, runs the call, and renders the output in the requested format.
pub async fn recall(config: hearth_config::Config, args: &Args) -> color_eyre::Result<String> {
	let snapshot = SnapshotStore::load(&args.snapshot)?;
	let service = RecallService::new(config, snapshot.adapters());
	let request = RecallRequest {
		elderly_id: args.elderly_id.clone(),
		query: args.query.clone(),
		time_window_days: args.window_days,
		as_of: args.as_of,
	};
	let response = service.recall(request).await?;

	tracing::debug!(
		call_id = %response.call_id,
		policy_id = %response.policy_id,
		items = response.items.len(),
		"Recall call completed."
	);

	Ok(match args.format {
		OutputFormat::Json => serde_json::to_string_pretty(&response)?,
		OutputFormat::Context => hearth_service::render_context(&response),
	})
}

fn parse_instant(raw: &str) -> Result<OffsetDateTime, String> {
	OffsetDateTime::parse(raw, &Rfc3339).map_err(|err| format!("Invalid RFC 3339 instant: {err}."))
}

fn init_tracing(config: &hearth_config::Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

	Ok(())
}
