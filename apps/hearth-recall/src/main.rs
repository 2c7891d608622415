use clap::Parser;

use hearth_recall::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	hearth_recall::run(args).await
}
