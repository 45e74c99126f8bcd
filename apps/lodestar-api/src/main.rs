use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = lodestar_api::Args::parse();

	lodestar_api::run(args).await
}
