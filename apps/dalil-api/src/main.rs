use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = dalil_api::Args::parse();
	dalil_api::run(args).await
}
