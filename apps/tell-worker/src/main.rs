use clap::Parser;

use tell_worker::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	tell_worker::run(Args::parse()).await
}
