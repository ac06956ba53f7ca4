//! `evernote-lti` server binary.

// crates.io
use clap::Parser;
// self
use evernote_lti::{
	config::{Cli, Settings},
	error::Result,
	obs, web,
};

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	obs::init_tracing("info");

	let mut settings = Settings::load(&cli.settings)?;

	if let Some(bind) = cli.bind {
		settings.server.bind = bind;
	}

	web::serve(&settings).await
}
