//! HTTP front end: signed launch routes, the Evernote authorization round trip, and the
//! Canvas tool configuration.
//!
//! | Route | Purpose |
//! | --- | --- |
//! | `GET /` | Landing page linking the tool configuration. |
//! | `GET /tool_config.xml` | IMS tool configuration for the LMS. |
//! | `POST /lti_tool` | Resource-selection launch: notebooks and notes. |
//! | `POST /lti_tool_embed` | Editor-button launch: notes link back into the editor. |
//! | `POST /assessment` | Outcome-service launch acknowledgement. |
//! | `GET /authorize` | Obtains a temporary credential and redirects to Evernote. |
//! | `GET /callback` | Exchanges the verifier for an access token. |
//! | `GET /reset` | Forgets the browser session. |
//!
//! Failures render an error page with status 200 so the LMS iframe shows the message.

mod page;
mod routes;
mod state;

pub use routes::*;
pub use state::*;

// crates.io
use tokio::net::TcpListener;
// self
use crate::{_prelude::*, config::Settings, error::TransportError};

/// Builds the state from `settings`, binds `server.bind` and serves until Ctrl-C.
pub async fn serve(settings: &Settings) -> Result<()> {
	let state = AppState::from_settings(settings).await?;
	let listener = TcpListener::bind(settings.server.bind).await.map_err(TransportError::from)?;

	tracing::info!(
		addr = %settings.server.bind,
		consumers = settings.consumers.len(),
		storage = settings.storage.name(),
		"listening"
	);

	axum::serve(listener, router(state))
		.with_graceful_shutdown(shutdown_signal())
		.await
		.map_err(TransportError::from)?;

	tracing::info!("stopped");

	Ok(())
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %e, "failed to listen for the shutdown signal");
	}
}
