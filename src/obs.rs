//! Observability helpers for launch verification, the OAuth handshake, and note listing.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (implied by `server`) to emit spans named `evernote_lti.flow` carrying
//!   the `flow` and `stage` fields.
//! - Enable `metrics` to increment the `evernote_lti_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Request flows observed by the tool provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Signed LTI launch verification.
	LtiLaunch,
	/// Temporary-credential request and authorization redirect.
	RequestToken,
	/// Callback handling and access-token exchange.
	AccessToken,
	/// Note-store listing for an authorized user.
	NoteListing,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::LtiLaunch => "lti_launch",
			FlowKind::RequestToken => "request_token",
			FlowKind::AccessToken => "access_token",
			FlowKind::NoteListing => "note_listing",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a flow.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Installs the global `tracing` subscriber, honoring `RUST_LOG` and falling back to
/// `default_directive`.
#[cfg(feature = "server")]
pub fn init_tracing(default_directive: &str) {
	// crates.io
	use tracing_subscriber::EnvFilter;

	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	// A subscriber may already be installed by an embedding binary or test harness.
	let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}
