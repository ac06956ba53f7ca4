//! Evernote note-store access: notebook listing and note metadata lookups over Thrift.

pub mod client;
pub mod thrift;

pub use client::*;

// self
use crate::_prelude::*;

/// Maximum number of notes an Evernote account may hold (`EDAM_USER_NOTES_MAX`).
pub const EDAM_USER_NOTES_MAX: i32 = 100_000;

/// Note-store RPC failures.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum NoteStoreError {
	/// Response could not be decoded.
	#[error("Malformed note-store response: {message}.")]
	Protocol {
		/// Decoder diagnostic.
		message: String,
	},
	/// Note store answered with a non-success HTTP status.
	#[error("Note store returned HTTP {status}.")]
	Http {
		/// HTTP status code.
		status: u16,
	},
	/// `EDAMUserException`: the request was invalid for this user.
	#[error("Evernote rejected the request ({}).", code_name(.error_code))]
	User {
		/// `EDAMErrorCode` value.
		error_code: i32,
		/// Offending parameter, when reported.
		parameter: Option<String>,
	},
	/// `EDAMSystemException`: service-side failure or rate limiting.
	#[error("Evernote service error ({}).", code_name(.error_code))]
	System {
		/// `EDAMErrorCode` value.
		error_code: i32,
		/// Service message, when reported.
		message: Option<String>,
		/// Seconds to wait when rate limited.
		rate_limit_duration: Option<i32>,
	},
	/// `EDAMNotFoundException`.
	#[error("Evernote could not find {}.", .identifier.as_deref().unwrap_or("the requested object"))]
	NotFound {
		/// Identifier type that was not found.
		identifier: Option<String>,
		/// Value that was looked up.
		key: Option<String>,
	},
	/// `TApplicationException` (unknown method, internal error, ...).
	#[error("Note store application error {kind}: {}.", .message.as_deref().unwrap_or("no message"))]
	Application {
		/// `TApplicationException` type code.
		kind: i32,
		/// Exception message.
		message: Option<String>,
	},
}
impl NoteStoreError {
	pub(crate) fn protocol(message: impl Into<String>) -> Self {
		Self::Protocol { message: message.into() }
	}

	/// `true` when the token is invalid or expired and the user must re-authorize.
	pub fn requires_reauthorization(&self) -> bool {
		matches!(self, Self::User { error_code: 8 | 9, .. } | Self::System { error_code: 8 | 9, .. })
	}
}

fn code_name(code: &i32) -> &'static str {
	error_code_name(*code)
}

/// Symbolic name of an `EDAMErrorCode`.
pub fn error_code_name(code: i32) -> &'static str {
	match code {
		1 => "UNKNOWN",
		2 => "BAD_DATA_FORMAT",
		3 => "PERMISSION_DENIED",
		4 => "INTERNAL_ERROR",
		5 => "DATA_REQUIRED",
		6 => "LIMIT_REACHED",
		7 => "QUOTA_REACHED",
		8 => "INVALID_AUTH",
		9 => "AUTH_EXPIRED",
		10 => "DATA_CONFLICT",
		11 => "ENML_VALIDATION",
		12 => "SHARD_UNAVAILABLE",
		13 => "LEN_TOO_SHORT",
		14 => "LEN_TOO_LONG",
		15 => "TOO_FEW",
		16 => "TOO_MANY",
		17 => "UNSUPPORTED_OPERATION",
		18 => "TAKEN_DOWN",
		19 => "RATE_LIMIT_REACHED",
		_ => "UNRECOGNIZED",
	}
}

/// Notebook summary.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notebook {
	/// Notebook GUID.
	pub guid: String,
	/// Display name.
	pub name: String,
	/// Stack the notebook belongs to.
	pub stack: Option<String>,
	/// Whether this is the account's default notebook.
	pub default_notebook: bool,
}

/// Note metadata restricted to what the listing requests.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteMetadata {
	/// Note GUID.
	pub guid: String,
	/// Note title, when requested.
	pub title: Option<String>,
}

/// One page of `findNotesMetadata` results.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NotesMetadataList {
	/// Offset of the first note in this page.
	pub start_index: i32,
	/// Total matches for the filter.
	pub total_notes: i32,
	/// Notes in this page.
	pub notes: Vec<NoteMetadata>,
}

/// `NoteFilter` subset used by the listing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NoteFilter {
	/// Restrict to a notebook.
	pub notebook_guid: Option<String>,
}

/// `NotesMetadataResultSpec` subset used by the listing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NotesMetadataResultSpec {
	/// Ask for titles.
	pub include_title: bool,
}

/// A notebook together with its note titles.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotebookListing {
	/// Notebook summary.
	pub notebook: Notebook,
	/// Notes inside it.
	pub notes: Vec<NoteMetadata>,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn expired_or_invalid_auth_requires_reauthorization() {
		assert!(NoteStoreError::User { error_code: 9, parameter: None }.requires_reauthorization());
		assert!(
			NoteStoreError::System { error_code: 8, message: None, rate_limit_duration: None }
				.requires_reauthorization()
		);
		assert!(!NoteStoreError::User { error_code: 3, parameter: None }.requires_reauthorization());
		assert_eq!(
			NoteStoreError::User { error_code: 9, parameter: None }.to_string(),
			"Evernote rejected the request (AUTH_EXPIRED)."
		);
	}
}
