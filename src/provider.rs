//! Provider-facing descriptors for the Evernote OAuth 1.0a service.
//!
//! `descriptor` exposes validated metadata ([`ProviderDescriptor`]) covering the HTTPS-only
//! temporary-credential, authorization, and token endpoints together with the note-store
//! base used when a token response omits its shard URL.

pub mod descriptor;

pub use descriptor::*;
