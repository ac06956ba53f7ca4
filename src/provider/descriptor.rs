//! Provider descriptor data structures and helpers shared by the handshake and note listing.

/// Builder API for assembling provider descriptors.
pub mod builder;

pub use builder::*;

// self
use crate::_prelude::*;

/// Endpoint set declared by a provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Temporary-credential (request token) endpoint.
	pub request_token: Url,
	/// Resource-owner authorization page.
	pub authorization: Url,
	/// Token endpoint exchanging a verifier for an access token.
	pub access_token: Url,
}

/// Immutable provider descriptor consumed by flows and the note-store client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Service root, e.g. `https://sandbox.evernote.com`.
	pub server: Url,
	/// OAuth endpoint definitions.
	pub endpoints: ProviderEndpoints,
	/// Prefix for shard note-store URLs (`<server>/edam/note/`).
	pub note_store_base: Url,
}
impl ProviderDescriptor {
	/// Evernote's developer sandbox.
	pub const SANDBOX: &'static str = "https://sandbox.evernote.com";

	/// Creates a new builder for the provided service root.
	pub fn builder(server: Url) -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::new(server)
	}

	/// Derives the standard Evernote endpoint layout from a service root.
	///
	/// Request and access tokens share `<server>/oauth`, authorization lives at
	/// `<server>/OAuth.action`.
	pub fn evernote(server: Url) -> Result<Self, ProviderDescriptorError> {
		let oauth = join(&server, "oauth")?;
		let authorization = join(&server, "OAuth.action")?;
		let note_store_base = join(&server, "edam/note/")?;

		Self::builder(server)
			.request_token_endpoint(oauth.clone())
			.authorization_endpoint(authorization)
			.access_token_endpoint(oauth)
			.note_store_base(note_store_base)
			.build()
	}

	/// Authorization page URL carrying the temporary credential.
	pub fn authorize_url(&self, request_token: &str) -> Url {
		let mut url = self.endpoints.authorization.clone();

		url.query_pairs_mut().append_pair("oauth_token", request_token);

		url
	}

	/// Note-store URL for a shard, used when the token response omits `edam_noteStoreUrl`.
	pub fn note_store_url_for_shard(&self, shard: &str) -> Result<Url, ProviderDescriptorError> {
		self.note_store_base.join(shard).map_err(|e| ProviderDescriptorError::InvalidUrl {
			value: format!("{}{shard}", self.note_store_base),
			message: e.to_string(),
		})
	}

	/// Web client link opening a note.
	pub fn note_link(&self, guid: &str) -> String {
		format!("{}/Home.action#n={guid}", self.server.as_str().trim_end_matches('/'))
	}
}

fn join(server: &Url, path: &str) -> Result<Url, ProviderDescriptorError> {
	let raw = format!("{}/{path}", server.as_str().trim_end_matches('/'));

	Url::parse(&raw)
		.map_err(|e| ProviderDescriptorError::InvalidUrl { value: raw, message: e.to_string() })
}
