// self
use crate::{
	_prelude::*,
	provider::{ProviderDescriptor, ProviderEndpoints},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ProviderDescriptorError {
	/// Temporary-credential endpoint is mandatory.
	#[error("Missing request token endpoint.")]
	MissingRequestTokenEndpoint,
	/// Authorization page is mandatory.
	#[error("Missing authorization endpoint.")]
	MissingAuthorizationEndpoint,
	/// Token endpoint is mandatory.
	#[error("Missing access token endpoint.")]
	MissingAccessTokenEndpoint,
	/// Endpoints must use HTTPS.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// A derived URL could not be parsed.
	#[error("Derived URL `{value}` is invalid: {message}.")]
	InvalidUrl {
		/// Offending URL text.
		value: String,
		/// Parser diagnostic.
		message: String,
	},
}

/// Builder for [`ProviderDescriptor`] values.
#[derive(Debug)]
pub struct ProviderDescriptorBuilder {
	/// Service root for the descriptor being constructed.
	pub server: Url,
	/// Temporary-credential endpoint.
	pub request_token_endpoint: Option<Url>,
	/// Resource-owner authorization page.
	pub authorization_endpoint: Option<Url>,
	/// Token endpoint.
	pub access_token_endpoint: Option<Url>,
	/// Optional note-store prefix; defaults to `<server>/edam/note/`.
	pub note_store_base: Option<Url>,
}
impl ProviderDescriptorBuilder {
	/// Creates a new builder seeded with the provided service root.
	pub fn new(server: Url) -> Self {
		Self {
			server,
			request_token_endpoint: None,
			authorization_endpoint: None,
			access_token_endpoint: None,
			note_store_base: None,
		}
	}

	/// Sets the temporary-credential endpoint.
	pub fn request_token_endpoint(mut self, url: Url) -> Self {
		self.request_token_endpoint = Some(url);

		self
	}

	/// Sets the authorization page.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.authorization_endpoint = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn access_token_endpoint(mut self, url: Url) -> Self {
		self.access_token_endpoint = Some(url);

		self
	}

	/// Overrides the note-store prefix.
	pub fn note_store_base(mut self, url: Url) -> Self {
		self.note_store_base = Some(url);

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ProviderDescriptor, ProviderDescriptorError> {
		let request_token = self
			.request_token_endpoint
			.ok_or(ProviderDescriptorError::MissingRequestTokenEndpoint)?;
		let authorization = self
			.authorization_endpoint
			.ok_or(ProviderDescriptorError::MissingAuthorizationEndpoint)?;
		let access_token =
			self.access_token_endpoint.ok_or(ProviderDescriptorError::MissingAccessTokenEndpoint)?;
		let note_store_base = match self.note_store_base {
			Some(url) => url,
			None => {
				let raw = format!("{}/edam/note/", self.server.as_str().trim_end_matches('/'));

				Url::parse(&raw).map_err(|e| ProviderDescriptorError::InvalidUrl {
					value: raw,
					message: e.to_string(),
				})?
			},
		};
		let descriptor = ProviderDescriptor {
			server: self.server,
			endpoints: ProviderEndpoints { request_token, authorization, access_token },
			note_store_base,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ProviderDescriptor {
	/// Validates invariants for the descriptor.
	fn validate(&self) -> Result<(), ProviderDescriptorError> {
		validate_endpoint("request_token", &self.endpoints.request_token)?;
		validate_endpoint("authorization", &self.endpoints.authorization)?;
		validate_endpoint("access_token", &self.endpoints.access_token)?;

		Ok(())
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ProviderDescriptorError> {
	if url.scheme() != "https" {
		Err(ProviderDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	} else {
		Ok(())
	}
}
