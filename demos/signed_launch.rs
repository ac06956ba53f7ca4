//! Prints a signed LTI launch for a locally running tool, ready to paste into `curl`.
//!
//! ```text
//! cargo run --example signed_launch -- http://localhost:9292/lti_tool test secret user-1
//! ```

// std
use std::env;
// crates.io
use color_eyre::Result;
use rand::{Rng, distr::Alphanumeric};
use time::OffsetDateTime;
use url::Url;
// self
use evernote_lti::oauth1::{self, SignatureMethod};

fn main() -> Result<()> {
	color_eyre::install()?;

	let mut args = env::args().skip(1);
	let launch_url =
		Url::parse(&args.next().unwrap_or_else(|| "http://localhost:9292/lti_tool".into()))?;
	let key = args.next().unwrap_or_else(|| "test".into());
	let secret = args.next().unwrap_or_else(|| "secret".into());
	let user_id = args.next().unwrap_or_else(|| "demo-user".into());
	let nonce: String = rand::rng().sample_iter(Alphanumeric).take(24).map(char::from).collect();
	let mut params: Vec<(String, String)> = vec![
		("oauth_consumer_key".into(), key),
		("oauth_nonce".into(), nonce),
		("oauth_signature_method".into(), SignatureMethod::HmacSha1.as_str().into()),
		("oauth_timestamp".into(), OffsetDateTime::now_utc().unix_timestamp().to_string()),
		("oauth_version".into(), "1.0".into()),
		("lti_message_type".into(), "basic-lti-launch-request".into()),
		("lti_version".into(), "LTI-1p0".into()),
		("resource_link_id".into(), "demo-link".into()),
		("user_id".into(), user_id),
		("lis_person_name_given".into(), "Demo".into()),
		("launch_presentation_return_url".into(), "http://localhost:9292/".into()),
	];
	let signature =
		oauth1::sign(SignatureMethod::HmacSha1, "POST", &launch_url, &params, &secret, None);

	params.push(("oauth_signature".into(), signature));

	let form = serde_urlencoded::to_string(&params)?;

	println!(
		"curl -i -X POST '{launch_url}' -H 'Content-Type: application/x-www-form-urlencoded' --data '{form}'"
	);

	Ok(())
}
