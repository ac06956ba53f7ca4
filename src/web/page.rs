//! Server-rendered HTML fragments.

// std
use std::fmt::Write as _;
// self
use crate::{
	_prelude::*,
	config::ToolSettings,
	lti::{LaunchParams, escape},
	notes::NotebookListing,
	provider::ProviderDescriptor,
};

pub(crate) const HEADER_INDEX: &str = "Evernote LTI";
pub(crate) const HEADER_ERROR: &str = "Error";
pub(crate) const HEADER_AUTHORIZE: &str = "Authorization required";
pub(crate) const HEADER_EMBED: &str = "Embed a note";
pub(crate) const HEADER_AUTHORIZED: &str = "Authorization successful";

fn layout(header: &str, body: &str) -> String {
	format!(
		"<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{header}</title>\n</head>\n<body>\n<h1>{header}</h1>\n{body}</body>\n</html>\n",
		header = escape(header),
	)
}

pub(crate) fn index(tool: &ToolSettings, config_url: &Url) -> String {
	layout(
		HEADER_INDEX,
		&format!(
			"<p>{}</p>\n<p>Tool configuration: <a href=\"{url}\">{url}</a></p>\n",
			escape(&tool.description),
			url = escape(config_url.as_str()),
		),
	)
}

pub(crate) fn error(message: &str) -> String {
	layout(HEADER_ERROR, &format!("<p class=\"error\">{}</p>\n", escape(message)))
}

pub(crate) fn authorize(username: &str, authorize_url: &Url) -> String {
	layout(
		HEADER_AUTHORIZE,
		&format!(
			"<p>Hello {}. Link your Evernote account to browse your notes.</p>\n<p><a href=\"{}\">Authorize with Evernote</a></p>\n",
			escape(username),
			escape(authorize_url.as_str()),
		),
	)
}

/// Notebook listing where each note opens in Evernote.
pub(crate) fn notebooks(
	username: &str,
	listings: &[NotebookListing],
	descriptor: &ProviderDescriptor,
) -> String {
	listing(username, listings, Some("_blank"), |guid, _| descriptor.note_link(guid))
}

/// Notebook listing where each note returns a link to the LMS editor.
pub(crate) fn embed(
	username: &str,
	listings: &[NotebookListing],
	descriptor: &ProviderDescriptor,
	return_url: &Url,
) -> String {
	listing(username, listings, None, |guid, title| {
		let mut url = return_url.clone();

		url.query_pairs_mut()
			.append_pair("return_type", "url")
			.append_pair("url", &descriptor.note_link(guid))
			.append_pair("text", title);

		url.into()
	})
}

/// Links open in `target` when given, else in the launching frame.
fn listing<F>(
	username: &str,
	listings: &[NotebookListing],
	target: Option<&str>,
	href: F,
) -> String
where
	F: Fn(&str, &str) -> String,
{
	let mut body = format!("<p>Signed in as {}.</p>\n", escape(username));
	let target = target.map(|t| format!(" target=\"{}\"", escape(t))).unwrap_or_default();

	if listings.is_empty() {
		body.push_str("<p>No notebooks found.</p>\n");
	}

	for entry in listings {
		let _ = writeln!(body, "<h2>{}</h2>", escape(&entry.notebook.name));

		if entry.notes.is_empty() {
			body.push_str("<p>This notebook is empty.</p>\n");

			continue;
		}

		body.push_str("<ul>\n");

		for note in &entry.notes {
			let title = note.title.as_deref().unwrap_or("Untitled note");
			let _ = writeln!(
				body,
				"<li><a href=\"{}\"{target}>{}</a></li>",
				escape(&href(&note.guid, title)),
				escape(title),
			);
		}

		body.push_str("</ul>\n");
	}

	layout(HEADER_EMBED, &body)
}

pub(crate) fn authorized() -> String {
	layout(
		HEADER_AUTHORIZED,
		"<p>Your Evernote account is linked. Launch the tool again from your course to see your notes.</p>\n",
	)
}

pub(crate) fn assessment(username: &str, params: &LaunchParams) -> String {
	let mut body = format!("<p>Hello {}. Your submission was received.</p>\n<dl>\n", escape(username));

	for (label, value) in [
		("Outcome service", params.lis_outcome_service_url()),
		("Result", params.lis_result_sourcedid()),
	] {
		let _ = writeln!(
			body,
			"<dt>{label}</dt><dd>{}</dd>",
			escape(value.unwrap_or("not provided"))
		);
	}

	body.push_str("</dl>\n");

	layout("Assessment", &body)
}

pub(crate) fn reset() -> String {
	layout(HEADER_INDEX, "<p>Your session was cleared.</p>\n")
}
