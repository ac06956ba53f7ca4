//! IMS `cartridge_basiclti_link` descriptor served at `/tool_config.xml`.

// std
use std::fmt::Write as _;
// self
use crate::{_prelude::*, error::ConfigError};

const CANVAS_PLATFORM: &str = "canvas.instructure.com";

/// Canvas editor-button / resource-selection placement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placement {
	/// Launch URL for the placement.
	pub url: Url,
	/// Button icon.
	pub icon_url: Option<Url>,
	/// Button label.
	pub text: String,
	/// Selection dialog width in pixels.
	pub selection_width: u32,
	/// Selection dialog height in pixels.
	pub selection_height: u32,
	/// Whether the placement is enabled.
	pub enabled: bool,
}
impl Placement {
	/// Placement with the Evernote button defaults (690x530 dialog).
	pub fn evernote(url: Url, icon_url: Option<Url>) -> Self {
		Self {
			url,
			icon_url,
			text: "Evernote".into(),
			selection_width: 690,
			selection_height: 530,
			enabled: true,
		}
	}
}

/// Tool configuration document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolConfig {
	/// Tool title shown by the LMS.
	pub title: String,
	/// Tool description.
	pub description: String,
	/// Main launch URL (`<base>/lti_tool`).
	pub launch_url: Url,
	/// Optional tool icon.
	pub icon_url: Option<Url>,
	/// Canvas `tool_id`.
	pub tool_id: String,
	/// Canvas `privacy_level`.
	pub privacy_level: String,
	/// Rich-editor button placement.
	pub editor_button: Placement,
	/// Resource-selection placement.
	pub resource_selection: Placement,
}
impl ToolConfig {
	/// Builds the Evernote tool configuration for a public base URL.
	///
	/// The editor button launches `/lti_tool_embed`; resource selection uses `/lti_tool`.
	pub fn evernote(
		base: &Url,
		title: impl Into<String>,
		description: impl Into<String>,
		icon_url: Option<Url>,
	) -> Result<Self> {
		let launch_url = route(base, "lti_tool")?;
		let embed_url = route(base, "lti_tool_embed")?;

		Ok(Self {
			title: title.into(),
			description: description.into(),
			editor_button: Placement::evernote(embed_url, icon_url.clone()),
			resource_selection: Placement::evernote(launch_url.clone(), icon_url.clone()),
			launch_url,
			icon_url,
			tool_id: "evernote".into(),
			privacy_level: "anonymous".into(),
		})
	}

	/// Renders the XML document with two-space indentation.
	pub fn to_xml(&self) -> String {
		let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");

		xml.push_str(concat!(
			"<cartridge_basiclti_link xmlns=\"http://www.imsglobal.org/xsd/imslticc_v1p0\"",
			" xmlns:blti=\"http://www.imsglobal.org/xsd/imsbasiclti_v1p0\"",
			" xmlns:lticm=\"http://www.imsglobal.org/xsd/imslticm_v1p0\"",
			" xmlns:lticp=\"http://www.imsglobal.org/xsd/imslticp_v1p0\"",
			" xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\"",
			" xsi:schemaLocation=\"http://www.imsglobal.org/xsd/imslticc_v1p0 http://www.imsglobal.org/xsd/lti/ltiv1p0/imslticc_v1p0.xsd",
			" http://www.imsglobal.org/xsd/imsbasiclti_v1p0 http://www.imsglobal.org/xsd/lti/ltiv1p0/imsbasiclti_v1p0p1.xsd",
			" http://www.imsglobal.org/xsd/imslticm_v1p0 http://www.imsglobal.org/xsd/lti/ltiv1p0/imslticm_v1p0.xsd",
			" http://www.imsglobal.org/xsd/imslticp_v1p0 http://www.imsglobal.org/xsd/lti/ltiv1p0/imslticp_v1p0.xsd\">\n",
		));

		let _ = writeln!(xml, "  <blti:title>{}</blti:title>", escape(&self.title));
		let _ = writeln!(xml, "  <blti:description>{}</blti:description>", escape(&self.description));

		if let Some(icon) = &self.icon_url {
			let _ = writeln!(xml, "  <blti:icon>{}</blti:icon>", escape(icon.as_str()));
		}

		let _ = writeln!(xml, "  <blti:launch_url>{}</blti:launch_url>", escape(self.launch_url.as_str()));
		let _ = writeln!(xml, "  <blti:extensions platform=\"{CANVAS_PLATFORM}\">");

		property(&mut xml, 4, "tool_id", &self.tool_id);
		property(&mut xml, 4, "privacy_level", &self.privacy_level);
		options(&mut xml, "editor_button", &self.editor_button);
		options(&mut xml, "resource_selection", &self.resource_selection);

		xml.push_str("  </blti:extensions>\n");
		xml.push_str("  <cartridge_bundle identifierref=\"BLTI001_Bundle\"/>\n");
		xml.push_str("  <cartridge_icon identifierref=\"BLTI001_Icon\"/>\n");
		xml.push_str("</cartridge_basiclti_link>\n");

		xml
	}
}

fn route(base: &Url, path: &str) -> Result<Url> {
	let raw = format!("{}/{path}", base.as_str().trim_end_matches('/'));

	Url::parse(&raw).map_err(|e| ConfigError::invalid_url(raw, e).into())
}

fn property(xml: &mut String, indent: usize, name: &str, value: &str) {
	let _ = writeln!(
		xml,
		"{:indent$}<lticm:property name=\"{}\">{}</lticm:property>",
		"",
		escape(name),
		escape(value),
	);
}

fn options(xml: &mut String, name: &str, placement: &Placement) {
	let _ = writeln!(xml, "    <lticm:options name=\"{}\">", escape(name));

	property(xml, 6, "enabled", if placement.enabled { "true" } else { "false" });

	if let Some(icon) = &placement.icon_url {
		property(xml, 6, "icon_url", icon.as_str());
	}

	property(xml, 6, "selection_height", &placement.selection_height.to_string());
	property(xml, 6, "selection_width", &placement.selection_width.to_string());
	property(xml, 6, "text", &placement.text);
	property(xml, 6, "url", placement.url.as_str());

	xml.push_str("    </lticm:options>\n");
}

/// Escapes the five XML special characters.
pub fn escape(raw: &str) -> String {
	let mut out = String::with_capacity(raw.len());

	for ch in raw.chars() {
		match ch {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' => out.push_str("&quot;"),
			'\'' => out.push_str("&apos;"),
			other => out.push(other),
		}
	}

	out
}
