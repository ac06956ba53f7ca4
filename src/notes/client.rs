//! Note-store RPC client.

// std
use std::sync::atomic::{AtomicI32, Ordering};
// self
use crate::{
	_prelude::*,
	auth::TokenRecord,
	http::ProviderHttpClient,
	notes::{
		EDAM_USER_NOTES_MAX, NoteFilter, NoteMetadata, NoteStoreError, Notebook, NotebookListing,
		NotesMetadataList, NotesMetadataResultSpec,
		thrift::{MessageType, TType, ThriftReader, ThriftWriter},
	},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Thrift-over-HTTP client bound to one shard note-store URL.
#[derive(Debug)]
pub struct NoteStoreClient {
	http: ProviderHttpClient,
	url: Url,
	seq_id: AtomicI32,
}
impl NoteStoreClient {
	/// Creates a client for a note-store URL.
	pub fn new(http: ProviderHttpClient, url: Url) -> Self {
		Self { http, url, seq_id: AtomicI32::new(0) }
	}

	/// Creates a client for the note store recorded with a token.
	pub fn for_token(http: ProviderHttpClient, record: &TokenRecord) -> Self {
		Self::new(http, record.note_store_url.clone())
	}

	/// Note-store URL this client talks to.
	pub fn url(&self) -> &Url {
		&self.url
	}

	/// `NoteStore.listNotebooks`.
	pub async fn list_notebooks(&self, auth_token: &str) -> Result<Vec<Notebook>> {
		let mut args = ThriftWriter::new();

		args.string_field(1, auth_token).field_stop();

		self.call("listNotebooks", args, |reader| {
			read_result(reader, |reader, ttype| {
				if !reader.expect_type(ttype, TType::List)? {
					return Ok(None);
				}

				let (elem, size) = reader.list_begin()?;
				let mut notebooks = Vec::with_capacity(size.min(1024));

				for _ in 0..size {
					if elem == TType::Struct {
						notebooks.push(read_notebook(reader)?);
					} else {
						reader.skip(elem)?;
					}
				}

				Ok(Some(notebooks))
			})
		})
		.await
	}

	/// `NoteStore.findNotesMetadata`.
	pub async fn find_notes_metadata(
		&self,
		auth_token: &str,
		filter: &NoteFilter,
		offset: i32,
		max_notes: i32,
		spec: NotesMetadataResultSpec,
	) -> Result<NotesMetadataList> {
		let mut args = ThriftWriter::new();

		args.string_field(1, auth_token).field_begin(TType::Struct, 2);

		if let Some(guid) = &filter.notebook_guid {
			args.string_field(4, guid);
		}

		args.field_stop()
			.i32_field(3, offset)
			.i32_field(4, max_notes)
			.field_begin(TType::Struct, 5)
			.bool_field(2, spec.include_title)
			.field_stop()
			.field_stop();

		self.call("findNotesMetadata", args, |reader| {
			read_result(reader, |reader, ttype| {
				if !reader.expect_type(ttype, TType::Struct)? {
					return Ok(None);
				}

				read_notes_metadata_list(reader).map(Some)
			})
		})
		.await
	}

	/// Titles of every note in a notebook, paging until the reported total or the
	/// account maximum is reached.
	pub async fn notes_in_notebook(
		&self,
		auth_token: &str,
		notebook_guid: &str,
	) -> Result<Vec<NoteMetadata>> {
		let filter = NoteFilter { notebook_guid: Some(notebook_guid.to_owned()) };
		let spec = NotesMetadataResultSpec { include_title: true };
		let mut notes = Vec::new();
		let mut offset = Some(0);

		while let Some(current) = offset {
			let page = self
				.find_notes_metadata(auth_token, &filter, current, EDAM_USER_NOTES_MAX - current, spec)
				.await?;

			offset = next_offset(current, &page);
			notes.extend(page.notes);
		}

		Ok(notes)
	}

	/// Every notebook with its note titles.
	pub async fn notebook_listing(&self, auth_token: &str) -> Result<Vec<NotebookListing>> {
		const KIND: FlowKind = FlowKind::NoteListing;

		let span = FlowSpan::new(KIND, "notebook_listing");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let notebooks = self.list_notebooks(auth_token).await?;
				let mut listing = Vec::with_capacity(notebooks.len());

				for notebook in notebooks {
					let notes = self.notes_in_notebook(auth_token, &notebook.guid).await?;

					listing.push(NotebookListing { notebook, notes });
				}

				Ok(listing)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn call<T, F>(&self, method: &str, args: ThriftWriter, decode: F) -> Result<T>
	where
		F: FnOnce(&mut ThriftReader<'_>) -> Result<T>,
	{
		let seq_id = self.seq_id.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
		let mut message = ThriftWriter::new();

		message.message_begin(method, MessageType::Call, seq_id);

		let mut payload = message.into_bytes();

		payload.extend(args.into_bytes());

		let response = self.http.post_thrift(&self.url, payload).await.map_err(Error::from)?;

		if !response.metadata.is_success() {
			return Err(NoteStoreError::Http { status: response.metadata.status.unwrap_or_default() }
				.into());
		}

		let mut reader = ThriftReader::new(&response.body);
		let header = reader.message_begin()?;

		if header.kind == MessageType::Exception {
			return Err(read_application_exception(&mut reader)?.into());
		}
		if header.kind != MessageType::Reply || header.name != method || header.seq_id != seq_id {
			return Err(NoteStoreError::protocol(format!(
				"unexpected reply `{}` (seq {}) to `{method}` (seq {seq_id})",
				header.name, header.seq_id
			))
			.into());
		}

		decode(&mut reader)
	}
}

/// Offset of the next page, or `None` once the listing is complete.
///
/// Progress is counted locally; the reply's `startIndex` is not trusted.
fn next_offset(offset: i32, page: &NotesMetadataList) -> Option<i32> {
	if page.notes.is_empty() {
		return None;
	}

	let next = offset.saturating_add(i32::try_from(page.notes.len()).unwrap_or(i32::MAX));

	(next < page.total_notes && next < EDAM_USER_NOTES_MAX).then_some(next)
}

/// Decodes a `<method>_result` struct: field 0 is the success value, 1..=3 are the declared
/// EDAM exceptions.
fn read_result<T, F>(reader: &mut ThriftReader<'_>, mut success: F) -> Result<T>
where
	F: FnMut(&mut ThriftReader<'_>, TType) -> Result<Option<T>, NoteStoreError>,
{
	let mut value = None;

	while let Some((ttype, id)) = reader.field_begin()? {
		match id {
			0 => value = success(reader, ttype)?,
			1 if ttype == TType::Struct => return Err(read_user_exception(reader)?.into()),
			2 if ttype == TType::Struct => return Err(read_system_exception(reader)?.into()),
			3 if ttype == TType::Struct => return Err(read_not_found_exception(reader)?.into()),
			_ => reader.skip(ttype)?,
		}
	}

	value.ok_or_else(|| NoteStoreError::protocol("result carried neither value nor exception").into())
}

fn read_notebook(reader: &mut ThriftReader<'_>) -> Result<Notebook, NoteStoreError> {
	let mut notebook = Notebook::default();

	while let Some((ttype, id)) = reader.field_begin()? {
		match (id, ttype) {
			(1, TType::String) => notebook.guid = reader.string()?,
			(2, TType::String) => notebook.name = reader.string()?,
			(6, TType::Bool) => notebook.default_notebook = reader.bool()?,
			(12, TType::String) => notebook.stack = Some(reader.string()?),
			(_, other) => reader.skip(other)?,
		}
	}

	Ok(notebook)
}

fn read_note_metadata(reader: &mut ThriftReader<'_>) -> Result<NoteMetadata, NoteStoreError> {
	let mut note = NoteMetadata::default();

	while let Some((ttype, id)) = reader.field_begin()? {
		match (id, ttype) {
			(1, TType::String) => note.guid = reader.string()?,
			(2, TType::String) => note.title = Some(reader.string()?),
			(_, other) => reader.skip(other)?,
		}
	}

	Ok(note)
}

fn read_notes_metadata_list(
	reader: &mut ThriftReader<'_>,
) -> Result<NotesMetadataList, NoteStoreError> {
	let mut list = NotesMetadataList::default();

	while let Some((ttype, id)) = reader.field_begin()? {
		match (id, ttype) {
			(1, TType::I32) => list.start_index = reader.i32()?,
			(2, TType::I32) => list.total_notes = reader.i32()?,
			(3, TType::List) => {
				let (elem, size) = reader.list_begin()?;

				for _ in 0..size {
					if elem == TType::Struct {
						list.notes.push(read_note_metadata(reader)?);
					} else {
						reader.skip(elem)?;
					}
				}
			},
			(_, other) => reader.skip(other)?,
		}
	}

	Ok(list)
}

fn read_user_exception(reader: &mut ThriftReader<'_>) -> Result<NoteStoreError, NoteStoreError> {
	let mut error_code = 0;
	let mut parameter = None;

	while let Some((ttype, id)) = reader.field_begin()? {
		match (id, ttype) {
			(1, TType::I32) => error_code = reader.i32()?,
			(2, TType::String) => parameter = Some(reader.string()?),
			(_, other) => reader.skip(other)?,
		}
	}

	Ok(NoteStoreError::User { error_code, parameter })
}

fn read_system_exception(reader: &mut ThriftReader<'_>) -> Result<NoteStoreError, NoteStoreError> {
	let mut error_code = 0;
	let mut message = None;
	let mut rate_limit_duration = None;

	while let Some((ttype, id)) = reader.field_begin()? {
		match (id, ttype) {
			(1, TType::I32) => error_code = reader.i32()?,
			(2, TType::String) => message = Some(reader.string()?),
			(3, TType::I32) => rate_limit_duration = Some(reader.i32()?),
			(_, other) => reader.skip(other)?,
		}
	}

	Ok(NoteStoreError::System { error_code, message, rate_limit_duration })
}

fn read_not_found_exception(
	reader: &mut ThriftReader<'_>,
) -> Result<NoteStoreError, NoteStoreError> {
	let mut identifier = None;
	let mut key = None;

	while let Some((ttype, id)) = reader.field_begin()? {
		match (id, ttype) {
			(1, TType::String) => identifier = Some(reader.string()?),
			(2, TType::String) => key = Some(reader.string()?),
			(_, other) => reader.skip(other)?,
		}
	}

	Ok(NoteStoreError::NotFound { identifier, key })
}

fn read_application_exception(
	reader: &mut ThriftReader<'_>,
) -> Result<NoteStoreError, NoteStoreError> {
	let mut kind = 0;
	let mut message = None;

	while let Some((ttype, id)) = reader.field_begin()? {
		match (id, ttype) {
			(1, TType::String) => message = Some(reader.string()?),
			(2, TType::I32) => kind = reader.i32()?,
			(_, other) => reader.skip(other)?,
		}
	}

	Ok(NoteStoreError::Application { kind, message })
}
