// crates.io
use httpmock::prelude::*;
// self
use evernote_lti::{
	_preludet::*,
	notes::{
		NoteFilter, NoteStoreClient, NoteStoreError, NotesMetadataResultSpec,
		thrift::{MessageType, TType, ThriftWriter},
	},
};

const NOTE_STORE_PATH: &str = "/shard/s1/notestore";
const AUTH_TOKEN: &str = "S=s1:U=1d:E=abc";

fn client(server: &MockServer) -> NoteStoreClient {
	let mut url = Url::parse(&server.url(NOTE_STORE_PATH)).expect("Mock URL should parse.");

	url.set_scheme("https").expect("Mock URL should accept the https scheme.");

	NoteStoreClient::new(test_http_client(), url)
}

fn reply(method: &str, seq_id: i32, result: impl FnOnce(&mut ThriftWriter)) -> Vec<u8> {
	let mut writer = ThriftWriter::new();

	writer.message_begin(method, MessageType::Reply, seq_id);
	result(&mut writer);
	writer.field_stop();

	writer.into_bytes()
}

fn notebooks_reply(seq_id: i32, notebooks: &[(&str, &str)]) -> Vec<u8> {
	reply("listNotebooks", seq_id, |w| {
		w.field_begin(TType::List, 0).list_begin(TType::Struct, notebooks.len() as i32);

		for (guid, name) in notebooks {
			w.string_field(1, guid).string_field(2, name).bool_field(6, false).field_stop();
		}
	})
}

fn notes_reply(seq_id: i32, start: i32, total: i32, notes: &[(&str, &str)]) -> Vec<u8> {
	reply("findNotesMetadata", seq_id, |w| {
		w.field_begin(TType::Struct, 0)
			.i32_field(1, start)
			.i32_field(2, total)
			.field_begin(TType::List, 3)
			.list_begin(TType::Struct, notes.len() as i32);

		for (guid, title) in notes {
			w.string_field(1, guid).string_field(2, title).field_stop();
		}

		w.field_stop();
	})
}

#[tokio::test]
async fn list_notebooks_decodes_reply() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(NOTE_STORE_PATH)
				.header("content-type", "application/x-thrift");
			then.status(200)
				.header("content-type", "application/x-thrift")
				.body(notebooks_reply(1, &[("nb-1", "Lab"), ("nb-2", "Lectures")]));
		})
		.await;
	let notebooks = client(&server)
		.list_notebooks(AUTH_TOKEN)
		.await
		.expect("Notebook listing should decode.");

	mock.assert_async().await;

	assert_eq!(notebooks.len(), 2);
	assert_eq!(notebooks[0].guid, "nb-1");
	assert_eq!(notebooks[1].name, "Lectures");
	assert!(!notebooks[0].default_notebook);
}

#[tokio::test]
async fn find_notes_metadata_decodes_titles() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(NOTE_STORE_PATH);
			then.status(200).body(notes_reply(1, 0, 2, &[("n-1", "Week 1"), ("n-2", "Week 2")]));
		})
		.await;

	let page = client(&server)
		.find_notes_metadata(
			AUTH_TOKEN,
			&NoteFilter { notebook_guid: Some("nb-1".into()) },
			0,
			100,
			NotesMetadataResultSpec { include_title: true },
		)
		.await
		.expect("Note metadata should decode.");

	assert_eq!(page.start_index, 0);
	assert_eq!(page.total_notes, 2);
	assert_eq!(page.notes[1].guid, "n-2");
	assert_eq!(page.notes[1].title.as_deref(), Some("Week 2"));
}

#[tokio::test]
async fn user_exception_maps_to_reauthorization() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(NOTE_STORE_PATH);
			then.status(200).body(reply("listNotebooks", 1, |w| {
				w.field_begin(TType::Struct, 1)
					.i32_field(1, 9)
					.string_field(2, "authenticationToken")
					.field_stop();
			}));
		})
		.await;

	let err = client(&server)
		.notebook_listing(AUTH_TOKEN)
		.await
		.expect_err("Expired token should surface as a user exception.");

	match err {
		Error::NoteStore(e) => {
			assert!(e.requires_reauthorization());
			assert_eq!(
				e,
				NoteStoreError::User { error_code: 9, parameter: Some("authenticationToken".into()) }
			);
		},
		other => panic!("Unexpected error: {other:?}."),
	}
}

#[tokio::test]
async fn mismatched_sequence_and_http_failures_are_reported() {
	let server = MockServer::start_async().await;
	let mut stale = server
		.mock_async(|when, then| {
			when.method(POST).path(NOTE_STORE_PATH);
			then.status(200).body(notebooks_reply(7, &[]));
		})
		.await;
	let err = client(&server)
		.list_notebooks(AUTH_TOKEN)
		.await
		.expect_err("Reply for another call should be rejected.");

	assert!(matches!(err, Error::NoteStore(NoteStoreError::Protocol { .. })));

	stale.delete_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(NOTE_STORE_PATH);
			then.status(503);
		})
		.await;

	let err = client(&server)
		.list_notebooks(AUTH_TOKEN)
		.await
		.expect_err("Unavailable note store should fail.");

	assert!(matches!(err, Error::NoteStore(NoteStoreError::Http { status: 503 })));
}

#[tokio::test]
async fn empty_account_lists_no_notebooks() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(NOTE_STORE_PATH);
			then.status(200).body(notebooks_reply(1, &[]));
		})
		.await;
	let listing = client(&server)
		.notebook_listing(AUTH_TOKEN)
		.await
		.expect("Empty account should list cleanly.");

	mock.assert_calls_async(1).await;

	assert!(listing.is_empty());
}
