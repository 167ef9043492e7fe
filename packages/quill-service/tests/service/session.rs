use std::{sync::Arc, time::Duration};

use serde_json::json;
use tokio::{
	sync::mpsc,
	time::{self, Instant},
};

use quill_domain::{Identity, Note};
use quill_service::{Edit, Error, SessionEvent, SessionState};

use super::{RecordingStore, StubCompletion, build_service, field};

fn drain(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
	let mut out = Vec::new();

	while let Ok(event) = events.try_recv() {
		out.push(event);
	}

	out
}

async fn existing_note(store: &Arc<RecordingStore>, title: &str, content: &str) -> Note {
	let service = build_service(store.clone(), StubCompletion::new());
	let note_id = service
		.notes
		.create(&Identity::member("user-1"), "w1", title, content)
		.await
		.expect("create");
	let mut feed = service.notes.fetch_one("w1", &note_id).await.expect("fetch");

	feed.next().await.expect("feed ended").expect("read failed")
}

#[tokio::test(start_paused = true)]
async fn typing_into_an_empty_draft_creates_one_note_after_the_debounce() {
	let store = Arc::new(RecordingStore::new());
	let service = build_service(store.clone(), StubCompletion::new());
	let mut session = service.new_draft(Identity::guest("guest-1"), "guest_workspace");
	let mut events = session.events();
	let (edits, rx) = mpsc::channel(16);
	let handle = tokio::spawn(session.run(rx));

	edits.send(Edit::SetContent("B".to_string())).await.expect("send");
	time::sleep(Duration::from_millis(500)).await;
	edits.send(Edit::SetContent("Buy".to_string())).await.expect("send");
	time::sleep(Duration::from_millis(500)).await;
	edits.send(Edit::SetContent("Buy milk".to_string())).await.expect("send");
	time::sleep(Duration::from_millis(1_999)).await;

	assert_eq!(store.upsert_count(), 0);

	time::sleep(Duration::from_millis(10)).await;

	assert_eq!(store.upsert_count(), 1);

	let notes = service.notes.snapshot("guest_workspace").await.expect("snapshot");

	assert_eq!(notes.len(), 1);
	assert_eq!(notes[0].content, "Buy milk");

	let events = drain(&mut events);

	assert_eq!(
		events,
		vec![
			SessionEvent::StateChanged(SessionState::Dirty),
			SessionEvent::StateChanged(SessionState::Saving),
			SessionEvent::Created { note_id: notes[0].id.clone() },
			SessionEvent::StateChanged(SessionState::Clean),
		]
	);

	drop(edits);

	let session = handle.await.expect("session task panicked");

	assert_eq!(session.state(), SessionState::Clean);
	assert_eq!(session.note_id(), Some(notes[0].id.as_str()));
	assert_eq!(store.upsert_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn each_edit_restarts_the_debounce() {
	let store = Arc::new(RecordingStore::new());
	let service = build_service(store.clone(), StubCompletion::new());
	let mut session = service.new_draft(Identity::member("user-1"), "w1");
	let start = Instant::now();

	session.set_title("Plan");
	time::sleep(Duration::from_millis(1_500)).await;
	session.set_title("Plans");
	session.wait_for_deadline().await;

	let elapsed = start.elapsed();

	assert!(elapsed >= Duration::from_millis(3_500));
	assert!(elapsed < Duration::from_millis(3_600));
	assert_eq!(store.upsert_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn tags_on_a_new_draft_are_saved_by_the_follow_up_update() {
	let store = Arc::new(RecordingStore::new());
	let service = build_service(store.clone(), StubCompletion::new());
	let mut session = service.new_draft(Identity::member("user-1"), "w1");

	session.set_content("Agenda");

	assert!(session.add_tag("#Work"));
	assert!(!session.add_tag("work"));
	assert_eq!(session.draft().tags.as_slice(), ["work".to_string()]);

	session.wait_for_deadline().await;
	session.persist().await.expect("create failed");

	assert_eq!(session.state(), SessionState::Dirty);
	assert!(session.has_pending_save());

	session.wait_for_deadline().await;
	session.persist().await.expect("update failed");

	assert_eq!(session.state(), SessionState::Clean);
	assert_eq!(store.upsert_count(), 2);

	let notes = service.notes.snapshot("w1").await.expect("snapshot");

	assert_eq!(notes[0].tags.as_slice(), ["work".to_string()]);
	assert_eq!(notes[0].content, "Agenda");
}

#[tokio::test(start_paused = true)]
async fn reverting_an_edit_returns_to_clean() {
	let store = Arc::new(RecordingStore::new());
	let note = existing_note(&store, "Title", "Body").await;
	let service = build_service(store.clone(), StubCompletion::new());
	let mut session = service.open(Identity::member("user-1"), "w1", &note.id).await.expect("open");

	session.set_title("Title!");

	assert_eq!(session.state(), SessionState::Dirty);

	session.set_title("Title");

	assert_eq!(session.state(), SessionState::Clean);
	assert!(!session.has_pending_save());
}

#[tokio::test(start_paused = true)]
async fn failed_save_keeps_the_draft_and_waits_for_the_next_edit() {
	let store = Arc::new(RecordingStore::new());
	let note = existing_note(&store, "Title", "Body").await;
	let service = build_service(store.clone(), StubCompletion::new());
	let mut session = service.open(Identity::member("user-1"), "w1", &note.id).await.expect("open");
	let writes_before = store.upsert_count();

	store.fail_writes(true);
	session.set_content("Body, edited");
	session.wait_for_deadline().await;

	let err = session.persist().await.expect_err("Expected the save to fail.");

	assert!(matches!(err, Error::PersistFailure { .. }));
	assert_eq!(session.state(), SessionState::Error);
	assert_eq!(session.draft().content, "Body, edited");
	assert!(!session.has_pending_save());

	time::sleep(Duration::from_secs(10)).await;

	assert_eq!(store.upsert_count(), writes_before + 1);

	store.fail_writes(false);
	session.set_content("Body, edited again");

	assert_eq!(session.state(), SessionState::Dirty);
	assert!(session.has_pending_save());

	session.wait_for_deadline().await;
	session.persist().await.expect("save failed");

	assert_eq!(session.state(), SessionState::Clean);
	assert_eq!(session.snapshot().content, "Body, edited again");
}

#[tokio::test(start_paused = true)]
async fn edits_made_during_a_save_are_saved_next() {
	let store = Arc::new(RecordingStore::new());
	let note = existing_note(&store, "Title", "Body").await;
	let service = build_service(store.clone(), StubCompletion::new());
	let mut session = service.open(Identity::member("user-1"), "w1", &note.id).await.expect("open");
	let mut events = session.events();
	let writes_before = store.upsert_count();

	store.delay_writes(Duration::from_millis(1_000));

	let (edits, rx) = mpsc::channel(16);
	let handle = tokio::spawn(session.run(rx));

	edits.send(Edit::SetContent("a".to_string())).await.expect("send");
	// The first save starts at 2000 ms and holds the store until 3000 ms.
	time::sleep(Duration::from_millis(2_100)).await;
	edits.send(Edit::SetContent("ab".to_string())).await.expect("send");
	time::sleep(Duration::from_millis(4_000)).await;

	let written: Vec<_> = store.written().into_iter().skip(writes_before).collect();

	assert_eq!(written.len(), 2);
	assert_eq!(field(&written[0].1, "content"), Some(&json!("a")));
	assert_eq!(field(&written[1].1, "content"), Some(&json!("ab")));
	assert_eq!(
		drain(&mut events),
		vec![
			SessionEvent::StateChanged(SessionState::Dirty),
			SessionEvent::StateChanged(SessionState::Saving),
			SessionEvent::Saved { note_id: note.id.clone() },
			SessionEvent::StateChanged(SessionState::Clean),
			SessionEvent::StateChanged(SessionState::Dirty),
			SessionEvent::StateChanged(SessionState::Saving),
			SessionEvent::Saved { note_id: note.id.clone() },
			SessionEvent::StateChanged(SessionState::Clean),
		]
	);

	drop(edits);

	let session = handle.await.expect("session task panicked");

	assert_eq!(session.draft().content, "ab");
}

#[tokio::test(start_paused = true)]
async fn closing_the_edit_channel_flushes_a_dirty_draft() {
	let store = Arc::new(RecordingStore::new());
	let note = existing_note(&store, "Title", "Body").await;
	let service = build_service(store.clone(), StubCompletion::new());
	let session = service.open(Identity::member("user-1"), "w1", &note.id).await.expect("open");
	let writes_before = store.upsert_count();
	let (edits, rx) = mpsc::channel(16);
	let handle = tokio::spawn(session.run(rx));

	edits.send(Edit::SetTitle("Renamed".to_string())).await.expect("send");
	drop(edits);

	let session = handle.await.expect("session task panicked");

	assert_eq!(session.state(), SessionState::Clean);
	assert_eq!(store.upsert_count(), writes_before + 1);
}

#[tokio::test(start_paused = true)]
async fn remote_updates_are_adopted_while_clean() {
	let store = Arc::new(RecordingStore::new());
	let note = existing_note(&store, "Title", "Body").await;
	let service = build_service(store.clone(), StubCompletion::new());
	let mut session = service.open(Identity::member("user-1"), "w1", &note.id).await.expect("open");
	let mut remote = note.clone();

	remote.content = "Edited elsewhere".to_string();

	assert!(session.apply_remote(&remote));
	assert_eq!(session.draft().content, "Edited elsewhere");
	assert_eq!(session.state(), SessionState::Clean);

	let mut foreign = remote.clone();

	foreign.id = "other".to_string();

	assert!(!session.apply_remote(&foreign));
}

#[tokio::test(start_paused = true)]
async fn remote_updates_do_not_overwrite_a_dirty_draft() {
	let store = Arc::new(RecordingStore::new());
	let note = existing_note(&store, "Title", "Body").await;
	let service = build_service(store.clone(), StubCompletion::new());
	let mut session = service.open(Identity::member("user-1"), "w1", &note.id).await.expect("open");

	session.set_content("Local");

	let mut remote = note.clone();

	remote.content = "Remote".to_string();
	session.apply_remote(&remote);

	assert_eq!(session.draft().content, "Local");
	assert_eq!(session.snapshot().content, "Remote");
	assert_eq!(session.state(), SessionState::Dirty);

	remote.content = "Local".to_string();
	session.apply_remote(&remote);

	assert_eq!(session.state(), SessionState::Clean);
	assert!(!session.has_pending_save());
}

#[tokio::test(start_paused = true)]
async fn opening_a_note_from_another_workspace_is_denied() {
	let store = Arc::new(RecordingStore::new());
	let note = existing_note(&store, "Title", "Body").await;
	let service = build_service(store.clone(), StubCompletion::new());
	let err = service
		.open(Identity::member("user-1"), "w2", &note.id)
		.await
		.expect_err("Expected permission denial.");

	assert!(matches!(err, Error::PermissionDenied { .. }));
}

#[tokio::test(start_paused = true)]
async fn guest_draft_over_the_quota_fails_to_save_and_writes_nothing() {
	let store = Arc::new(RecordingStore::new());
	let service = build_service(store.clone(), StubCompletion::new());
	let guest = Identity::guest("guest-1");

	for i in 0..3 {
		service
			.notes
			.create(&guest, "guest_workspace", &format!("Note {i}"), "")
			.await
			.expect("Guest should create up to three notes.");
	}

	let mut session = service.new_draft(guest, "guest_workspace");
	let mut events = session.events();

	session.set_content("One too many");
	session.wait_for_deadline().await;

	let err = session.persist().await.expect_err("Expected the quota to block the save.");

	assert!(matches!(err, Error::QuotaExceeded { limit: 3 }));
	assert_eq!(session.state(), SessionState::Error);
	assert_eq!(session.note_id(), None);
	assert_eq!(session.draft().content, "One too many");
	assert_eq!(store.upsert_count(), 3);
	assert_eq!(service.notes.snapshot("guest_workspace").await.expect("snapshot").len(), 3);

	let events = drain(&mut events);

	assert_eq!(
		&events[..3],
		[
			SessionEvent::StateChanged(SessionState::Dirty),
			SessionEvent::StateChanged(SessionState::Saving),
			SessionEvent::StateChanged(SessionState::Error),
		]
	);
	assert!(matches!(
		events.get(3),
		Some(SessionEvent::SaveFailed { message }) if message.contains('3')
	));
	assert_eq!(events.len(), 4);
}
