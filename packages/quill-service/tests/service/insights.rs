use std::sync::{Arc, atomic::Ordering};

use quill_domain::{Identity, InsightKind, InsightUpdate};
use quill_service::{Error, SessionEvent};

use super::{RecordingStore, StubCompletion, build_service};

#[tokio::test]
async fn failing_tag_suggestions_leave_the_summary_in_place() {
	let store = Arc::new(RecordingStore::new());
	let service = build_service(store.clone(), StubCompletion::failing(&[InsightKind::SuggestTags]));
	let mut session = service.new_draft(Identity::member("user-1"), "w1");
	let mut events = session.events();

	session.set_content("Milk, eggs and bread for the week.");
	session.request_insight(InsightKind::Summarize).await.expect("summary failed");

	let err = session
		.request_insight(InsightKind::SuggestTags)
		.await
		.expect_err("Expected tag suggestions to fail.");

	assert!(matches!(err, Error::AiRequestFailure { .. }));

	let insights = session.insights();

	assert_eq!(insights.summary.as_deref(), Some("Groceries for the week."));
	assert_eq!(
		insights.key_insights,
		Some(vec!["milk".to_string(), "eggs".to_string(), "bread".to_string()])
	);
	assert_eq!(insights.suggested_tags, None);
	assert!(insights.last_processed.is_some());

	let failures: Vec<SessionEvent> = std::iter::from_fn(|| events.try_recv().ok())
		.filter(|event| matches!(event, SessionEvent::InsightFailed { .. }))
		.collect();

	assert_eq!(failures.len(), 1);
	assert!(matches!(
		&failures[0],
		SessionEvent::InsightFailed { kind: InsightKind::SuggestTags, .. }
	));
}

#[tokio::test]
async fn empty_content_is_rejected_before_any_request() {
	let store = Arc::new(RecordingStore::new());
	let completion = StubCompletion::new();
	let calls = completion.calls.clone();
	let service = build_service(store, completion);
	let err = service
		.insights
		.summarize_note("   \n")
		.await
		.expect_err("Expected empty content to be rejected.");

	assert!(matches!(err, Error::InvalidRequest { .. }));
	assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn run_all_reports_each_operation_separately() {
	let store = Arc::new(RecordingStore::new());
	let completion = StubCompletion::failing(&[InsightKind::ActionItems]);
	let calls = completion.calls.clone();
	let service = build_service(store, completion);
	let outcomes = service.insights.run_all("Call the plumber about the sink.").await;

	assert_eq!(calls.load(Ordering::SeqCst), 3);
	assert_eq!(outcomes.len(), 3);

	for outcome in outcomes {
		match outcome.kind {
			InsightKind::ActionItems => assert!(outcome.result.is_err()),
			InsightKind::SuggestTags => assert_eq!(
				outcome.result.expect("tags failed"),
				InsightUpdate::SuggestedTags(vec![
					"groceries".to_string(),
					"shopping".to_string(),
					"errands".to_string(),
				])
			),
			InsightKind::Summarize => assert!(outcome.result.is_ok()),
		}
	}
}

#[tokio::test]
async fn request_all_merges_successes_only() {
	let store = Arc::new(RecordingStore::new());
	let service = build_service(store.clone(), StubCompletion::failing(&[InsightKind::Summarize]));
	let mut session = service.new_draft(Identity::member("user-1"), "w1");
	let mut events = session.events();

	session.set_content("Email the team.");

	let results = session.request_all_insights().await;

	assert_eq!(results.iter().filter(|(_, result)| result.is_err()).count(), 1);
	assert_eq!(session.insights().summary, None);
	assert_eq!(session.insights().action_items, Some(vec!["Buy milk".to_string()]));
	assert!(session.insights().suggested_tags.is_some());

	let ready: Vec<InsightKind> = std::iter::from_fn(|| events.try_recv().ok())
		.filter_map(|event| match event {
			SessionEvent::InsightReady { kind } => Some(kind),
			_ => None,
		})
		.collect();

	assert_eq!(ready.len(), 2);
	assert!(ready.contains(&InsightKind::ActionItems));
	assert!(ready.contains(&InsightKind::SuggestTags));
}

#[tokio::test]
async fn suggested_tags_are_added_normalized() {
	let store = Arc::new(RecordingStore::new());
	let service = build_service(store.clone(), StubCompletion::new());
	let mut session = service.new_draft(Identity::member("user-1"), "w1");

	session.set_content("Weekly shop.");
	session.request_insight(InsightKind::SuggestTags).await.expect("tags failed");

	assert!(session.add_suggested_tag("Groceries"));
	assert!(!session.add_suggested_tag("groceries"));
	assert_eq!(session.draft().tags.as_slice(), ["groceries".to_string()]);
	assert!(
		session
			.insights()
			.suggested_tags
			.as_ref()
			.is_some_and(|tags| tags.contains(&"groceries".to_string()))
	);
}

#[tokio::test(start_paused = true)]
async fn insights_are_never_written_by_autosave() {
	let store = Arc::new(RecordingStore::new());
	let service = build_service(store.clone(), StubCompletion::new());
	let mut session = service.new_draft(Identity::member("user-1"), "w1");

	session.set_content("Buy milk");
	session.request_insight(InsightKind::Summarize).await.expect("summary failed");
	session.add_tag("errands");
	session.wait_for_deadline().await;
	session.persist().await.expect("create failed");
	session.wait_for_deadline().await;
	session.persist().await.expect("update failed");

	for (_, fields) in store.written() {
		if let Some(quill_store::FieldValue::Value(value)) = fields.get("aiInsights") {
			assert_eq!(value, &serde_json::json!({}));
		}
	}

	let notes = service.notes.snapshot("w1").await.expect("snapshot");

	assert!(notes[0].ai_insights.is_empty());
	assert!(session.insights().summary.is_some());
}
