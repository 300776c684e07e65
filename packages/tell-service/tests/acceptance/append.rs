use std::sync::Arc;

use tell_service::{AppendEventRequest, CreateMemoRequest, Error, TellService};

use super::OWNER;

async fn seed(service: &TellService, content: &str) -> i64 {
	service
		.create_memo(CreateMemoRequest {
			owner_id: OWNER,
			content: content.to_string(),
			remind_at: None,
			idempotency_key: None,
		})
		.await
		.expect("Failed to create memo.")
		.memo_id
}

fn event(memo_id: i64, event_type: &str, content: Option<&str>) -> AppendEventRequest {
	AppendEventRequest {
		owner_id: OWNER,
		memo_id,
		event_type: event_type.to_string(),
		content: content.map(str::to_string),
		remind_at: None,
		idempotency_key: None,
	}
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set TELL_PG_DSN to run."]
async fn appended_events_advance_version_to_latest_event() {
	let Some(test_db) = super::test_db().await else {
		eprintln!(
			"Skipping appended_events_advance_version_to_latest_event; set TELL_PG_DSN to run this test."
		);

		return;
	};
	let service = super::build_service(&test_db).await;
	let memo_id = seed(&service, "draft #idea").await;
	let mut last_version = 0;

	for (event_type, content) in [
		("UPDATED", Some("final #plan #Idea")),
		("archived", None),
		(" Restored ", None),
	] {
		let appended = service
			.append_event(event(memo_id, event_type, content))
			.await
			.expect("Failed to append event.");

		assert_eq!(appended.version, appended.event_id);
		assert!(appended.version > last_version);

		last_version = appended.version;
	}

	let memo = service.get_memo(OWNER, memo_id).await.expect("Failed to read memo.");
	let timeline = service.memo_timeline(OWNER, memo_id).await.expect("Failed to read timeline.");

	assert_eq!(memo.content, "final #plan #Idea");
	assert_eq!(memo.tags, vec!["plan", "idea"]);
	assert!(!memo.archived);
	assert_eq!(memo.version, last_version);
	assert_eq!(timeline.events.last().map(|event| event.event_id), Some(memo.version));
	assert!(timeline.events.windows(2).all(|pair| pair[0].event_id < pair[1].event_id));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set TELL_PG_DSN to run."]
async fn invalid_events_leave_no_writes() {
	let Some(test_db) = super::test_db().await else {
		eprintln!("Skipping invalid_events_leave_no_writes; set TELL_PG_DSN to run this test.");

		return;
	};
	let service = super::build_service(&test_db).await;
	let memo_id = seed(&service, "stable").await;
	let before = service.get_memo(OWNER, memo_id).await.expect("Failed to read memo.");
	let rejected = [
		event(memo_id, "SNOOZED", None),
		event(memo_id, "CREATED", Some("again")),
		event(memo_id, "UPDATED", Some("   ")),
		event(memo_id, "REMINDER_SET", None),
	];

	for request in rejected {
		let err = service.append_event(request).await.expect_err("Expected an invalid event.");

		assert!(matches!(err, Error::InvalidEvent { .. }), "Unexpected error: {err}");
	}

	let after = service.get_memo(OWNER, memo_id).await.expect("Failed to read memo.");

	assert_eq!(after.version, before.version);
	assert_eq!(after.content, before.content);
	assert_eq!(super::count_rows(&service, "memo_events").await, 1);
	assert_eq!(super::count_rows(&service, "jobs").await, 0);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set TELL_PG_DSN to run."]
async fn foreign_or_missing_memos_are_not_found() {
	let Some(test_db) = super::test_db().await else {
		eprintln!(
			"Skipping foreign_or_missing_memos_are_not_found; set TELL_PG_DSN to run this test."
		);

		return;
	};
	let service = super::build_service(&test_db).await;
	let memo_id = seed(&service, "mine").await;
	let mut foreign = event(memo_id, "ARCHIVED", None);

	foreign.owner_id = OWNER + 1;

	let err = service.append_event(foreign).await.expect_err("Expected not found.");

	assert!(matches!(err, Error::NotFound { .. }), "Unexpected error: {err}");

	let err = service
		.append_event(event(memo_id + 1_000, "ARCHIVED", None))
		.await
		.expect_err("Expected not found.");

	assert!(matches!(err, Error::NotFound { .. }), "Unexpected error: {err}");
	assert!(matches!(service.get_memo(OWNER + 1, memo_id).await, Err(Error::NotFound { .. })));
	assert!(matches!(
		service.memo_timeline(OWNER + 1, memo_id).await,
		Err(Error::NotFound { .. })
	));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set TELL_PG_DSN to run."]
async fn reused_append_key_conflicts_and_rolls_back() {
	let Some(test_db) = super::test_db().await else {
		eprintln!(
			"Skipping reused_append_key_conflicts_and_rolls_back; set TELL_PG_DSN to run this test."
		);

		return;
	};
	let service = super::build_service(&test_db).await;
	let memo_id = seed(&service, "v1").await;
	let mut first = event(memo_id, "UPDATED", Some("v2"));

	first.idempotency_key = Some("edit-1".to_string());

	let mut retry = first.clone();

	retry.content = Some("v3".to_string());

	let applied = service.append_event(first).await.expect("Failed to append event.");
	let err = service.append_event(retry).await.expect_err("Expected a conflict.");

	assert!(matches!(err, Error::Conflict { .. }), "Unexpected error: {err}");

	let memo = service.get_memo(OWNER, memo_id).await.expect("Failed to read memo.");

	assert_eq!(memo.content, "v2");
	assert_eq!(memo.version, applied.version);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set TELL_PG_DSN to run."]
async fn concurrent_appends_serialize_on_the_projection() {
	let Some(test_db) = super::test_db().await else {
		eprintln!(
			"Skipping concurrent_appends_serialize_on_the_projection; set TELL_PG_DSN to run this test."
		);

		return;
	};
	let service = Arc::new(super::build_service(&test_db).await);
	let memo_id = seed(&service, "start").await;
	let mut handles = Vec::new();

	for idx in 0..12 {
		let service = Arc::clone(&service);

		handles.push(tokio::spawn(async move {
			let content = format!("edit {idx} #t{idx}");

			service
				.append_event(event(memo_id, "UPDATED", Some(&content)))
				.await
				.expect("Failed to append event.")
		}));
	}

	for handle in handles {
		handle.await.expect("Append task panicked.");
	}

	let memo = service.get_memo(OWNER, memo_id).await.expect("Failed to read memo.");
	let timeline = service.memo_timeline(OWNER, memo_id).await.expect("Failed to read timeline.");
	let last = timeline.events.last().expect("Expected events.");

	assert_eq!(timeline.events.len(), 13);
	assert_eq!(memo.version, last.event_id);
	assert_eq!(Some(memo.content.as_str()), last.content.as_deref());

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
