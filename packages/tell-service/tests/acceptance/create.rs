use time::macros::datetime;

use tell_domain::job::JobStatus;
use tell_service::{CreateMemoRequest, Error};

use super::OWNER;

#[tokio::test]
#[ignore = "Requires external Postgres. Set TELL_PG_DSN to run."]
async fn created_memo_projects_tags_and_first_version() {
	let Some(test_db) = super::test_db().await else {
		eprintln!(
			"Skipping created_memo_projects_tags_and_first_version; set TELL_PG_DSN to run this test."
		);

		return;
	};
	let service = super::build_service(&test_db).await;
	let created = service
		.create_memo(CreateMemoRequest {
			owner_id: OWNER,
			content: "  buy milk #errand ".to_string(),
			remind_at: None,
			idempotency_key: None,
		})
		.await
		.expect("Failed to create memo.");

	assert_eq!(created.version, 1);

	let memo = service.get_memo(OWNER, created.memo_id).await.expect("Failed to read memo.");

	assert_eq!(memo.content, "buy milk #errand");
	assert_eq!(memo.tags, vec!["errand"]);
	assert!(!memo.archived);
	assert_eq!(memo.remind_at, None);
	assert_eq!(memo.version, created.version);

	let timeline =
		service.memo_timeline(OWNER, created.memo_id).await.expect("Failed to read timeline.");

	assert_eq!(timeline.events.len(), 1);
	assert_eq!(timeline.events[0].event_type, "CREATED");
	assert_eq!(timeline.events[0].event_id, created.version);
	assert_eq!(super::count_rows(&service, "jobs").await, 0);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set TELL_PG_DSN to run."]
async fn created_memo_with_reminder_schedules_dispatch() {
	let Some(test_db) = super::test_db().await else {
		eprintln!(
			"Skipping created_memo_with_reminder_schedules_dispatch; set TELL_PG_DSN to run this test."
		);

		return;
	};
	let service = super::build_service(&test_db).await;
	let remind_at = datetime!(2030-01-01 09:00:00 UTC);
	let created = service
		.create_memo(CreateMemoRequest {
			owner_id: OWNER,
			content: "dentist".to_string(),
			remind_at: Some(remind_at),
			idempotency_key: None,
		})
		.await
		.expect("Failed to create memo.");
	let timeline =
		service.memo_timeline(OWNER, created.memo_id).await.expect("Failed to read timeline.");
	let types = timeline.events.iter().map(|event| event.event_type.as_str()).collect::<Vec<_>>();

	assert_eq!(types, vec!["CREATED", "REMINDER_SET"]);
	assert_eq!(timeline.events.last().map(|event| event.event_id), Some(created.version));
	assert_eq!(timeline.events[1].remind_at, Some(remind_at));

	let jobs = service.memo_jobs(OWNER, created.memo_id).await.expect("Failed to list jobs.");

	assert_eq!(jobs.jobs.len(), 1);
	assert_eq!(jobs.jobs[0].status, JobStatus::Pending.as_str());
	assert_eq!(jobs.jobs[0].due_at, remind_at);
	assert_eq!(jobs.jobs[0].max_attempts, service.cfg.scheduler.max_attempts);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set TELL_PG_DSN to run."]
async fn blank_content_is_rejected_without_writes() {
	let Some(test_db) = super::test_db().await else {
		eprintln!(
			"Skipping blank_content_is_rejected_without_writes; set TELL_PG_DSN to run this test."
		);

		return;
	};
	let service = super::build_service(&test_db).await;
	let err = service
		.create_memo(CreateMemoRequest {
			owner_id: OWNER,
			content: " \n\t".to_string(),
			remind_at: None,
			idempotency_key: None,
		})
		.await
		.expect_err("Expected blank content to be rejected.");

	assert!(matches!(err, Error::InvalidRequest { .. }), "Unexpected error: {err}");
	assert_eq!(super::count_rows(&service, "memos").await, 0);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set TELL_PG_DSN to run."]
async fn reused_idempotency_key_yields_one_memo() {
	let Some(test_db) = super::test_db().await else {
		eprintln!(
			"Skipping reused_idempotency_key_yields_one_memo; set TELL_PG_DSN to run this test."
		);

		return;
	};
	let service = super::build_service(&test_db).await;
	let request = CreateMemoRequest {
		owner_id: OWNER,
		content: "pay rent #bills".to_string(),
		remind_at: Some(datetime!(2030-02-01 08:00:00 UTC)),
		idempotency_key: Some(" rent-2030-02 ".to_string()),
	};

	service.create_memo(request.clone()).await.expect("First create failed.");

	let err = service.create_memo(request).await.expect_err("Expected a conflict.");

	assert!(matches!(err, Error::Conflict { .. }), "Unexpected error: {err}");
	assert_eq!(super::count_rows(&service, "memos").await, 1);
	assert_eq!(super::count_rows(&service, "memo_events").await, 2);
	assert_eq!(super::count_rows(&service, "memo_projections").await, 1);
	assert_eq!(super::count_rows(&service, "jobs").await, 1);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
