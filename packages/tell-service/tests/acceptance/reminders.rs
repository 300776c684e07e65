use time::macros::datetime;

use tell_domain::job::JobStatus;
use tell_service::{AppendEventRequest, CreateMemoRequest};

use super::OWNER;

fn reminder(memo_id: i64, remind_at: Option<time::OffsetDateTime>) -> AppendEventRequest {
	AppendEventRequest {
		owner_id: OWNER,
		memo_id,
		event_type: if remind_at.is_some() { "REMINDER_SET" } else { "REMINDER_CLEARED" }
			.to_string(),
		content: None,
		remind_at,
		idempotency_key: None,
	}
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set TELL_PG_DSN to run."]
async fn rescheduling_keeps_one_pending_job_at_the_latest_time() {
	let Some(test_db) = super::test_db().await else {
		eprintln!(
			"Skipping rescheduling_keeps_one_pending_job_at_the_latest_time; set TELL_PG_DSN to run this test."
		);

		return;
	};
	let service = super::build_service(&test_db).await;
	let memo_id = service
		.create_memo(CreateMemoRequest {
			owner_id: OWNER,
			content: "call mom".to_string(),
			remind_at: None,
			idempotency_key: None,
		})
		.await
		.expect("Failed to create memo.")
		.memo_id;
	let first = datetime!(2030-03-01 18:00:00 UTC);
	let second = datetime!(2030-03-02 18:00:00 UTC);

	service.append_event(reminder(memo_id, Some(first))).await.expect("Failed to set reminder.");
	service.append_event(reminder(memo_id, Some(second))).await.expect("Failed to set reminder.");

	let jobs = service.memo_jobs(OWNER, memo_id).await.expect("Failed to list jobs.").jobs;
	let pending = jobs
		.iter()
		.filter(|job| job.status == JobStatus::Pending.as_str())
		.collect::<Vec<_>>();

	assert_eq!(jobs.len(), 2);
	assert_eq!(jobs[0].status, JobStatus::Cancelled.as_str());
	assert_eq!(pending.len(), 1);
	assert_eq!(pending[0].due_at, second);

	let memo = service.get_memo(OWNER, memo_id).await.expect("Failed to read memo.");

	assert_eq!(memo.remind_at, Some(second));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set TELL_PG_DSN to run."]
async fn clearing_a_reminder_cancels_the_pending_job() {
	let Some(test_db) = super::test_db().await else {
		eprintln!(
			"Skipping clearing_a_reminder_cancels_the_pending_job; set TELL_PG_DSN to run this test."
		);

		return;
	};
	let service = super::build_service(&test_db).await;
	let memo_id = service
		.create_memo(CreateMemoRequest {
			owner_id: OWNER,
			content: "water plants".to_string(),
			remind_at: Some(datetime!(2030-04-01 07:00:00 UTC)),
			idempotency_key: None,
		})
		.await
		.expect("Failed to create memo.")
		.memo_id;
	let cleared =
		service.append_event(reminder(memo_id, None)).await.expect("Failed to clear reminder.");
	let jobs = service.memo_jobs(OWNER, memo_id).await.expect("Failed to list jobs.").jobs;

	assert!(jobs.iter().all(|job| job.status != JobStatus::Pending.as_str()));
	assert_eq!(jobs.len(), 1);

	let memo = service.get_memo(OWNER, memo_id).await.expect("Failed to read memo.");

	assert_eq!(memo.remind_at, None);
	assert_eq!(memo.version, cleared.event_id);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
