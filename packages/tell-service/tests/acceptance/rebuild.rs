use time::macros::datetime;

use tell_service::{AppendEventRequest, CreateMemoRequest, Error};

use super::OWNER;

#[tokio::test]
#[ignore = "Requires external Postgres. Set TELL_PG_DSN to run."]
async fn rebuild_restores_a_damaged_projection() {
	let Some(test_db) = super::test_db().await else {
		eprintln!(
			"Skipping rebuild_restores_a_damaged_projection; set TELL_PG_DSN to run this test."
		);

		return;
	};
	let service = super::build_service(&test_db).await;
	let remind_at = datetime!(2030-05-01 12:00:00 UTC);
	let memo_id = service
		.create_memo(CreateMemoRequest {
			owner_id: OWNER,
			content: "draft #a".to_string(),
			remind_at: Some(remind_at),
			idempotency_key: None,
		})
		.await
		.expect("Failed to create memo.")
		.memo_id;
	let appended = service
		.append_event(AppendEventRequest {
			owner_id: OWNER,
			memo_id,
			event_type: "UPDATED".to_string(),
			content: Some("final #b".to_string()),
			remind_at: None,
			idempotency_key: None,
		})
		.await
		.expect("Failed to append event.");

	sqlx::query(
		"UPDATE memo_projections SET content = 'garbage', tags = '{}', remind_at = NULL, version = 0 WHERE memo_id = $1",
	)
	.bind(memo_id)
	.execute(&service.db.pool)
	.await
	.expect("Failed to damage projection.");

	let rebuilt =
		service.rebuild_projection(OWNER, memo_id).await.expect("Failed to rebuild projection.");

	assert_eq!(rebuilt.events_applied, 3);
	assert_eq!(rebuilt.version, appended.event_id);

	let memo = service.get_memo(OWNER, memo_id).await.expect("Failed to read memo.");

	assert_eq!(memo.content, "final #b");
	assert_eq!(memo.tags, vec!["b"]);
	assert_eq!(memo.remind_at, Some(remind_at));
	assert_eq!(memo.version, appended.event_id);
	assert_eq!(super::count_rows(&service, "jobs").await, 1);
	assert!(matches!(
		service.rebuild_projection(OWNER + 1, memo_id).await,
		Err(Error::NotFound { .. })
	));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
