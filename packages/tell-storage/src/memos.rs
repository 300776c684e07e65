use sqlx::{PgExecutor, QueryBuilder};
use time::OffsetDateTime;

use tell_domain::event::MemoEventPayload;

use crate::{
	Result,
	models::{Memo, MemoEvent, MemoProjection, TagCount},
};

pub struct NewEvent<'a> {
	pub memo_id: i64,
	pub owner_id: i64,
	pub payload: &'a MemoEventPayload,
	pub idempotency_key: Option<&'a str>,
	pub now: OffsetDateTime,
}

/// Read-model filter over one owner's projections.
#[derive(Debug, Clone, Default)]
pub struct ProjectionFilter {
	pub owner_id: i64,
	pub archived: Option<bool>,
	/// Exact tag membership; callers lowercase it.
	pub tag: Option<String>,
	/// Case-insensitive substring of the content.
	pub text: Option<String>,
	pub limit: i64,
}

pub async fn insert_memo<'e, E>(executor: E, owner_id: i64, now: OffsetDateTime) -> Result<i64>
where
	E: PgExecutor<'e>,
{
	let memo_id: i64 = sqlx::query_scalar(
		"INSERT INTO memos (owner_id, created_at) VALUES ($1, $2) RETURNING memo_id",
	)
	.bind(owner_id)
	.bind(now)
	.fetch_one(executor)
	.await?;

	Ok(memo_id)
}

pub async fn fetch_memo<'e, E>(executor: E, memo_id: i64, owner_id: i64) -> Result<Option<Memo>>
where
	E: PgExecutor<'e>,
{
	let memo = sqlx::query_as::<_, Memo>(
		"SELECT memo_id, owner_id, created_at FROM memos WHERE memo_id = $1 AND owner_id = $2",
	)
	.bind(memo_id)
	.bind(owner_id)
	.fetch_optional(executor)
	.await?;

	Ok(memo)
}

/// Appends one immutable event and returns its store-assigned id.
///
/// A reused `(owner_id, idempotency_key)` pair surfaces as [`crate::Error::Conflict`].
pub async fn insert_event<'e, E>(executor: E, event: &NewEvent<'_>) -> Result<i64>
where
	E: PgExecutor<'e>,
{
	let payload = event.payload.to_json()?;
	let event_id: i64 = sqlx::query_scalar(
		"\
INSERT INTO memo_events (memo_id, owner_id, event_type, payload, idempotency_key, created_at)
VALUES ($1, $2, $3, $4, $5, $6)
RETURNING event_id",
	)
	.bind(event.memo_id)
	.bind(event.owner_id)
	.bind(event.payload.event_type().as_str())
	.bind(payload)
	.bind(event.idempotency_key)
	.bind(event.now)
	.fetch_one(executor)
	.await?;

	Ok(event_id)
}

pub async fn latest_event_id<'e, E>(executor: E, memo_id: i64) -> Result<Option<i64>>
where
	E: PgExecutor<'e>,
{
	let event_id: Option<i64> =
		sqlx::query_scalar("SELECT max(event_id) FROM memo_events WHERE memo_id = $1")
			.bind(memo_id)
			.fetch_one(executor)
			.await?;

	Ok(event_id)
}

pub async fn list_events<'e, E>(executor: E, memo_id: i64, owner_id: i64) -> Result<Vec<MemoEvent>>
where
	E: PgExecutor<'e>,
{
	let events = sqlx::query_as::<_, MemoEvent>(
		"\
SELECT event_id, memo_id, owner_id, event_type, payload, idempotency_key, created_at
FROM memo_events
WHERE memo_id = $1 AND owner_id = $2
ORDER BY event_id ASC",
	)
	.bind(memo_id)
	.bind(owner_id)
	.fetch_all(executor)
	.await?;

	Ok(events)
}

pub async fn insert_projection<'e, E>(executor: E, projection: &MemoProjection) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO memo_projections (
	memo_id,
	owner_id,
	content,
	archived,
	remind_at,
	tags,
	version,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
	)
	.bind(projection.memo_id)
	.bind(projection.owner_id)
	.bind(projection.content.as_str())
	.bind(projection.archived)
	.bind(projection.remind_at)
	.bind(&projection.tags)
	.bind(projection.version)
	.bind(projection.updated_at)
	.execute(executor)
	.await?;

	Ok(())
}

/// Loads a projection under an exclusive row lock held until the caller's transaction ends.
pub async fn lock_projection<'e, E>(
	executor: E,
	memo_id: i64,
	owner_id: i64,
) -> Result<Option<MemoProjection>>
where
	E: PgExecutor<'e>,
{
	let projection = sqlx::query_as::<_, MemoProjection>(
		"\
SELECT *
FROM memo_projections
WHERE memo_id = $1 AND owner_id = $2
FOR UPDATE",
	)
	.bind(memo_id)
	.bind(owner_id)
	.fetch_optional(executor)
	.await?;

	Ok(projection)
}

pub async fn fetch_projection<'e, E>(
	executor: E,
	memo_id: i64,
	owner_id: i64,
) -> Result<Option<MemoProjection>>
where
	E: PgExecutor<'e>,
{
	let projection = sqlx::query_as::<_, MemoProjection>(
		"SELECT * FROM memo_projections WHERE memo_id = $1 AND owner_id = $2",
	)
	.bind(memo_id)
	.bind(owner_id)
	.fetch_optional(executor)
	.await?;

	Ok(projection)
}

pub async fn update_projection<'e, E>(executor: E, projection: &MemoProjection) -> Result<()>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
UPDATE memo_projections
SET
	content = $1,
	archived = $2,
	remind_at = $3,
	tags = $4,
	version = $5,
	updated_at = $6
WHERE memo_id = $7 AND owner_id = $8",
	)
	.bind(projection.content.as_str())
	.bind(projection.archived)
	.bind(projection.remind_at)
	.bind(&projection.tags)
	.bind(projection.version)
	.bind(projection.updated_at)
	.bind(projection.memo_id)
	.bind(projection.owner_id)
	.execute(executor)
	.await?;

	if result.rows_affected() == 0 {
		return Err(crate::Error::NotFound(format!(
			"Projection for memo {} is missing.",
			projection.memo_id
		)));
	}

	Ok(())
}

pub async fn list_projections<'e, E>(
	executor: E,
	filter: &ProjectionFilter,
) -> Result<Vec<MemoProjection>>
where
	E: PgExecutor<'e>,
{
	let mut builder = QueryBuilder::new("SELECT * FROM memo_projections WHERE owner_id = ");

	builder.push_bind(filter.owner_id);

	if let Some(archived) = filter.archived {
		builder.push(" AND archived = ");
		builder.push_bind(archived);
	}
	if let Some(tag) = filter.tag.as_ref() {
		builder.push(" AND ");
		builder.push_bind(tag.clone());
		builder.push(" = ANY(tags)");
	}
	if let Some(text) = filter.text.as_ref() {
		builder.push(" AND content ILIKE ");
		builder.push_bind(format!("%{}%", escape_like(text)));
		builder.push(" ESCAPE '\\'");
	}

	builder.push(" ORDER BY updated_at DESC, memo_id DESC LIMIT ");
	builder.push_bind(filter.limit);

	let projections = builder.build_query_as().fetch_all(executor).await?;

	Ok(projections)
}

/// Tag frequencies across an owner's non-archived memos.
pub async fn tag_counts<'e, E>(
	executor: E,
	owner_id: i64,
	prefix: Option<&str>,
	limit: i64,
) -> Result<Vec<TagCount>>
where
	E: PgExecutor<'e>,
{
	let pattern = prefix.map(|prefix| format!("{}%", escape_like(prefix)));
	let counts = sqlx::query_as::<_, TagCount>(
		"\
SELECT tag, count(*) AS count
FROM (
	SELECT unnest(tags) AS tag
	FROM memo_projections
	WHERE owner_id = $1 AND archived = false
) t
WHERE $2::text IS NULL OR tag LIKE $2 ESCAPE '\\'
GROUP BY tag
ORDER BY count DESC, tag ASC
LIMIT $3",
	)
	.bind(owner_id)
	.bind(pattern)
	.bind(limit)
	.fetch_all(executor)
	.await?;

	Ok(counts)
}

fn escape_like(raw: &str) -> String {
	let mut out = String::with_capacity(raw.len());

	for ch in raw.chars() {
		if matches!(ch, '%' | '_' | '\\') {
			out.push('\\');
		}

		out.push(ch);
	}

	out
}
