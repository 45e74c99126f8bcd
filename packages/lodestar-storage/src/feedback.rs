use std::collections::HashMap;

use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use lodestar_domain::{
	FeedbackItem, FeedbackQuery, FeedbackRecord, FeedbackValue, ResultSet, SearchType,
};

use crate::{
	Error, Result,
	models::{FeedbackItemRow, FeedbackRecordRow},
};

const RECORD_COLUMNS: &str =
	"SELECT result_set_id, search_type, user_id, query_name, result_set, created_at FROM feedback_records";

/// Inserts a record and its items in one transaction. Returns `false` without writing when a
/// record with the same result set id already exists.
pub async fn insert_record(pool: &PgPool, record: &FeedbackRecord) -> Result<bool> {
	let result_set = serde_json::to_value(&record.result_set)
		.map_err(|err| Error::InvalidArgument(format!("Result set is not serializable: {err}")))?;
	let mut tx = pool.begin().await?;
	let inserted = sqlx::query(
		"\
INSERT INTO feedback_records (
	result_set_id,
	search_type,
	user_id,
	query_name,
	result_set,
	created_at
)
VALUES ($1,$2,$3,$4,$5,$6)
ON CONFLICT (result_set_id) DO NOTHING",
	)
	.bind(record.result_set_id)
	.bind(record.search_type.as_str())
	.bind(record.user_id.as_deref())
	.bind(record.query_name.as_deref())
	.bind(result_set)
	.bind(record.created_at)
	.execute(&mut *tx)
	.await?
	.rows_affected();

	if inserted == 0 {
		tx.rollback().await?;

		return Ok(false);
	}

	for (index, item) in record.items.iter().enumerate() {
		insert_item(&mut tx, record.result_set_id, index, item, record.created_at).await?;
	}

	tx.commit().await?;

	Ok(true)
}

async fn insert_item(
	conn: &mut PgConnection,
	result_set_id: Uuid,
	index: usize,
	item: &FeedbackItem,
	now: OffsetDateTime,
) -> Result<()> {
	let index = i32::try_from(index)
		.map_err(|_| Error::InvalidArgument("Result set has too many items.".to_string()))?;

	sqlx::query(
		"\
INSERT INTO feedback_items (
	result_set_id,
	item_index,
	communication_id,
	sentence_id,
	value,
	updated_at
)
VALUES ($1,$2,$3,$4,$5,$6)",
	)
	.bind(result_set_id)
	.bind(index)
	.bind(item.communication_id.as_str())
	.bind(item.sentence_id.as_deref())
	.bind(item.value.as_i16())
	.bind(now)
	.execute(conn)
	.await?;

	Ok(())
}

/// Sets the value of one item. The update is committed atomically or not at all.
pub async fn update_item(
	pool: &PgPool,
	result_set_id: Uuid,
	communication_id: &str,
	sentence_id: Option<&str>,
	value: FeedbackValue,
) -> Result<()> {
	let mut tx = pool.begin().await?;
	let updated = sqlx::query(
		"\
UPDATE feedback_items
SET value = $1, updated_at = $2
WHERE result_set_id = $3
	AND communication_id = $4
	AND sentence_id IS NOT DISTINCT FROM $5",
	)
	.bind(value.as_i16())
	.bind(OffsetDateTime::now_utc())
	.bind(result_set_id)
	.bind(communication_id)
	.bind(sentence_id)
	.execute(&mut *tx)
	.await?
	.rows_affected();

	if updated == 0 {
		tx.rollback().await?;

		return Err(Error::NotFound(format!(
			"No feedback item for {communication_id:?} in result set {result_set_id}."
		)));
	}

	tx.commit().await?;

	Ok(())
}

/// Loads one record, optionally restricted to a classification.
pub async fn fetch_record(
	pool: &PgPool,
	result_set_id: Uuid,
	search_type: Option<SearchType>,
) -> Result<Option<FeedbackRecord>> {
	let mut builder = QueryBuilder::<Postgres>::new(RECORD_COLUMNS);

	builder.push(" WHERE result_set_id = ");
	builder.push_bind(result_set_id);

	if let Some(search_type) = search_type {
		builder.push(" AND search_type = ");
		builder.push_bind(search_type.as_str());
	}

	let row: Option<FeedbackRecordRow> = builder.build_query_as().fetch_optional(pool).await?;
	let Some(row) = row else {
		return Ok(None);
	};
	let mut items = fetch_items(pool, &[row.result_set_id]).await?;
	let items = items.remove(&row.result_set_id).unwrap_or_default();

	into_record(row, items).map(Some)
}

/// Runs a filtered history query. A row that can no longer be decoded fails the whole query with
/// [`Error::InvalidRecord`], so a limited query never comes back short.
pub async fn query_records(
	pool: &PgPool,
	search_type: SearchType,
	filter: &FeedbackQuery,
) -> Result<Vec<FeedbackRecord>> {
	let mut builder = build_query(search_type, filter);
	let rows: Vec<FeedbackRecordRow> = builder.build_query_as().fetch_all(pool).await?;

	if rows.is_empty() {
		return Ok(Vec::new());
	}

	let ids: Vec<Uuid> = rows.iter().map(|row| row.result_set_id).collect();
	let mut items = fetch_items(pool, &ids).await?;
	let mut records = Vec::with_capacity(rows.len());

	for row in rows {
		let row_items = items.remove(&row.result_set_id).unwrap_or_default();

		records.push(into_record(row, row_items)?);
	}

	Ok(records)
}

/// Builds the history query. Each absent criterion adds no clause.
pub fn build_query(search_type: SearchType, filter: &FeedbackQuery) -> QueryBuilder<'static, Postgres> {
	let mut builder = QueryBuilder::<Postgres>::new(RECORD_COLUMNS);

	builder.push(" WHERE search_type = ");
	builder.push_bind(search_type.as_str());

	if let Some(start) = filter.start {
		builder.push(" AND created_at > ");
		builder.push_bind(start);
	}
	if let Some(end) = filter.end {
		builder.push(" AND created_at < ");
		builder.push_bind(end);
	}
	if let Some(users) = filter.user_names.as_ref() {
		builder.push(" AND user_id = ANY(");
		builder.push_bind(users.clone());
		builder.push(")");
	}
	if let Some(names) = filter.query_names.as_ref() {
		builder.push(" AND query_name = ANY(");
		builder.push_bind(names.clone());
		builder.push(")");
	}

	builder.push(" ORDER BY created_at DESC, result_set_id");

	if let Some(limit) = filter.limit() {
		builder.push(" LIMIT ");
		builder.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
	}

	builder
}

async fn fetch_items(pool: &PgPool, ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<FeedbackItemRow>>> {
	let rows: Vec<FeedbackItemRow> = sqlx::query_as(
		"\
SELECT result_set_id, item_index, communication_id, sentence_id, value
FROM feedback_items
WHERE result_set_id = ANY($1)
ORDER BY result_set_id, item_index",
	)
	.bind(ids)
	.fetch_all(pool)
	.await?;
	let mut grouped: HashMap<Uuid, Vec<FeedbackItemRow>> = HashMap::new();

	for row in rows {
		grouped.entry(row.result_set_id).or_default().push(row);
	}

	Ok(grouped)
}

fn into_record(row: FeedbackRecordRow, items: Vec<FeedbackItemRow>) -> Result<FeedbackRecord> {
	let search_type = SearchType::parse(&row.search_type).ok_or_else(|| {
		Error::InvalidRecord(format!("Unknown search type {:?}.", row.search_type))
	})?;
	let result_set: ResultSet = serde_json::from_value(row.result_set).map_err(|err| {
		Error::InvalidRecord(format!("Result set {} is not decodable: {err}", row.result_set_id))
	})?;
	let mut feedback_items = Vec::with_capacity(items.len());

	for item in items {
		let value = FeedbackValue::from_i16(item.value).ok_or_else(|| {
			Error::InvalidRecord(format!(
				"Feedback item {} of {} has value {}.",
				item.item_index, row.result_set_id, item.value
			))
		})?;

		feedback_items.push(FeedbackItem {
			communication_id: item.communication_id,
			sentence_id: item.sentence_id,
			value,
		});
	}

	Ok(FeedbackRecord {
		result_set_id: row.result_set_id,
		search_type,
		user_id: row.user_id,
		query_name: row.query_name,
		created_at: row.created_at,
		result_set,
		items: feedback_items,
	})
}
