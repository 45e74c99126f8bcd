use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct FeedbackRecordRow {
	pub result_set_id: Uuid,
	pub search_type: String,
	pub user_id: Option<String>,
	pub query_name: Option<String>,
	pub result_set: Value,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub struct FeedbackItemRow {
	pub result_set_id: Uuid,
	pub item_index: i32,
	pub communication_id: String,
	pub sentence_id: Option<String>,
	pub value: i16,
}
