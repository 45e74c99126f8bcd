use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::result_set::TaskType;

/// An annotation session over one registered result set. Active while it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
	pub id: Uuid,
	pub owner: String,
	pub result_set_id: Uuid,
	pub task_type: TaskType,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
}
impl Session {
	pub fn start(owner: impl Into<String>, result_set_id: Uuid, task_type: TaskType) -> Self {
		Self {
			id: Uuid::new_v4(),
			owner: owner.into(),
			result_set_id,
			task_type,
			created_at: OffsetDateTime::now_utc(),
		}
	}
}
