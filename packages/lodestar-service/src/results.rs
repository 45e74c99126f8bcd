use std::{
	collections::{BTreeSet, HashMap},
	sync::{Mutex, PoisonError},
};

use time::OffsetDateTime;
use uuid::Uuid;

use lodestar_domain::{ResultSet, TaskType};

/// A registered result set together with the task types that claimed it.
#[derive(Debug, Clone)]
pub struct StoredResult {
	pub result_set: ResultSet,
	pub task_types: BTreeSet<TaskType>,
	pub created_at: OffsetDateTime,
	sequence: u64,
}

#[derive(Default)]
struct Entries {
	by_id: HashMap<Uuid, StoredResult>,
	next_sequence: u64,
}

/// In-memory index of registered result sets.
///
/// Every read and write goes through one lock. Ordering is by commit sequence, newest first.
#[derive(Default)]
pub struct ResultStore {
	entries: Mutex<Entries>,
	max_entries: Option<usize>,
}
impl ResultStore {
	pub fn new(max_entries: Option<usize>) -> Self {
		Self { entries: Mutex::default(), max_entries }
	}

	/// Stores the result set under `task_type`. A known id only gains the task type; the stored
	/// result set and its position in the ordering are kept. Returns `true` for a new id.
	pub fn add(&self, result_set: ResultSet, task_type: TaskType) -> bool {
		let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

		if let Some(existing) = entries.by_id.get_mut(&result_set.id) {
			existing.task_types.insert(task_type);

			return false;
		}

		let sequence = entries.next_sequence;

		entries.next_sequence += 1;
		entries.by_id.insert(
			result_set.id,
			StoredResult {
				result_set,
				task_types: BTreeSet::from([task_type]),
				created_at: OffsetDateTime::now_utc(),
				sequence,
			},
		);

		if let Some(max_entries) = self.max_entries {
			while entries.by_id.len() > max_entries {
				let Some(oldest) = entries
					.by_id
					.values()
					.min_by_key(|entry| entry.sequence)
					.map(|entry| entry.result_set.id)
				else {
					break;
				};

				entries.by_id.remove(&oldest);

				tracing::debug!(result_set_id = %oldest, "Evicted oldest stored result set.");
			}
		}

		true
	}

	pub fn get_by_id(&self, id: Uuid) -> Option<ResultSet> {
		self.entry(id).map(|entry| entry.result_set)
	}

	pub fn entry(&self, id: Uuid) -> Option<StoredResult> {
		let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

		entries.by_id.get(&id).cloned()
	}

	/// Most recent result set whose query came from `user_id`.
	pub fn get_latest(&self, user_id: &str) -> Option<ResultSet> {
		self.select(|entry| entry.result_set.user_id() == Some(user_id), 1).into_iter().next()
	}

	/// Result sets claimed by `task_type`, newest first. A `limit` of zero is unbounded.
	pub fn get_by_task(&self, task_type: TaskType, limit: usize) -> Vec<ResultSet> {
		self.select(|entry| entry.task_types.contains(&task_type), limit)
	}

	pub fn get_by_user(&self, task_type: TaskType, user_id: &str, limit: usize) -> Vec<ResultSet> {
		self.select(
			|entry| {
				entry.task_types.contains(&task_type) && entry.result_set.user_id() == Some(user_id)
			},
			limit,
		)
	}

	pub fn len(&self) -> usize {
		self.entries.lock().unwrap_or_else(PoisonError::into_inner).by_id.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn select<F>(&self, filter: F, limit: usize) -> Vec<ResultSet>
	where
		F: Fn(&StoredResult) -> bool,
	{
		let mut matched: Vec<StoredResult> = {
			let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

			entries.by_id.values().filter(|entry| filter(entry)).cloned().collect()
		};

		matched.sort_by(|a, b| b.sequence.cmp(&a.sequence));

		if limit != 0 {
			matched.truncate(limit);
		}

		matched.into_iter().map(|entry| entry.result_set).collect()
	}
}
