use std::{
	collections::HashMap,
	sync::{Mutex, PoisonError},
};

use uuid::Uuid;

use lodestar_domain::Session;

#[derive(Default)]
struct Sessions {
	by_id: HashMap<Uuid, (u64, Session)>,
	next_sequence: u64,
}

/// Registry of active annotation sessions. Sessions never expire on their own.
#[derive(Default)]
pub struct SessionStore {
	sessions: Mutex<Sessions>,
}
impl SessionStore {
	pub fn add(&self, session: Session) {
		let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
		let sequence = sessions.next_sequence;

		sessions.next_sequence += 1;
		sessions.by_id.insert(session.id, (sequence, session));
	}

	pub fn remove(&self, id: Uuid) -> Option<Session> {
		let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);

		sessions.by_id.remove(&id).map(|(_, session)| session)
	}

	/// Removes every session owned by `owner` and returns how many were removed.
	pub fn remove_by_owner(&self, owner: &str) -> usize {
		let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
		let before = sessions.by_id.len();

		sessions.by_id.retain(|_, (_, session)| session.owner != owner);

		before - sessions.by_id.len()
	}

	pub fn get(&self, id: Uuid) -> Option<Session> {
		let sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);

		sessions.by_id.get(&id).map(|(_, session)| session.clone())
	}

	/// Active sessions, oldest first.
	pub fn list(&self) -> Vec<Session> {
		let mut listed: Vec<(u64, Session)> = {
			let sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);

			sessions.by_id.values().cloned().collect()
		};

		listed.sort_by_key(|(sequence, _)| *sequence);

		listed.into_iter().map(|(_, session)| session).collect()
	}
}
