use std::time::Duration;

use reqwest::{Client, header::HeaderMap};
use serde::Serialize;

use lodestar_config::Learning;
use lodestar_domain::{ResultSet, Session, TaskType};

use crate::Result;

#[derive(Debug, Serialize)]
struct StartRequest<'a> {
	session: &'a Session,
	result_set: &'a ResultSet,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
	result_set: &'a ResultSet,
	task_type: TaskType,
}

/// Notifies the active-learning service about new annotation work.
#[derive(Debug, Clone)]
pub struct HttpLearningClient {
	api_base: String,
	client: Client,
	headers: HeaderMap,
}
impl HttpLearningClient {
	pub fn new(cfg: &Learning) -> Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
		let headers = crate::auth_headers(cfg.api_key.as_deref(), &cfg.default_headers)?;

		Ok(Self { api_base: cfg.api_base.clone(), client, headers })
	}

	pub async fn start(&self, session: &Session, result_set: &ResultSet) -> Result<()> {
		self.post("start", &StartRequest { session, result_set }).await
	}

	pub async fn register(&self, result_set: &ResultSet, task_type: TaskType) -> Result<()> {
		self.post("register", &RegisterRequest { result_set, task_type }).await
	}

	async fn post<B>(&self, path: &str, body: &B) -> Result<()>
	where
		B: Serialize,
	{
		self.client
			.post(format!("{}/{path}", self.api_base))
			.headers(self.headers.clone())
			.json(body)
			.send()
			.await?
			.error_for_status()?;

		Ok(())
	}
}
