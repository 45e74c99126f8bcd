use std::{sync::Arc, time::Duration};

use serde::Serialize;
use uuid::Uuid;

use lodestar_config::Config;
use lodestar_domain::{Query, Session, TaskType};
use lodestar_providers::learning::HttpLearningClient;
use lodestar_storage::db::Db;

use crate::{
	ActiveLearningClient, DispatchOutcome, Error, FeedbackBackend, FeedbackStore,
	MemoryFeedbackBackend, PgFeedbackBackend, PluginRegistry, ProviderRegistry,
	RegistrationOutcome, Result, ResultStore, ResultsHandler, ResultsPlugin, SearchRouter,
	SessionStore,
};

#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
	#[serde(flatten)]
	pub dispatch: DispatchOutcome,
	pub registration: Option<RegistrationOutcome>,
}

/// Every broker component, wired once at startup.
pub struct Broker {
	pub router: SearchRouter,
	pub results: Arc<ResultStore>,
	pub sessions: SessionStore,
	pub feedback: Arc<FeedbackStore>,
	pub handler: ResultsHandler,
	learning: Option<Arc<dyn ActiveLearningClient>>,
}
impl Broker {
	pub fn new(
		router: SearchRouter,
		handler_plugins: Vec<Arc<dyn ResultsPlugin>>,
		results: ResultStore,
		feedback: FeedbackStore,
		learning: Option<Arc<dyn ActiveLearningClient>>,
	) -> Self {
		let results = Arc::new(results);
		let feedback = Arc::new(feedback);
		let handler = ResultsHandler::new(
			handler_plugins,
			results.clone(),
			feedback.clone(),
			learning.clone(),
		);

		Self { router, results, sessions: SessionStore::default(), feedback, handler, learning }
	}

	pub async fn from_config(cfg: &Config) -> Result<Self> {
		Self::from_config_with(cfg, &ProviderRegistry::default(), &PluginRegistry::default()).await
	}

	pub async fn from_config_with(
		cfg: &Config,
		providers: &ProviderRegistry,
		plugins: &PluginRegistry,
	) -> Result<Self> {
		let mut router = SearchRouter::new(Duration::from_millis(cfg.search.default_timeout_ms))
			.with_default_targets(cfg.search.default_targets.clone().unwrap_or_default());

		for provider_cfg in &cfg.search.providers {
			let provider = providers.build(provider_cfg, cfg.search.default_timeout_ms)?;

			router.register(
				provider_cfg.name.clone(),
				provider,
				provider_cfg.timeout_ms.map(Duration::from_millis),
			)?;
		}

		let chain = plugins.build_chain(&cfg.results.plugins)?;
		let backend: Arc<dyn FeedbackBackend> = match cfg.feedback.backend.as_str() {
			"memory" => Arc::new(MemoryFeedbackBackend::default()),
			_ => {
				let db = Db::connect(&cfg.storage.postgres).await?;

				db.ensure_schema().await?;

				Arc::new(PgFeedbackBackend::new(db))
			},
		};
		let learning: Option<Arc<dyn ActiveLearningClient>> = if cfg.learning.enabled {
			Some(Arc::new(HttpLearningClient::new(&cfg.learning)?))
		} else {
			None
		};

		tracing::info!(
			providers = cfg.search.providers.len(),
			plugins = chain.len(),
			feedback_backend = %cfg.feedback.backend,
			learning = cfg.learning.enabled,
			"Broker initialized."
		);

		Ok(Self::new(
			router,
			chain,
			ResultStore::new(cfg.results.max_entries),
			FeedbackStore::new(backend, cfg.feedback.cache_capacity),
			learning,
		))
	}

	/// Dispatches the query and, when `task_type` is given, registers the merged result set.
	pub async fn search(
		&self,
		query: &Query,
		targets: Option<&[String]>,
		task_type: Option<TaskType>,
	) -> Result<SearchOutcome> {
		let dispatch = self.router.dispatch(query, targets).await?;
		let registration = match task_type {
			Some(task_type) => Some(
				self.handler.register_search_result(dispatch.result_set.clone(), task_type).await?,
			),
			None => None,
		};

		Ok(SearchOutcome { dispatch, registration })
	}

	/// Opens an annotation session over a registered result set.
	pub async fn start_session(
		&self,
		owner: &str,
		result_set_id: Uuid,
		task_type: TaskType,
	) -> Result<Session> {
		if owner.trim().is_empty() {
			return Err(Error::validation("Session owner cannot be empty."));
		}

		let Some(result_set) = self.results.get_by_id(result_set_id) else {
			return Err(Error::NotFound {
				message: format!("Result set {result_set_id} is not registered."),
			});
		};
		let session = Session::start(owner, result_set_id, task_type);

		self.sessions.add(session.clone());

		tracing::info!(
			session_id = %session.id,
			%result_set_id,
			owner,
			"Started annotation session."
		);

		if let Some(learning) = self.learning.as_ref()
			&& let Err(err) = learning.start(&session, &result_set).await
		{
			tracing::warn!(session_id = %session.id, error = %err, "Active learning start failed.");
		}

		Ok(session)
	}

	pub fn stop_session(&self, session_id: Uuid) -> Result<Session> {
		let session = self.sessions.remove(session_id).ok_or_else(|| Error::NotFound {
			message: format!("Session {session_id} is not active."),
		})?;

		tracing::info!(%session_id, "Stopped annotation session.");

		Ok(session)
	}
}
