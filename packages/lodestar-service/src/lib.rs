pub mod broker;
pub mod feedback;
pub mod pipeline;
pub mod plugins;
pub mod registry;
pub mod results;
pub mod router;
pub mod sessions;

mod error;

pub use broker::{Broker, SearchOutcome};
pub use error::{Error, ProviderFailure, Result};
pub use feedback::{FeedbackBackend, FeedbackStore, MemoryFeedbackBackend, PgFeedbackBackend};
pub use pipeline::{RegistrationOutcome, ResultsHandler};
pub use registry::{PluginRegistry, ProviderRegistry};
pub use results::ResultStore;
pub use router::{DispatchOutcome, SearchRouter, Segment};
pub use sessions::SessionStore;

use std::{future::Future, pin::Pin};

use lodestar_domain::{Query, ResultSet, SearchCapability, ServiceInfo, Session, TaskType};
use lodestar_providers::{learning::HttpLearningClient, search::HttpSearchClient};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A backend search service reachable by the router.
pub trait SearchProvider
where
	Self: Send + Sync,
{
	fn search<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, Result<ResultSet>>;

	fn alive(&self) -> BoxFuture<'_, Result<bool>>;

	fn about(&self) -> BoxFuture<'_, Result<ServiceInfo>>;

	fn capabilities(&self) -> BoxFuture<'_, Result<Vec<SearchCapability>>>;

	fn corpora(&self) -> BoxFuture<'_, Result<Vec<String>>>;
}

/// One accept/reject filter of the registration chain.
pub trait ResultsPlugin
where
	Self: Send + Sync,
{
	fn name(&self) -> &str;

	/// Returns `false` to discard the result set. Must not record anything, since a later filter
	/// or the commit itself can still fail.
	fn process(&self, result_set: &ResultSet) -> bool;

	/// Called once the result set has been committed to both stores.
	fn committed(&self, _result_set: &ResultSet) {}
}

pub trait ActiveLearningClient
where
	Self: Send + Sync,
{
	fn start<'a>(
		&'a self,
		session: &'a Session,
		result_set: &'a ResultSet,
	) -> BoxFuture<'a, Result<()>>;

	fn register<'a>(
		&'a self,
		result_set: &'a ResultSet,
		task_type: TaskType,
	) -> BoxFuture<'a, Result<()>>;
}

impl SearchProvider for HttpSearchClient {
	fn search<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, Result<ResultSet>> {
		Box::pin(async move { Ok(HttpSearchClient::search(self, query).await?) })
	}

	fn alive(&self) -> BoxFuture<'_, Result<bool>> {
		Box::pin(async move { Ok(HttpSearchClient::alive(self).await?) })
	}

	fn about(&self) -> BoxFuture<'_, Result<ServiceInfo>> {
		Box::pin(async move { Ok(HttpSearchClient::about(self).await?) })
	}

	fn capabilities(&self) -> BoxFuture<'_, Result<Vec<SearchCapability>>> {
		Box::pin(async move { Ok(HttpSearchClient::capabilities(self).await?) })
	}

	fn corpora(&self) -> BoxFuture<'_, Result<Vec<String>>> {
		Box::pin(async move { Ok(HttpSearchClient::corpora(self).await?) })
	}
}

impl ActiveLearningClient for HttpLearningClient {
	fn start<'a>(
		&'a self,
		session: &'a Session,
		result_set: &'a ResultSet,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(HttpLearningClient::start(self, session, result_set).await?) })
	}

	fn register<'a>(
		&'a self,
		result_set: &'a ResultSet,
		task_type: TaskType,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(HttpLearningClient::register(self, result_set, task_type).await?) })
	}
}
