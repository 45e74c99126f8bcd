pub mod feedback;
pub mod query;
pub mod result_set;
pub mod service_info;
pub mod session;

pub use feedback::{
	CommunicationFeedback, FeedbackItem, FeedbackQuery, FeedbackRecord, FeedbackValue, NO_LIMIT,
	SentenceFeedback, SentenceKey,
};
pub use query::{Query, SearchType};
pub use result_set::{ResultItem, ResultSet, TaskType};
pub use service_info::{ProviderTagged, SearchCapability, ServiceInfo};
pub use session::Session;
