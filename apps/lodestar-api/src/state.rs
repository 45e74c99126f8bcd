use std::sync::Arc;

use lodestar_service::Broker;

#[derive(Clone)]
pub struct AppState {
	pub broker: Arc<Broker>,
}
impl AppState {
	pub async fn new(config: &lodestar_config::Config) -> color_eyre::Result<Self> {
		let broker = Broker::from_config(config).await?;

		Ok(Self::from_broker(broker))
	}

	pub fn from_broker(broker: Broker) -> Self {
		Self { broker: Arc::new(broker) }
	}
}
