use std::sync::Arc;

use quill_service::QuillService;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<QuillService>,
}
impl AppState {
	pub async fn new(config: quill_config::Config) -> color_eyre::Result<Self> {
		let store = quill_store::connect(&config.storage).await?;

		Ok(Self::with_service(QuillService::new(config, store)))
	}

	pub fn with_service(service: QuillService) -> Self {
		Self { service: Arc::new(service) }
	}
}
