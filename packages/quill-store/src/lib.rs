pub mod db;
pub mod document;
pub mod memory;
pub mod schema;
pub mod subscription;

mod error;

pub use document::{
	DocPath, Document, FieldValue, Fields, Filter, MergePolicy, OrderBy, Query, SortDirection,
};
pub use error::Error;
pub use subscription::Subscription;

use std::{future::Future, pin::Pin, sync::Arc};

use quill_config::{Storage, StorageBackend};

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Document database with live queries. Every subscription emits its current value first and
/// then a full replacement value whenever the underlying data changes.
pub trait RemoteStore
where
	Self: Send + Sync,
{
	fn watch_document<'a>(
		&'a self,
		path: &'a DocPath,
	) -> BoxFuture<'a, Result<Subscription<Option<Document>>>>;

	fn watch_query<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, Result<Subscription<Vec<Document>>>>;

	fn upsert<'a>(
		&'a self,
		path: &'a DocPath,
		fields: Fields,
		policy: MergePolicy,
	) -> BoxFuture<'a, Result<()>>;
}

/// Opens the backend selected by `storage.backend`.
pub async fn connect(cfg: &Storage) -> Result<Arc<dyn RemoteStore>> {
	match cfg.backend {
		StorageBackend::Memory => Ok(Arc::new(memory::MemoryStore::new())),
		StorageBackend::Postgres => {
			let pg = cfg.postgres.as_ref().ok_or_else(|| {
				Error::InvalidArgument("storage.postgres is not configured.".to_string())
			})?;
			let db = db::Db::connect(pg).await?;

			db.ensure_schema().await?;

			Ok(Arc::new(db))
		},
	}
}
