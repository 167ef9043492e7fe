//! Postgres backend. Documents live in one JSONB table and every write publishes the collection
//! name on [`schema::NOTIFY_CHANNEL`]; subscriptions re-run their read when a matching
//! notification arrives.

use std::future::Future;

use serde_json::Value;
use sqlx::{
	PgPool, Postgres, QueryBuilder,
	postgres::{PgListener, PgPoolOptions},
};
use time::OffsetDateTime;
use tokio::sync::mpsc;

use crate::{
	BoxFuture, DocPath, Document, Error, Fields, MergePolicy, Query, RemoteStore, Result,
	SortDirection, Subscription, document, schema,
};

const SCHEMA_LOCK_ID: i64 = 7_120_115;

#[derive(Clone)]
pub struct Db {
	pub pool: PgPool,
}
impl Db {
	pub async fn connect(cfg: &quill_config::Postgres) -> Result<Self> {
		let pool =
			PgPoolOptions::new().max_connections(cfg.pool_max_conns).connect(&cfg.dsn).await?;

		Ok(Self { pool })
	}

	pub async fn ensure_schema(&self) -> Result<()> {
		// Advisory locks are held per connection, so take it inside the transaction.
		let mut tx = self.pool.begin().await?;

		sqlx::query("SELECT pg_advisory_xact_lock($1)")
			.bind(SCHEMA_LOCK_ID)
			.execute(&mut *tx)
			.await?;

		for statement in schema::statements(schema::render_schema()) {
			sqlx::query(statement).execute(&mut *tx).await?;
		}

		tx.commit().await?;

		Ok(())
	}

	async fn listen(&self) -> Result<PgListener> {
		let mut listener = PgListener::connect_with(&self.pool).await?;

		listener.listen(schema::NOTIFY_CHANNEL).await?;

		Ok(listener)
	}

	async fn write(&self, path: &DocPath, fields: Fields, policy: MergePolicy) -> Result<()> {
		let resolved = document::resolve_fields(fields, OffsetDateTime::now_utc())?;
		let sql = match policy {
			MergePolicy::Replace =>
				"\
INSERT INTO documents (collection, doc_id, data)
VALUES ($1, $2, $3)
ON CONFLICT (collection, doc_id) DO UPDATE SET data = EXCLUDED.data",
			MergePolicy::Merge =>
				"\
INSERT INTO documents (collection, doc_id, data)
VALUES ($1, $2, $3)
ON CONFLICT (collection, doc_id) DO UPDATE SET data = documents.data || EXCLUDED.data",
		};
		let mut tx = self.pool.begin().await?;

		sqlx::query(sql)
			.bind(path.collection.as_str())
			.bind(path.id.as_str())
			.bind(Value::Object(resolved))
			.execute(&mut *tx)
			.await?;
		sqlx::query("SELECT pg_notify($1, $2)")
			.bind(schema::NOTIFY_CHANNEL)
			.bind(path.collection.as_str())
			.execute(&mut *tx)
			.await?;

		tx.commit().await?;

		Ok(())
	}
}

async fn read_document(pool: &PgPool, path: &DocPath) -> Result<Option<Document>> {
	let row: Option<(Value,)> =
		sqlx::query_as("SELECT data FROM documents WHERE collection = $1 AND doc_id = $2")
			.bind(path.collection.as_str())
			.bind(path.id.as_str())
			.fetch_optional(pool)
			.await?;

	row.map(|(data,)| into_document(path.id.clone(), data)).transpose()
}

async fn run_query(pool: &PgPool, query: &Query) -> Result<Vec<Document>> {
	let mut builder: QueryBuilder<Postgres> =
		QueryBuilder::new("SELECT doc_id, data FROM documents WHERE collection = ");

	builder.push_bind(query.collection.as_str());

	for filter in &query.filters {
		builder.push(" AND data -> ");
		builder.push_bind(filter.field.as_str());
		builder.push(" = ");
		builder.push_bind(filter.value.clone());
	}

	if let Some(order_by) = &query.order_by {
		builder.push(" AND data -> ");
		builder.push_bind(order_by.field.as_str());
		builder.push(" IS NOT NULL ORDER BY data -> ");
		builder.push_bind(order_by.field.as_str());
		builder.push(match order_by.direction {
			SortDirection::Ascending => " ASC",
			SortDirection::Descending => " DESC",
		});
		builder.push(", doc_id ASC");
	} else {
		builder.push(" ORDER BY doc_id ASC");
	}

	let rows: Vec<(String, Value)> = builder.build_query_as().fetch_all(pool).await?;

	rows.into_iter().map(|(id, data)| into_document(id, data)).collect()
}

fn into_document(id: String, data: Value) -> Result<Document> {
	match data {
		Value::Object(data) => Ok(Document { id, data }),
		other => Err(Error::InvalidDocument {
			path: id,
			message: format!("Stored data must be an object, found {other}."),
		}),
	}
}

/// Drives one subscription: emit the current read, then re-read after every notification for
/// `collection` and emit whenever the result changed.
async fn feed<T, F, Fut>(
	mut listener: PgListener,
	collection: String,
	tx: mpsc::Sender<Result<T>>,
	read: F,
) where
	T: PartialEq + Clone,
	F: Fn() -> Fut,
	Fut: Future<Output = Result<T>>,
{
	let mut last: Option<T> = None;

	loop {
		match read().await {
			Ok(current) =>
				if last.as_ref() != Some(&current) {
					last = Some(current.clone());

					if tx.send(Ok(current)).await.is_err() {
						return;
					}
				},
			Err(err) => {
				let _ = tx.send(Err(err)).await;

				return;
			},
		}

		loop {
			match listener.recv().await {
				Ok(notification) if notification.payload() == collection => break,
				Ok(_) => continue,
				Err(err) => {
					tracing::warn!(error = %err, %collection, "Document listener failed.");

					let _ = tx.send(Err(err.into())).await;

					return;
				},
			}
		}
	}
}

impl RemoteStore for Db {
	fn watch_document<'a>(
		&'a self,
		path: &'a DocPath,
	) -> BoxFuture<'a, Result<Subscription<Option<Document>>>> {
		Box::pin(async move {
			let listener = self.listen().await?;
			let pool = self.pool.clone();
			let path = path.clone();

			Ok(Subscription::spawn(path.to_string(), move |tx| async move {
				let collection = path.collection.clone();

				feed(listener, collection, tx, || read_document(&pool, &path)).await;
			}))
		})
	}

	fn watch_query<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, Result<Subscription<Vec<Document>>>> {
		Box::pin(async move {
			let listener = self.listen().await?;
			let pool = self.pool.clone();
			let query = query.clone();

			Ok(Subscription::spawn(format!("query:{}", query.collection), move |tx| async move {
				let collection = query.collection.clone();

				feed(listener, collection, tx, || run_query(&pool, &query)).await;
			}))
		})
	}

	fn upsert<'a>(
		&'a self,
		path: &'a DocPath,
		fields: Fields,
		policy: MergePolicy,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.write(path, fields, policy))
	}
}
