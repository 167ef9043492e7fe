//! Process-local store used for development and tests. Every write bumps a revision counter and
//! every subscription re-reads its view when the counter moves.

use std::{
	collections::{BTreeMap, HashMap},
	sync::{Arc, Mutex},
};

use serde_json::{Map, Value};
use time::OffsetDateTime;
use tokio::sync::watch;

use crate::{
	BoxFuture, DocPath, Document, Fields, MergePolicy, Query, RemoteStore, Result, Subscription,
	document,
};

type Collections = HashMap<String, BTreeMap<String, Map<String, Value>>>;

#[derive(Clone)]
pub struct MemoryStore {
	inner: Arc<Inner>,
}
impl MemoryStore {
	pub fn new() -> Self {
		let (revision, _) = watch::channel(0);

		Self { inner: Arc::new(Inner { collections: Mutex::new(HashMap::new()), revision }) }
	}

	/// Number of live subscriptions currently attached.
	pub fn listener_count(&self) -> usize {
		self.inner.revision.receiver_count()
	}

	/// Number of documents in `collection`.
	pub fn len(&self, collection: &str) -> usize {
		let collections = self.inner.collections.lock().unwrap_or_else(|err| err.into_inner());

		collections.get(collection).map(BTreeMap::len).unwrap_or(0)
	}

	pub fn is_empty(&self, collection: &str) -> bool {
		self.len(collection) == 0
	}

	fn write(&self, path: &DocPath, fields: Fields, policy: MergePolicy) -> Result<()> {
		let resolved = document::resolve_fields(fields, OffsetDateTime::now_utc())?;

		{
			let mut collections =
				self.inner.collections.lock().unwrap_or_else(|err| err.into_inner());
			let docs = collections.entry(path.collection.clone()).or_default();
			let existing = docs.remove(&path.id);

			docs.insert(path.id.clone(), document::apply_write(existing, resolved, policy));
		}

		self.inner.revision.send_modify(|revision| *revision += 1);

		Ok(())
	}
}
impl Default for MemoryStore {
	fn default() -> Self {
		Self::new()
	}
}

struct Inner {
	collections: Mutex<Collections>,
	revision: watch::Sender<u64>,
}
impl Inner {
	fn read_document(&self, path: &DocPath) -> Option<Document> {
		let collections = self.collections.lock().unwrap_or_else(|err| err.into_inner());

		collections
			.get(&path.collection)
			.and_then(|docs| docs.get(&path.id))
			.map(|data| Document { id: path.id.clone(), data: data.clone() })
	}

	fn run_query(&self, query: &Query) -> Vec<Document> {
		let collections = self.collections.lock().unwrap_or_else(|err| err.into_inner());
		let Some(docs) = collections.get(&query.collection) else {
			return Vec::new();
		};
		let mut out: Vec<Document> = docs
			.iter()
			.filter(|(_, data)| query.matches(data))
			.map(|(id, data)| Document { id: id.clone(), data: data.clone() })
			.collect();

		query.sort(&mut out);

		out
	}
}

impl RemoteStore for MemoryStore {
	fn watch_document<'a>(
		&'a self,
		path: &'a DocPath,
	) -> BoxFuture<'a, Result<Subscription<Option<Document>>>> {
		let inner = self.inner.clone();
		let path = path.clone();

		Box::pin(async move {
			let mut changes = inner.revision.subscribe();

			Ok(Subscription::spawn(path.to_string(), move |tx| async move {
				let mut last: Option<Option<Document>> = None;

				loop {
					let current = inner.read_document(&path);

					if last.as_ref() != Some(&current) {
						last = Some(current.clone());

						if tx.send(Ok(current)).await.is_err() {
							break;
						}
					}
					if changes.changed().await.is_err() {
						break;
					}
				}
			}))
		})
	}

	fn watch_query<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, Result<Subscription<Vec<Document>>>> {
		let inner = self.inner.clone();
		let query = query.clone();

		Box::pin(async move {
			let mut changes = inner.revision.subscribe();

			Ok(Subscription::spawn(format!("query:{}", query.collection), move |tx| async move {
				let mut last: Option<Vec<Document>> = None;

				loop {
					let current = inner.run_query(&query);

					if last.as_ref() != Some(&current) {
						last = Some(current.clone());

						if tx.send(Ok(current)).await.is_err() {
							break;
						}
					}
					if changes.changed().await.is_err() {
						break;
					}
				}
			}))
		})
	}

	fn upsert<'a>(
		&'a self,
		path: &'a DocPath,
		fields: Fields,
		policy: MergePolicy,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { self.write(path, fields, policy) })
	}
}
