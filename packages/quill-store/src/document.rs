use std::{cmp::Ordering, collections::BTreeMap, fmt};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocPath {
	pub collection: String,
	pub id: String,
}
impl DocPath {
	pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
		Self { collection: collection.into(), id: id.into() }
	}
}
impl fmt::Display for DocPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.collection, self.id)
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
	pub id: String,
	pub data: Map<String, Value>,
}
impl Document {
	/// Decodes the stored fields. The document id is not part of `data`.
	pub fn decode<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		serde_json::from_value(Value::Object(self.data.clone())).map_err(|err| {
			Error::InvalidDocument { path: self.id.clone(), message: err.to_string() }
		})
	}
}

/// A field to write. `ServerTimestamp` is replaced by the store's clock at write time.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
	Value(Value),
	ServerTimestamp,
}
impl From<Value> for FieldValue {
	fn from(value: Value) -> Self {
		Self::Value(value)
	}
}

pub type Fields = BTreeMap<String, FieldValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
	/// The written fields become the whole document.
	Replace,
	/// Top-level fields are overwritten; fields not written are kept.
	Merge,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
	pub field: String,
	pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
	Ascending,
	Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
	pub field: String,
	pub direction: SortDirection,
}

/// Equality filters over one collection with an optional single-field sort.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
	pub collection: String,
	pub filters: Vec<Filter>,
	pub order_by: Option<OrderBy>,
}
impl Query {
	pub fn collection(collection: impl Into<String>) -> Self {
		Self { collection: collection.into(), filters: Vec::new(), order_by: None }
	}

	pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
		self.filters.push(Filter { field: field.into(), value: value.into() });

		self
	}

	pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
		self.order_by = Some(OrderBy { field: field.into(), direction });

		self
	}

	/// Whether `data` passes the filters. Documents without the sort field never match.
	pub fn matches(&self, data: &Map<String, Value>) -> bool {
		if let Some(order_by) = &self.order_by
			&& !data.contains_key(&order_by.field)
		{
			return false;
		}

		self.filters.iter().all(|filter| data.get(&filter.field) == Some(&filter.value))
	}

	/// Sorts matched documents. Ties fall back to the document id.
	pub fn sort(&self, docs: &mut [Document]) {
		let Some(order_by) = &self.order_by else {
			docs.sort_by(|a, b| a.id.cmp(&b.id));

			return;
		};

		docs.sort_by(|a, b| {
			let ord = compare_values(a.data.get(&order_by.field), b.data.get(&order_by.field));
			let ord = match order_by.direction {
				SortDirection::Ascending => ord,
				SortDirection::Descending => ord.reverse(),
			};

			ord.then_with(|| a.id.cmp(&b.id))
		});
	}
}

/// Replaces server timestamp sentinels and returns the concrete JSON fields.
pub fn resolve_fields(fields: Fields, now: OffsetDateTime) -> Result<Map<String, Value>> {
	let stamp = quill_domain::time_serde::format(now)
		.map_err(|err| Error::InvalidArgument(format!("Failed to format timestamp: {err}.")))?;
	let mut out = Map::with_capacity(fields.len());

	for (name, value) in fields {
		let value = match value {
			FieldValue::Value(value) => value,
			FieldValue::ServerTimestamp => Value::String(stamp.clone()),
		};

		out.insert(name, value);
	}

	Ok(out)
}

/// Applies resolved fields onto an existing document body.
pub fn apply_write(
	existing: Option<Map<String, Value>>,
	fields: Map<String, Value>,
	policy: MergePolicy,
) -> Map<String, Value> {
	match (policy, existing) {
		(MergePolicy::Merge, Some(mut data)) => {
			data.extend(fields);

			data
		},
		_ => fields,
	}
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
	fn rank(value: Option<&Value>) -> u8 {
		match value {
			None | Some(Value::Null) => 0,
			Some(Value::Bool(_)) => 1,
			Some(Value::Number(_)) => 2,
			Some(Value::String(_)) => 3,
			Some(Value::Array(_)) => 4,
			Some(Value::Object(_)) => 5,
		}
	}

	match (a, b) {
		(Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
		(Some(Value::Number(a)), Some(Value::Number(b))) => {
			let a = a.as_f64().unwrap_or(0.0);
			let b = b.as_f64().unwrap_or(0.0);

			a.partial_cmp(&b).unwrap_or(Ordering::Equal)
		},
		(Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
		_ => rank(a).cmp(&rank(b)),
	}
}
