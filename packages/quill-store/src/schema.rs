/// Postgres channel that carries the collection name of every write.
pub const NOTIFY_CHANNEL: &str = "quill_documents";

pub fn render_schema() -> &'static str {
	include_str!("../../../sql/init.sql")
}

/// Splits the schema into individual statements.
pub fn statements(sql: &str) -> impl Iterator<Item = &str> {
	sql.split(';').map(str::trim).filter(|statement| !statement.is_empty())
}
