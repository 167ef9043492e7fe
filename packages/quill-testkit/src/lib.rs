//! Throwaway Postgres databases for the store's smoke tests.

mod error;

pub use error::{Error, Result};

use std::{env, str::FromStr};

use sqlx::{
	ConnectOptions, Connection, Executor,
	postgres::{PgConnectOptions, PgConnection},
};
use uuid::Uuid;

const DSN_VAR: &str = "QUILL_PG_DSN";
const ADMIN_DATABASE: &str = "postgres";

/// Server DSN for integration tests, if one is configured.
pub fn env_dsn() -> Option<String> {
	env::var(DSN_VAR).ok()
}

/// A freshly created database. Call [`TestDatabase::cleanup`] at the end of the test to drop it.
pub struct TestDatabase {
	name: String,
	dsn: String,
	admin: PgConnectOptions,
}
impl TestDatabase {
	pub async fn new(base_dsn: &str) -> Result<Self> {
		let base = PgConnectOptions::from_str(base_dsn)
			.map_err(|err| Error::Message(format!("Invalid {DSN_VAR}: {err}.")))?;
		let admin = base.clone().database(ADMIN_DATABASE);
		let name = format!("quill_test_{}", Uuid::new_v4().simple());
		let mut conn = PgConnection::connect_with(&admin).await?;

		conn.execute(format!(r#"CREATE DATABASE "{name}""#).as_str()).await?;

		let dsn = base.database(&name).to_url_lossy().to_string();

		Ok(Self { name, dsn, admin })
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	/// Drops the database, disconnecting any pool still attached to it.
	pub async fn cleanup(self) -> Result<()> {
		let mut conn = PgConnection::connect_with(&self.admin).await?;

		sqlx::query(
			"SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = $1 AND pid <> pg_backend_pid()",
		)
		.bind(&self.name)
		.execute(&mut conn)
		.await?;
		conn.execute(format!(r#"DROP DATABASE IF EXISTS "{}""#, self.name).as_str()).await?;

		Ok(())
	}
}
