use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::Connection;

use super::schema;

/// How long a write waits for another process holding the database,
/// e.g. a second runner window
const BUSY_TIMEOUT: Duration = Duration::from_secs(2);

/// The runner's SQLite store: settings, run history and argument templates.
pub struct Database {
    conn: Connection,
    path: String,
}

impl Database {
    /// Open or create the store at `path` (`:memory:` for a scratch store).
    ///
    /// # Examples
    /// ```
    /// use script_runner::services::database::Database;
    /// let db = Database::new(":memory:").unwrap();
    /// db.initialize_schema().unwrap();
    /// ```
    pub fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open run database at {}", path))?;

        conn.pragma_update(None, "foreign_keys", "ON")
            .context("Failed to enable foreign keys")?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .context("Failed to set busy timeout")?;

        Ok(Self {
            conn,
            path: path.to_string(),
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Where the store lives, as shown in the About dialog
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Create the runner tables and seed the settings row. Safe to call on
    /// every start.
    pub fn initialize_schema(&self) -> Result<()> {
        schema::initialize_schema(&self.conn)
    }
}
