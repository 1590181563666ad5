//! Response-store schema migrations.
//!
//! The applied schema version lives in SQLite's `user_version` pragma.
//! Opening a store replays every batch past the recorded version and
//! bumps the pragma after each one, so a crash mid-upgrade resumes at
//! the first unapplied batch.

use super::Error;
use tokio_rusqlite::Connection;

/// Ordered migration batches. Applying the batch at index `i` brings the
/// schema to version `i + 1`.
const MIGRATIONS: &[&str] = &[include_str!("../../migrations/001_responses.sql")];

/// Bring the schema up to date.
///
/// # Errors
///
/// Fails when a batch does not execute, or when the database reports a
/// schema version newer than this build knows about (opening it would
/// risk silent corruption).
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        let applied: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .map_err(Error::from)?;

        if applied as usize > MIGRATIONS.len() {
            return Err(Error::MigrationFailed(format!(
                "schema version {applied} is newer than this build supports"
            )));
        }

        for (index, batch) in MIGRATIONS.iter().enumerate().skip(applied as usize) {
            conn.execute_batch(batch)?;
            conn.pragma_update(None, "user_version", (index + 1) as i64)?;
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}
