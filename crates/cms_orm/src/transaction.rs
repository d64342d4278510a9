use cms_core::{DbConnection, DbError};

/// Runs `body` inside `BEGIN ... COMMIT`, rolling back and re-surfacing `body`'s
/// error on any failure. The rollback's own error (if the connection is already
/// broken) is logged, never returned in place of the original failure.
pub fn transaction<T>(
    conn: &mut dyn DbConnection,
    body: impl FnOnce(&mut dyn DbConnection) -> Result<T, DbError>,
) -> Result<T, DbError> {
    conn.begin()?;

    match body(conn) {
        Ok(value) => {
            conn.commit()?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = conn.rollback() {
                log::error!("[ORM] rollback failed after transaction error: {rollback_err}");
            }
            Err(err)
        }
    }
}
