//! Explicit transaction helpers for read-modify-write service operations

use crate::db::StoreError;
use crate::services::error::ServiceError;

pub(crate) async fn begin(conn: &libsql::Connection) -> Result<(), ServiceError> {
    conn.execute("BEGIN TRANSACTION", ())
        .await
        .map_err(|e| StoreError::sql(format!("failed to begin transaction: {}", e)))?;
    Ok(())
}

pub(crate) async fn commit(conn: &libsql::Connection) -> Result<(), ServiceError> {
    conn.execute("COMMIT", ())
        .await
        .map_err(|e| StoreError::sql(format!("failed to commit transaction: {}", e)))?;
    Ok(())
}

/// Best-effort rollback; the original error is what the caller reports
pub(crate) async fn rollback(conn: &libsql::Connection) {
    let _ = conn.execute("ROLLBACK", ()).await;
}
