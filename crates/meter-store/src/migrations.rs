use rusqlite::{Connection, Transaction};

use meter_core::{StoreError, StoreResult};

const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Bring the schema up to [`CURRENT_SCHEMA_VERSION`], tracked in `user_version`
pub fn run_migrations(conn: &mut Connection) -> StoreResult<()> {
    let mut version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| StoreError::Query(format!("failed to read user_version pragma: {}", e)))?;

    if version > CURRENT_SCHEMA_VERSION {
        return Err(StoreError::Internal(format!(
            "database version ({}) is newer than supported schema ({})",
            version, CURRENT_SCHEMA_VERSION
        )));
    }

    if version == CURRENT_SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn
        .transaction()
        .map_err(|e| StoreError::Query(format!("failed to open migration transaction: {}", e)))?;

    while version < CURRENT_SCHEMA_VERSION {
        let next_version = version + 1;
        apply_migration(&tx, next_version)?;
        version = next_version;
    }

    tx.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)
        .map_err(|e| StoreError::Query(format!("failed to update user_version pragma: {}", e)))?;
    tx.commit()
        .map_err(|e| StoreError::Query(format!("failed to commit migrations: {}", e)))?;

    tracing::info!(version = CURRENT_SCHEMA_VERSION, "Store schema migrated");
    Ok(())
}

fn apply_migration(tx: &Transaction<'_>, version: i32) -> StoreResult<()> {
    let script = match version {
        1 => include_str!("schemas/schema_v1.sql"),
        _ => {
            return Err(StoreError::Internal(format!(
                "unknown migration version {}",
                version
            )))
        }
    };

    tx.execute_batch(script).map_err(|e| {
        StoreError::Query(format!("migration to version {} failed: {}", version, e))
    })
}
