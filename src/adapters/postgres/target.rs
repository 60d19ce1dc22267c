//! PostgreSQL target store implementation
//!
//! Implements the atomic batched-upsert primitive: one transaction per
//! sub-batch, upsert by `id`. The conflict action overwrites `username`,
//! `email`, and `updated_at` and leaves `created_at` alone, so the
//! creation timestamp survives re-application of the same batch.
//!
//! Failures are classified by SQLSTATE into the shared taxonomy before
//! they reach the loader's retry policy.

use crate::adapters::postgres::client::PostgresClient;
use crate::adapters::traits::TargetStore;
use crate::domain::errors::{
    ConstraintKind, FerryError, LoadError, TransientKind, WriteError,
};
use crate::domain::records::UserRow;
use async_trait::async_trait;
use deadpool_postgres::{Pool, PoolError};
use std::sync::Arc;
use tokio_postgres::error::SqlState;

const UPSERT_SQL: &str = r#"
    INSERT INTO users (id, username, email, created_at, updated_at)
    VALUES ($1, $2, $3, $4, $5)
    ON CONFLICT (id) DO UPDATE SET
        username = EXCLUDED.username,
        email = EXCLUDED.email,
        updated_at = EXCLUDED.updated_at
"#;

/// PostgreSQL-backed record target
pub struct PostgresTarget {
    client: Arc<PostgresClient>,
}

impl PostgresTarget {
    pub fn new(client: Arc<PostgresClient>) -> Self {
        Self { client }
    }

    async fn try_upsert(&self, pool: &Pool, rows: &[UserRow]) -> Result<(), WriteError> {
        let mut connection = pool.get().await.map_err(classify_pool_error)?;
        let transaction = connection
            .transaction()
            .await
            .map_err(|e| classify_db_error(&e))?;

        // SET LOCAL scopes the budget to this transaction
        transaction
            .batch_execute(&format!(
                "SET LOCAL statement_timeout = {}",
                self.client.statement_timeout_ms()
            ))
            .await
            .map_err(|e| classify_db_error(&e))?;

        let statement = transaction
            .prepare(UPSERT_SQL)
            .await
            .map_err(|e| classify_db_error(&e))?;

        for row in rows {
            transaction
                .execute(
                    &statement,
                    &[
                        &row.id,
                        &row.username,
                        &row.email,
                        &row.created_at,
                        &row.updated_at,
                    ],
                )
                .await
                .map_err(|e| classify_db_error(&e))?;
        }

        transaction.commit().await.map_err(|e| classify_db_error(&e))
    }
}

#[async_trait]
impl TargetStore for PostgresTarget {
    async fn upsert_chunk(&self, rows: &[UserRow]) -> Result<(), WriteError> {
        let pool = self.client.acquire().await.map_err(WriteError::Fatal)?;

        let result = self.try_upsert(&pool, rows).await;
        if let Err(err) = &result {
            if err.is_connection() {
                self.client.invalidate().await;
            }
        }
        result
    }
}

fn classify_pool_error(err: PoolError) -> WriteError {
    match err {
        PoolError::Timeout(_) => WriteError::Transient {
            kind: TransientKind::PoolExhausted,
            message: err.to_string(),
        },
        PoolError::Backend(db_err) => classify_db_error(&db_err),
        other => WriteError::Transient {
            kind: TransientKind::Connection,
            message: other.to_string(),
        },
    }
}

pub(crate) fn classify_db_error(err: &tokio_postgres::Error) -> WriteError {
    if err.is_closed() {
        return WriteError::Transient {
            kind: TransientKind::Connection,
            message: err.to_string(),
        };
    }
    classify_sqlstate(err.code(), err.to_string())
}

/// Classify a SQLSTATE into the shared failure taxonomy
///
/// Absent codes are driver/transport-level failures, treated as transient
/// connection errors. Statement timeouts surface as `LoadError::Timeout`:
/// retryable by the caller with the same checkpoint, not retried
/// internally. Coded failures outside the classified sets are fatal
/// statement errors.
fn classify_sqlstate(code: Option<&SqlState>, message: String) -> WriteError {
    let code = match code {
        Some(code) => code,
        None => {
            return WriteError::Transient {
                kind: TransientKind::Connection,
                message,
            }
        }
    };

    if *code == SqlState::T_R_SERIALIZATION_FAILURE {
        WriteError::Transient {
            kind: TransientKind::Serialization,
            message,
        }
    } else if *code == SqlState::T_R_DEADLOCK_DETECTED {
        WriteError::Transient {
            kind: TransientKind::Deadlock,
            message,
        }
    } else if *code == SqlState::UNIQUE_VIOLATION {
        WriteError::Permanent {
            kind: ConstraintKind::Unique,
            message,
        }
    } else if *code == SqlState::FOREIGN_KEY_VIOLATION {
        WriteError::Permanent {
            kind: ConstraintKind::ForeignKey,
            message,
        }
    } else if *code == SqlState::CHECK_VIOLATION {
        WriteError::Permanent {
            kind: ConstraintKind::Check,
            message,
        }
    } else if *code == SqlState::CONNECTION_EXCEPTION
        || *code == SqlState::CONNECTION_FAILURE
        || *code == SqlState::CONNECTION_DOES_NOT_EXIST
        || *code == SqlState::ADMIN_SHUTDOWN
        || *code == SqlState::CRASH_SHUTDOWN
        || *code == SqlState::CANNOT_CONNECT_NOW
    {
        WriteError::Transient {
            kind: TransientKind::Connection,
            message,
        }
    } else if *code == SqlState::QUERY_CANCELED {
        WriteError::Fatal(FerryError::Load(LoadError::Timeout(message)))
    } else {
        WriteError::Fatal(FerryError::Load(LoadError::Statement(message)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(code: &SqlState) -> WriteError {
        classify_sqlstate(Some(code), "boom".to_string())
    }

    #[test]
    fn test_serialization_and_deadlock_are_transient() {
        assert!(matches!(
            classify(&SqlState::T_R_SERIALIZATION_FAILURE),
            WriteError::Transient {
                kind: TransientKind::Serialization,
                ..
            }
        ));
        assert!(matches!(
            classify(&SqlState::T_R_DEADLOCK_DETECTED),
            WriteError::Transient {
                kind: TransientKind::Deadlock,
                ..
            }
        ));
    }

    #[test]
    fn test_constraint_violations_are_permanent() {
        assert!(matches!(
            classify(&SqlState::UNIQUE_VIOLATION),
            WriteError::Permanent {
                kind: ConstraintKind::Unique,
                ..
            }
        ));
        assert!(matches!(
            classify(&SqlState::FOREIGN_KEY_VIOLATION),
            WriteError::Permanent {
                kind: ConstraintKind::ForeignKey,
                ..
            }
        ));
        assert!(matches!(
            classify(&SqlState::CHECK_VIOLATION),
            WriteError::Permanent {
                kind: ConstraintKind::Check,
                ..
            }
        ));
    }

    #[test]
    fn test_connection_codes_are_transient_connection() {
        for code in [
            SqlState::CONNECTION_EXCEPTION,
            SqlState::CONNECTION_FAILURE,
            SqlState::ADMIN_SHUTDOWN,
        ] {
            assert!(matches!(
                classify(&code),
                WriteError::Transient {
                    kind: TransientKind::Connection,
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_missing_code_is_transport_level() {
        assert!(matches!(
            classify_sqlstate(None, "io error".to_string()),
            WriteError::Transient {
                kind: TransientKind::Connection,
                ..
            }
        ));
    }

    #[test]
    fn test_statement_timeout_is_fatal_timeout() {
        let classified = classify(&SqlState::QUERY_CANCELED);
        assert!(matches!(
            classified,
            WriteError::Fatal(FerryError::Load(LoadError::Timeout(_)))
        ));
    }

    #[test]
    fn test_unclassified_code_is_fatal_statement() {
        let classified = classify(&SqlState::SYNTAX_ERROR);
        assert!(matches!(
            classified,
            WriteError::Fatal(FerryError::Load(LoadError::Statement(_)))
        ));
    }

    #[test]
    fn test_upsert_sql_preserves_created_at_on_conflict() {
        let conflict_action = UPSERT_SQL
            .split("DO UPDATE SET")
            .nth(1)
            .expect("upsert has a conflict action");
        assert!(!conflict_action.contains("created_at"));
        assert!(conflict_action.contains("updated_at"));
    }
}
