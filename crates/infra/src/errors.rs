//! Conversions from external infrastructure errors into domain errors.

use gather_domain::GatherError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can
/// be converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub GatherError);

impl From<InfraError> for GatherError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<GatherError> for InfraError {
    fn from(value: GatherError) -> Self {
        InfraError(value)
    }
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error -> GatherError                                             */
/* -------------------------------------------------------------------------- */

impl From<SqlError> for InfraError {
    fn from(err: SqlError) -> Self {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        let mapped = match err {
            RE::SqliteFailure(code, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match code.code {
                    ErrorCode::DatabaseBusy => GatherError::Database("database is busy".into()),
                    ErrorCode::DatabaseLocked => {
                        GatherError::Database("database is locked".into())
                    }
                    // The dedup race between two workers importing the same
                    // external id resolves through this mapping: callers
                    // treat it as "duplicate, skip".
                    ErrorCode::ConstraintViolation => GatherError::Database(format!(
                        "unique constraint violation: {message}"
                    )),
                    _ => GatherError::Database(format!(
                        "sqlite failure {:?} (code {}): {message}",
                        code.code, code.extended_code
                    )),
                }
            }
            RE::QueryReturnedNoRows => {
                GatherError::NotFound("no rows returned by query".into())
            }
            RE::FromSqlConversionFailure(_, _, cause) => {
                GatherError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                GatherError::Database(format!("invalid column type: {ty}"))
            }
            other => GatherError::Database(other.to_string()),
        };

        InfraError(mapped)
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error -> GatherError                                                 */
/* -------------------------------------------------------------------------- */

impl From<r2d2::Error> for InfraError {
    fn from(err: r2d2::Error) -> Self {
        InfraError(GatherError::Database(format!("connection pool error: {err}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error -> GatherError                                              */
/* -------------------------------------------------------------------------- */

impl From<HttpError> for InfraError {
    fn from(err: HttpError) -> Self {
        let mapped = if err.is_timeout() {
            GatherError::Network(format!("request timed out: {err}"))
        } else if let Some(status) = err.status() {
            if status == reqwest::StatusCode::UNAUTHORIZED
                || status == reqwest::StatusCode::FORBIDDEN
            {
                GatherError::Auth(format!("request rejected ({status}): {err}"))
            } else {
                GatherError::Network(format!("http error ({status}): {err}"))
            }
        } else if err.is_connect() {
            GatherError::Network(format!("connection failed: {err}"))
        } else if err.is_decode() {
            GatherError::InvalidInput(format!("malformed response body: {err}"))
        } else {
            GatherError::Network(err.to_string())
        };

        InfraError(mapped)
    }
}
