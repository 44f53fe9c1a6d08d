//! Bounded execution of external calls

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;

use crate::domain::DomainError;

/// Run `future` for at most `limit`, mapping an elapsed deadline to
/// `DomainError::Timeout` for the named operation.
pub async fn bounded<T, F>(operation: &str, limit: Duration, future: F) -> Result<T, DomainError>
where
    F: Future<Output = Result<T, DomainError>>,
{
    match timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(DomainError::timeout(
            operation,
            u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        )),
    }
}
