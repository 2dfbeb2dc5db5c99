use std::{future::Future, time::Duration};

use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use super::error::QueryError;

/// Fixed attempt count with a constant delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 30,
            delay: Duration::from_secs(1),
        }
    }
}

/// Runs `check` until it succeeds or the attempts run out. Returns the number
/// of checks performed on success, the last error otherwise.
pub async fn wait_for<T, E, F, Fut>(policy: RetryPolicy, mut check: F) -> Result<(T, u32), E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match check().await {
            Ok(value) => return Ok((value, attempt)),
            Err(e) if attempt < attempts => {
                log::warn!("Database unavailable ({attempt}/{attempts}): {e}, waiting...");
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) => {
                log::error!("Database still unavailable after {attempt} attempts: {e}");
                return Err(e);
            }
        }
    }
}

/// Connects to PostgreSQL, retrying per `policy` until the server accepts
/// connections.
pub async fn wait_for_db(
    url: &str,
    max_connections: u32,
    policy: RetryPolicy,
) -> Result<Pool<Postgres>, QueryError> {
    log::info!("Waiting for database...");

    let (pool, attempts) = wait_for(policy, || {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
    })
    .await?;

    log::info!("Database available after {attempts} attempt(s)");
    Ok(pool)
}

pub async fn migrate(pool: &Pool<Postgres>) -> Result<(), QueryError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    log::info!("Migrations applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn quick(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn waits_until_first_success() {
        let calls = AtomicU32::new(0);
        let result = wait_for(quick(10), || {
            let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if call <= 5 {
                    Err(String::from("connection refused"))
                } else {
                    Ok(call)
                }
            }
        })
        .await;

        assert_eq!(result, Ok((6, 6)));
        assert_eq!(calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn ready_database_is_checked_once() {
        let calls = AtomicU32::new(0);
        let result: Result<((), u32), String> = wait_for(quick(3), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .await;

        assert_eq!(result, Ok(((), 1)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_configured_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<((), u32), String> = wait_for(quick(4), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(String::from("connection refused")) }
        })
        .await;

        assert_eq!(result, Err(String::from("connection refused")));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
