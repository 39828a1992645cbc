use std::{future::Future, time::Duration};

use anyhow::Result;
use tracing::debug;

use crate::error::MosaicError;

/// Fixed-interval polling with a hard attempt cap. Used wherever we wait for
/// something outside our control to become ready: a node's RPC port, an account unlock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// A freshly started container can take a while to open its ports.
    pub const fn port_wait() -> Self {
        Self::new(60, Duration::from_secs(1))
    }

    pub const fn account_unlock() -> Self {
        Self::new(30, Duration::from_secs(2))
    }

    /// Call `f` until it returns `Ok`. After `max_attempts` failures the last error is
    /// returned with a [`MosaicError::RetryExhausted`] context.
    pub async fn retry<T, F, Fut>(&self, what: &str, mut f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match f().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt >= self.max_attempts => {
                    return Err(err.context(MosaicError::RetryExhausted {
                        what: what.to_owned(),
                        attempts: attempt,
                    }));
                }
                Err(err) => {
                    debug!(%what, attempt, "not ready yet: {err:#}");
                    tokio::time::sleep(self.interval).await;
                }
            }
        }
    }

    /// Evaluate `condition` until it holds. Returns `Ok(false)` if it never did;
    /// errors from `condition` abort the poll immediately.
    pub async fn poll<F, Fut>(&self, what: &str, mut condition: F) -> Result<bool>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        for attempt in 1..=self.max_attempts {
            if condition().await? {
                return Ok(true);
            }
            debug!(%what, attempt, "condition not met");
            if attempt < self.max_attempts {
                tokio::time::sleep(self.interval).await;
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use anyhow::anyhow;

    use super::*;

    const QUICK: RetryPolicy = RetryPolicy::new(3, Duration::from_millis(1));

    #[tokio::test]
    async fn retry_until_ok() {
        let calls = AtomicU32::new(0);
        let value = QUICK
            .retry("flaky", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(anyhow!("not yet"))
                } else {
                    Ok(7)
                }
            })
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_gives_up() {
        let calls = AtomicU32::new(0);
        let err = QUICK
            .retry("never", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(anyhow!("down"))
            })
            .await
            .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(
            err.downcast_ref::<MosaicError>(),
            Some(MosaicError::RetryExhausted { attempts: 3, .. })
        ));
    }

    #[tokio::test]
    async fn poll_bounded() {
        let calls = AtomicU32::new(0);
        let met = QUICK
            .poll("unlock", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(false)
            })
            .await
            .unwrap();
        assert!(!met);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let met = QUICK.poll("unlock", || async { Ok(true) }).await.unwrap();
        assert!(met);
    }
}
