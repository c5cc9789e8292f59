//! Named-lock boundary (component of §5/§9).
//!
//! A real deployment backed by a relational store provides named locks
//! natively (`SELECT … FOR UPDATE`, advisory locks). This crate is written
//! against the `NamedLock` trait; the in-process `NamedLockRegistry` below is
//! the reference substitute, structured like the session-pool lock table
//! used elsewhere in this codebase for mutual exclusion over a shared map.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use crate::error::{CoreError, Result};

/// An RAII guard releasing its named lock on drop.
pub struct LockGuard {
    name: String,
    registry: Arc<NamedLockRegistryInner>,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let registry = self.registry.clone();
        let name = self.name.clone();
        tokio::spawn(async move {
            registry.release(&name).await;
        });
    }
}

#[async_trait]
pub trait NamedLock: Send + Sync {
    /// Acquire `name`, waiting up to `timeout`. Returns `LOCK_TIMEOUT` on expiry.
    async fn acquire(&self, name: &str, timeout: Duration) -> Result<LockGuard>;
}

struct NamedLockRegistryInner {
    held: Mutex<HashSet<String>>,
    notify: Notify,
}

impl NamedLockRegistryInner {
    async fn release(&self, name: &str) {
        self.held.lock().await.remove(name);
        self.notify.notify_waiters();
    }
}

/// In-process substitute for a storage-engine-provided named-lock primitive.
pub struct NamedLockRegistry {
    inner: Arc<NamedLockRegistryInner>,
}

impl Default for NamedLockRegistry {
    fn default() -> Self {
        Self {
            inner: Arc::new(NamedLockRegistryInner {
                held: Mutex::new(HashSet::new()),
                notify: Notify::new(),
            }),
        }
    }
}

#[async_trait]
impl NamedLock for NamedLockRegistry {
    async fn acquire(&self, name: &str, timeout: Duration) -> Result<LockGuard> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            {
                let mut held = self.inner.held.lock().await;
                if !held.contains(name) {
                    held.insert(name.to_string());
                    return Ok(LockGuard {
                        name: name.to_string(),
                        registry: self.inner.clone(),
                    });
                }
            }
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Err(CoreError::LockTimeout(name.to_string()));
            }
            let _ = tokio::time::timeout(remaining, self.inner.notify.notified()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_acquire_times_out_while_held() {
        let registry = NamedLockRegistry::default();
        let guard = registry
            .acquire("interpreter:E1", Duration::from_millis(50))
            .await
            .unwrap();
        let result = registry.acquire("interpreter:E1", Duration::from_millis(20)).await;
        assert!(matches!(result, Err(CoreError::LockTimeout(_))));
        drop(guard);
    }

    #[tokio::test]
    async fn lock_is_reacquirable_after_release() {
        let registry = NamedLockRegistry::default();
        {
            let _guard = registry
                .acquire("booking:1", Duration::from_millis(50))
                .await
                .unwrap();
        }
        tokio::task::yield_now().await;
        // allow the spawned release task to run
        tokio::time::sleep(Duration::from_millis(10)).await;
        let result = registry.acquire("booking:1", Duration::from_millis(50)).await;
        assert!(result.is_ok());
    }
}
