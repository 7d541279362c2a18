//! The fixed-roster, lease/release client pool.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Notify, Semaphore};

use zabbix_rpc_core::error::PoolError;
use zabbix_rpc_core::{HttpClient, VersionInfo};

use crate::client::{AuthStyle, Client};
use crate::config::InstanceConfig;
use crate::lease::Lease;

/// A point-in-time snapshot of one pooled client's state, safe to hand to
/// a caller without aliasing any pool-internal lock.
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub name: String,
    pub url: String,
    pub user: Option<String>,
    pub auth_style: AuthStyle,
    pub server_timezone: Option<String>,
    pub in_use: bool,
    pub connected: bool,
    pub added_at: DateTime<Utc>,
    pub version: Option<VersionInfo>,
}

struct Slot<H: HttpClient> {
    client: Arc<Client<H>>,
    semaphore: Arc<Semaphore>,
    added_at: DateTime<Utc>,
}

/// A fixed-size set of Zabbix clients, leased out to callers one at a time.
///
/// Every slot starts idle and is backed by a single-permit
/// [`tokio::sync::Semaphore`] — "at most one user per client" falls out of
/// that directly, and returning the permit on [`Lease`] drop is what
/// guarantees release on every exit path, including a panic unwinding
/// through the caller's scope.
pub struct ClientPool<H: HttpClient> {
    slots: Vec<Slot<H>>,
    by_name: HashMap<String, usize>,
    notify: Arc<Notify>,
    capacity: usize,
    closed: AtomicBool,
}

impl<H: HttpClient> ClientPool<H>
where
    H::Error: 'static,
{
    /// Build a pool from a validated instance roster and a factory that
    /// turns each [`InstanceConfig`] into an HTTP transport. Rejects a
    /// roster with duplicate names or more entries than `capacity`.
    ///
    /// If `eager_login` is set, every client logs in (and, for password
    /// clients, detects its server version) before the pool is returned;
    /// a failure on any one instance fails construction as a whole.
    pub async fn new<F>(
        capacity: usize,
        instances: Vec<InstanceConfig>,
        make_transport: F,
        eager_login: bool,
    ) -> Result<Self, PoolError>
    where
        F: Fn(&InstanceConfig) -> H,
    {
        let capacity = capacity.max(1);
        if instances.len() > capacity {
            return Err(PoolError::Full(capacity));
        }

        let mut slots = Vec::with_capacity(instances.len());
        let mut by_name = HashMap::with_capacity(instances.len());

        for instance in instances {
            if by_name.contains_key(&instance.name) {
                return Err(PoolError::DuplicateName(instance.name));
            }
            let name = instance.name.clone();
            let transport = make_transport(&instance);
            let client = Arc::new(Client::new(instance, transport));
            if eager_login {
                client.login().await?;
                let _ = client.detect_version().await;
            }
            by_name.insert(name, slots.len());
            slots.push(Slot {
                client,
                semaphore: Arc::new(Semaphore::new(1)),
                added_at: Utc::now(),
            });
        }

        tracing::info!(count = slots.len(), capacity, "client pool constructed");
        Ok(Self {
            slots,
            by_name,
            notify: Arc::new(Notify::new()),
            capacity,
            closed: AtomicBool::new(false),
        })
    }

    /// Total number of registered instances.
    pub fn total(&self) -> usize {
        self.slots.len()
    }

    /// Configured capacity (upper bound on registered instances).
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Mark the pool closed. Idempotent; further acquisitions return
    /// [`PoolError::Closed`]. Already-leased clients are unaffected and
    /// may still be used and released normally.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    fn check_open(&self) -> Result<(), PoolError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(PoolError::Closed)
        } else {
            Ok(())
        }
    }

    /// Acquire any currently idle client, waiting up to `deadline` (or
    /// indefinitely if `None`) for one to become free.
    pub async fn acquire(&self, deadline: Option<Duration>) -> Result<Lease<H>, PoolError> {
        let fut = self.acquire_inner();
        match deadline {
            Some(d) => tokio::time::timeout(d, fut)
                .await
                .map_err(|_| PoolError::AcquireTimeout)?,
            None => fut.await,
        }
    }

    async fn acquire_inner(&self) -> Result<Lease<H>, PoolError> {
        loop {
            self.check_open()?;

            // Register for a wakeup before scanning, so a permit released
            // between our scan and the await below is never missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            for (idx, slot) in self.slots.iter().enumerate() {
                if let Ok(permit) = slot.semaphore.clone().try_acquire_owned() {
                    return Ok(self.make_lease(idx, permit));
                }
            }
            notified.await;
        }
    }

    /// Acquire the client registered under `name` specifically, waiting up
    /// to `deadline` if it is currently busy.
    pub async fn acquire_by_name(
        &self,
        name: &str,
        deadline: Option<Duration>,
    ) -> Result<Lease<H>, PoolError> {
        self.check_open()?;
        let idx = *self
            .by_name
            .get(name)
            .ok_or_else(|| PoolError::NotFound(name.to_string()))?;
        let semaphore = self.slots[idx].semaphore.clone();
        let acquire = semaphore.acquire_owned();
        let permit = match deadline {
            Some(d) => tokio::time::timeout(d, acquire)
                .await
                .map_err(|_| PoolError::AcquireTimeout)?
                .expect("semaphore is never closed"),
            None => acquire.await.expect("semaphore is never closed"),
        };
        self.check_open()?;
        Ok(self.make_lease(idx, permit))
    }

    fn make_lease(&self, idx: usize, permit: tokio::sync::OwnedSemaphorePermit) -> Lease<H> {
        Lease::new(self.slots[idx].client.clone(), permit, self.notify.clone())
    }

    /// Snapshot of every registered instance's state, optionally filtered
    /// by an exact name match.
    pub fn info(&self, name_filter: Option<&str>) -> Vec<ClientInfo> {
        self.slots
            .iter()
            .filter(|slot| name_filter.is_none_or(|n| slot.client.name() == n))
            .map(|slot| ClientInfo {
                name: slot.client.name().to_string(),
                url: slot.client.url().to_string(),
                user: slot.client.user().map(str::to_string),
                auth_style: slot.client.auth_style(),
                server_timezone: slot.client.server_timezone().map(str::to_string),
                in_use: slot.semaphore.available_permits() == 0,
                connected: slot.client.connected(),
                added_at: slot.added_at,
                version: slot.client.cached_version_snapshot(),
            })
            .collect()
    }

    /// Probe `apiinfo.version` on every currently idle client, each bounded
    /// by `per_check_timeout`. Clients that are busy during the sweep are
    /// skipped entirely rather than waited on. Keyed by each client's URL,
    /// matching the original pool's health report shape.
    pub async fn health_check(&self, per_check_timeout: Duration) -> HashMap<String, bool> {
        let mut results = HashMap::new();
        for (idx, slot) in self.slots.iter().enumerate() {
            let Ok(permit) = slot.semaphore.clone().try_acquire_owned() else {
                continue;
            };
            let lease = self.make_lease(idx, permit);
            let ok = tokio::time::timeout(per_check_timeout, lease.detect_version())
                .await
                .is_ok_and(|r| r.is_ok());
            results.insert(lease.url().to_string(), ok);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockClient;
    use http::{Response, StatusCode};
    use serde_json::json;

    fn cfg(name: &str) -> InstanceConfig {
        InstanceConfig {
            name: name.into(),
            url: format!("https://{name}.example.com"),
            username: Some("admin".into()),
            password: Some("zabbix".into()),
            token: None,
            server_timezone: None,
            is_default: false,
            timeout_seconds: 0,
        }
    }

    fn ok_version(body: &str) -> Response<Vec<u8>> {
        Response::builder()
            .status(StatusCode::OK)
            .body(
                serde_json::to_vec(&json!({"jsonrpc": "2.0", "result": body, "id": 1}))
                    .unwrap(),
            )
            .unwrap()
    }

    #[tokio::test]
    async fn rejects_roster_over_capacity() {
        let instances = vec![cfg("a"), cfg("b"), cfg("c")];
        let result = ClientPool::new(2, instances, |_| MockClient::new(), false).await;
        assert!(matches!(result, Err(PoolError::Full(2))));
    }

    #[tokio::test]
    async fn rejects_duplicate_names() {
        let instances = vec![cfg("a"), cfg("a")];
        let result = ClientPool::new(5, instances, |_| MockClient::new(), false).await;
        assert!(matches!(result, Err(PoolError::DuplicateName(_))));
    }

    #[tokio::test]
    async fn basic_lease_round_trip() {
        let pool = ClientPool::new(2, vec![cfg("a")], |_| MockClient::new(), false)
            .await
            .unwrap();
        assert_eq!(pool.total(), 1);
        {
            let lease = pool.acquire(None).await.unwrap();
            assert_eq!(lease.name(), "a");
            let info = pool.info(None);
            assert!(info[0].in_use);
        }
        let info = pool.info(None);
        assert!(!info[0].in_use);
    }

    #[tokio::test]
    async fn acquire_times_out_when_all_busy() {
        tokio::time::pause();
        let pool = ClientPool::new(1, vec![cfg("a")], |_| MockClient::new(), false)
            .await
            .unwrap();
        let _lease = pool.acquire(None).await.unwrap();
        let result = pool.acquire(Some(Duration::from_millis(50))).await;
        assert!(matches!(result, Err(PoolError::AcquireTimeout)));
    }

    #[tokio::test]
    async fn closed_pool_rejects_further_acquisition() {
        let pool = ClientPool::new(1, vec![cfg("a")], |_| MockClient::new(), false)
            .await
            .unwrap();
        pool.close();
        pool.close(); // idempotent
        let result = pool.acquire(None).await;
        assert!(matches!(result, Err(PoolError::Closed)));
    }

    #[tokio::test]
    async fn acquire_by_name_finds_registered_instance() {
        let pool = ClientPool::new(2, vec![cfg("a"), cfg("b")], |_| MockClient::new(), false)
            .await
            .unwrap();
        let lease = pool.acquire_by_name("b", None).await.unwrap();
        assert_eq!(lease.name(), "b");
    }

    #[tokio::test]
    async fn acquire_by_name_unknown_instance_errors() {
        let pool = ClientPool::new(1, vec![cfg("a")], |_| MockClient::new(), false)
            .await
            .unwrap();
        let result = pool.acquire_by_name("missing", None).await;
        assert!(matches!(result, Err(PoolError::NotFound(_))));
    }

    #[tokio::test]
    async fn health_check_covers_only_idle_clients() {
        let mocks: Vec<MockClient> = (0..3).map(|_| MockClient::new()).collect();
        mocks[0].push(ok_version("6.0.5"));
        mocks[2].push(ok_version("7.0.0"));
        let mocks_clone = mocks.clone();
        let idx = std::cell::Cell::new(0usize);
        let pool = ClientPool::new(
            3,
            vec![cfg("a"), cfg("b"), cfg("c")],
            move |_| {
                let i = idx.get();
                idx.set(i + 1);
                mocks_clone[i].clone()
            },
            false,
        )
        .await
        .unwrap();

        let busy = pool.acquire_by_name("b", None).await.unwrap();
        let results = pool.health_check(Duration::from_secs(1)).await;
        assert!(results.contains_key("https://a.example.com"));
        assert!(results.contains_key("https://c.example.com"));
        assert!(!results.contains_key("https://b.example.com"));
        assert!(results["https://a.example.com"]);
        drop(busy);
    }
}
