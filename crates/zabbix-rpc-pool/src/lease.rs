//! A scoped proof of exclusive access to one pooled client.

use std::ops::Deref;
use std::sync::Arc;

use tokio::sync::{Notify, OwnedSemaphorePermit};

use zabbix_rpc_core::HttpClient;

use crate::client::Client;

/// Holds exclusive access to one [`Client`] for as long as it lives.
///
/// Release happens in [`Drop`], so it fires on every exit path — an early
/// `return`, a `?`, or a panic unwinding through the caller's scope — not
/// just the happy path. There is no manual `release()` method to forget to
/// call.
pub struct Lease<H: HttpClient> {
    client: Arc<Client<H>>,
    permit: Option<OwnedSemaphorePermit>,
    notify: Arc<Notify>,
}

impl<H: HttpClient> Lease<H> {
    pub(crate) fn new(
        client: Arc<Client<H>>,
        permit: OwnedSemaphorePermit,
        notify: Arc<Notify>,
    ) -> Self {
        Self {
            client,
            permit: Some(permit),
            notify,
        }
    }
}

impl<H: HttpClient> Deref for Lease<H> {
    type Target = Client<H>;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl<H: HttpClient> Drop for Lease<H> {
    fn drop(&mut self) {
        // Dropping the permit returns it to the client's single-slot
        // semaphore; waking waiters afterward lets a pending acquire_any
        // re-scan and find this client idle again.
        self.permit.take();
        self.notify.notify_waiters();
    }
}
