//! Pooled client handle: a forwarding wrapper around one checked-out session.
//!
//! Every [`OrganizationService`] call goes straight through to the wrapped
//! session: same arguments, same result, same error. The one call that is
//! redefined is [`release`](PooledClient::release): instead of closing the
//! session it hands it back to the factory's pool. [`close`](PooledClient::close)
//! on the handle and dropping the handle both release it too.
//!
//! ```text
//! Active ──release() / drop──▶ Released
//!   ▲                            │
//!   └────── (terminal) ◀─────────┘ further release() calls are no-ops
//! ```
//!
//! Calls made after release are still forwarded to the session, which may
//! by then be in the pool or checked out by someone else. That is a caller
//! bug; if the session itself rejects the call, its error propagates.

use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use uuid::Uuid;

use crate::error::SessionResult;
use crate::factory::FactoryShared;
use crate::model::{
    ColumnSet, Entity, EntityCollection, OrganizationRequest, OrganizationResponse,
    QueryExpression,
};
use crate::session::{OrganizationClient, OrganizationService, Session};

/// A session checked out of a [`ClientFactory`](crate::ClientFactory).
pub struct PooledClient<S: Session> {
    session: Arc<S>,
    factory: Arc<FactoryShared<S>>,
    released: AtomicBool,
}

impl<S: Session> PooledClient<S> {
    pub(crate) fn new(session: Arc<S>, factory: Arc<FactoryShared<S>>) -> Self {
        Self {
            session,
            factory,
            released: AtomicBool::new(false),
        }
    }

    /// Return the session to the factory's pool.
    ///
    /// Only the first call (across all threads) does anything; the session is
    /// pooled if it is still ready and discarded otherwise.
    pub fn release(&self) {
        if self
            .released
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.factory.return_to_pool(Arc::clone(&self.session));
        }
    }

    /// Same as [`release`](Self::release). Shadows [`Session::close`] so a
    /// handle used like a session is pooled rather than torn down.
    pub fn close(&self) {
        self.release();
    }

    /// Whether this handle has already been released.
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// The wrapped session.
    pub fn session(&self) -> &Arc<S> {
        &self.session
    }
}

impl<S: Session> Drop for PooledClient<S> {
    fn drop(&mut self) {
        self.release();
    }
}

// Session-specific surface beyond `OrganizationService` is reachable by deref.
impl<S: Session> Deref for PooledClient<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.session
    }
}

impl<S: Session> OrganizationService for PooledClient<S> {
    fn create(&self, entity: &Entity) -> SessionResult<Uuid> {
        self.session.create(entity)
    }

    fn retrieve(&self, logical_name: &str, id: Uuid, columns: &ColumnSet) -> SessionResult<Entity> {
        self.session.retrieve(logical_name, id, columns)
    }

    fn retrieve_multiple(&self, query: &QueryExpression) -> SessionResult<EntityCollection> {
        self.session.retrieve_multiple(query)
    }

    fn update(&self, entity: &Entity) -> SessionResult<()> {
        self.session.update(entity)
    }

    fn delete(&self, logical_name: &str, id: Uuid) -> SessionResult<()> {
        self.session.delete(logical_name, id)
    }

    fn execute(&self, request: &OrganizationRequest) -> SessionResult<OrganizationResponse> {
        self.session.execute(request)
    }
}

impl<S: Session> OrganizationClient for PooledClient<S> {
    fn release(&self) {
        PooledClient::release(self);
    }
}

impl<S: Session> std::fmt::Debug for PooledClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledClient")
            .field("session", &Arc::as_ptr(&self.session))
            .field("released", &self.is_released())
            .finish_non_exhaustive()
    }
}
