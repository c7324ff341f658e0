//! The session capability contract consumed by the factory.
//!
//! A [`Session`] is one authenticated connection to a remote instance. The
//! factory relies on only a handful of its operations (readiness, cloning,
//! closing, a parallelism hint); everything else is the business surface in
//! [`OrganizationService`], which is forwarded without interpretation.

use tenantpool_core::ConnectionParams;
use uuid::Uuid;

use crate::error::SessionResult;
use crate::model::{
    ColumnSet, Entity, EntityCollection, OrganizationRequest, OrganizationResponse,
    QueryExpression,
};

/// Business capability surface of a remote instance.
pub trait OrganizationService {
    /// Create a record and return its id.
    fn create(&self, entity: &Entity) -> SessionResult<Uuid>;

    /// Fetch one record of `logical_name`, limited to `columns`.
    fn retrieve(&self, logical_name: &str, id: Uuid, columns: &ColumnSet) -> SessionResult<Entity>;

    /// Fetch every record matching `query`.
    fn retrieve_multiple(&self, query: &QueryExpression) -> SessionResult<EntityCollection>;

    /// Update a record. `entity.id` must be set.
    fn update(&self, entity: &Entity) -> SessionResult<()>;

    /// Delete one record of `logical_name`.
    fn delete(&self, logical_name: &str, id: Uuid) -> SessionResult<()>;

    /// Run a named message and return its results.
    fn execute(&self, request: &OrganizationRequest) -> SessionResult<OrganizationResponse>;
}

/// One authenticated connection to a remote instance.
///
/// Implementations must be shareable across threads: pooled sessions move
/// between callers on different threads over their lifetime.
pub trait Session: OrganizationService + Sized + Send + Sync + 'static {
    /// Default construction path, used when no [`SessionProvider`] is installed.
    ///
    /// Honors `params.defer_connection()`: when set, the transport should not
    /// be established until first use or an explicit [`Session::connect`].
    fn open(params: &ConnectionParams) -> SessionResult<Self>;

    /// Produce an independent sibling session reusing the same credentials.
    ///
    /// May block on network I/O.
    fn try_clone(&self) -> SessionResult<Self>;

    /// Whether the session can still serve calls. Must not block.
    fn is_ready(&self) -> bool;

    /// Establish a deferred transport now.
    fn connect(&self) -> SessionResult<()> {
        Ok(())
    }

    /// Advisory number of concurrent sessions the instance handles well. `0` if unknown.
    fn parallelism_hint(&self) -> usize {
        0
    }

    /// Release transport resources.
    fn close(&self);
}

/// Strategy for building a session from connection parameters.
///
/// Replaces [`Session::open`] as the way the factory obtains its primordial
/// session. Any `Fn(&ConnectionParams) -> SessionResult<S>` closure works.
pub trait SessionProvider<S>: Send + Sync {
    /// Open a session for `params`. May block on network I/O.
    fn provide(&self, params: &ConnectionParams) -> SessionResult<S>;
}

impl<S, F> SessionProvider<S> for F
where
    F: Fn(&ConnectionParams) -> SessionResult<S> + Send + Sync,
{
    fn provide(&self, params: &ConnectionParams) -> SessionResult<S> {
        self(params)
    }
}

/// A business client the caller releases when done.
///
/// Implemented by pooled clients (release returns the session to its pool)
/// and by every [`Session`] directly (release closes it), so code written
/// against this trait works with either.
pub trait OrganizationClient: OrganizationService {
    /// Signal the caller is done with this client.
    fn release(&self);
}

impl<S: Session> OrganizationClient for S {
    fn release(&self) {
        self.close();
    }
}
