//! Pooled client factory for authenticated multi-tenant business-data sessions.
//!
//! Opening a [`Session`] costs a network round trip and a token exchange.
//! [`ClientFactory`] keeps one primordial session plus a lock-free pool of
//! idle clones and hands them out as [`PooledClient`]s. A pooled client looks
//! exactly like a session to calling code, but releasing it (or dropping it)
//! returns the session to the pool instead of closing it.
//!
//! ```ignore
//! let factory: ClientFactory<MySession> =
//!     ClientFactory::new(client_id, client_secret, "https://contoso.crm.example.com", span)?;
//!
//! let client = factory.checkout()?;
//! let who = client.execute(&OrganizationRequest::new("WhoAmI"))?;
//! client.release(); // back to the pool
//! ```

pub mod client;
pub mod error;
pub mod factory;
pub mod model;
pub mod pool;
pub mod session;

#[cfg(test)]
mod mock;

pub use client::PooledClient;
pub use error::{FactoryError, FactoryResult, SessionError, SessionResult};
pub use factory::{ClientFactory, ClientFactoryBuilder};
pub use model::{
    ColumnSet, Entity, EntityCollection, OrganizationRequest, OrganizationResponse,
    QueryExpression,
};
pub use pool::SessionPool;
pub use session::{OrganizationClient, OrganizationService, Session, SessionProvider};
pub use tenantpool_core::{AuthMode, ConfigError, ConnectionParams, FactoryOptions};
