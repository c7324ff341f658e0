//! In-memory session used by unit tests.

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;
use tenantpool_core::ConnectionParams;
use uuid::Uuid;

use crate::error::{SessionError, SessionResult};
use crate::model::{
    ColumnSet, Entity, EntityCollection, OrganizationRequest, OrganizationResponse,
    QueryExpression,
};
use crate::session::{OrganizationService, Session};

pub(crate) const NOT_FOUND: i32 = -2_147_220_969;

thread_local! {
    static OPEN_FORBIDDEN: Cell<bool> = const { Cell::new(false) };
}

/// While the guard lives, `MockSession::open` panics on this thread.
pub(crate) fn forbid_open() -> OpenForbidden {
    OPEN_FORBIDDEN.with(|f| f.set(true));
    OpenForbidden
}

pub(crate) struct OpenForbidden;

impl Drop for OpenForbidden {
    fn drop(&mut self) {
        OPEN_FORBIDDEN.with(|f| f.set(false));
    }
}

/// State shared by a primordial session and all of its clones.
#[derive(Default)]
pub(crate) struct MockRemote {
    pub opens: AtomicUsize,
    pub clones: AtomicUsize,
    pub closes: AtomicUsize,
    pub fail_clone: AtomicBool,
    next_id: AtomicU64,
    records: Mutex<HashMap<Uuid, Entity>>,
}

impl MockRemote {
    pub fn clones(&self) -> usize {
        self.clones.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

pub(crate) struct MockSession {
    pub id: u64,
    pub remote: Arc<MockRemote>,
    ready: AtomicBool,
    connected: AtomicBool,
    closed: AtomicBool,
}

impl MockSession {
    pub fn attached(remote: Arc<MockRemote>, connected: bool) -> Self {
        let id = remote.next_id.fetch_add(1, Ordering::SeqCst);
        Self {
            id,
            remote,
            ready: AtomicBool::new(true),
            connected: AtomicBool::new(connected),
            closed: AtomicBool::new(false),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn guard(&self) -> SessionResult<()> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn not_found(logical_name: &str, id: Uuid) -> SessionError {
        SessionError::Fault {
            code: NOT_FOUND,
            message: format!("{logical_name} with id {id} does not exist"),
        }
    }
}

impl Session for MockSession {
    fn open(params: &ConnectionParams) -> SessionResult<Self> {
        assert!(
            !OPEN_FORBIDDEN.with(Cell::get),
            "Session::open reached for {:?}",
            params.service_uri().as_str()
        );
        if params.client_secret() == "rejected" {
            return Err(SessionError::Authentication("invalid client secret".to_string()));
        }
        let remote = Arc::new(MockRemote::default());
        remote.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Self::attached(remote, !params.defer_connection()))
    }

    fn try_clone(&self) -> SessionResult<Self> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        if self.remote.fail_clone.load(Ordering::SeqCst) {
            return Err(SessionError::Transport("connection reset by peer".to_string()));
        }
        self.remote.clones.fetch_add(1, Ordering::SeqCst);
        Ok(Self::attached(Arc::clone(&self.remote), true))
    }

    fn is_ready(&self) -> bool {
        !self.is_closed()
            && self.connected.load(Ordering::SeqCst)
            && self.ready.load(Ordering::SeqCst)
    }

    fn connect(&self) -> SessionResult<()> {
        self.guard()
    }

    fn parallelism_hint(&self) -> usize {
        4
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.remote.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl OrganizationService for MockSession {
    fn create(&self, entity: &Entity) -> SessionResult<Uuid> {
        self.guard()?;
        let id = entity.id.unwrap_or_else(Uuid::new_v4);
        let stored = entity.clone().with_id(id);
        self.remote.records.lock().unwrap().insert(id, stored);
        Ok(id)
    }

    fn retrieve(&self, logical_name: &str, id: Uuid, columns: &ColumnSet) -> SessionResult<Entity> {
        self.guard()?;
        self.remote
            .records
            .lock()
            .unwrap()
            .get(&id)
            .filter(|e| e.logical_name == logical_name)
            .map(|e| e.project(columns))
            .ok_or_else(|| Self::not_found(logical_name, id))
    }

    fn retrieve_multiple(&self, query: &QueryExpression) -> SessionResult<EntityCollection> {
        self.guard()?;
        let records = self.remote.records.lock().unwrap();
        let mut entities: Vec<Entity> = records
            .values()
            .filter(|e| query.matches(e))
            .map(|e| e.project(&query.columns))
            .collect();
        entities.sort_by_key(|e| e.id);
        let more_records = query.top.is_some_and(|top| entities.len() > top);
        if let Some(top) = query.top {
            entities.truncate(top);
        }
        Ok(EntityCollection {
            entity_name: query.entity_name.clone(),
            entities,
            more_records,
        })
    }

    fn update(&self, entity: &Entity) -> SessionResult<()> {
        self.guard()?;
        let id = entity.id.ok_or_else(|| SessionError::Fault {
            code: -1,
            message: "entity id is required for update".to_string(),
        })?;
        let mut records = self.remote.records.lock().unwrap();
        let existing = records
            .get_mut(&id)
            .ok_or_else(|| Self::not_found(&entity.logical_name, id))?;
        existing
            .attributes
            .extend(entity.attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    fn delete(&self, logical_name: &str, id: Uuid) -> SessionResult<()> {
        self.guard()?;
        self.remote
            .records
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(logical_name, id))
    }

    fn execute(&self, request: &OrganizationRequest) -> SessionResult<OrganizationResponse> {
        self.guard()?;
        match request.name.as_str() {
            "WhoAmI" => Ok(OrganizationResponse {
                name: request.name.clone(),
                results: [("SessionId".to_string(), json!(self.id))].into_iter().collect(),
            }),
            "Fail" => Err(SessionError::Fault {
                code: request
                    .parameters
                    .get("code")
                    .and_then(|v| v.as_i64())
                    .map_or(500, |c| c as i32),
                message: "requested failure".to_string(),
            }),
            _ => Ok(OrganizationResponse {
                name: request.name.clone(),
                results: request.parameters.clone(),
            }),
        }
    }
}
