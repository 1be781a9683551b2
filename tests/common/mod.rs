//! Shared fixtures for the integration suites: a gateway whose failures can be
//! scripted per operation, plus a deterministic clock.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use manutrack::gateway::PersistenceGateway;
use manutrack::{
    GatewayError, InMemoryGateway, ManualClock, Manuscript, ManuscriptDraft, ManuscriptPatch,
    MutationCoordinator, StoreHandle, UserSettings,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    List,
    Create,
    Update,
    UpdateMany,
    Delete,
    LoadSettings,
    SaveSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List,
    Create(String),
    Update(String),
    UpdateMany(Vec<String>),
    Delete(String),
    LoadSettings,
    SaveSettings,
}

/// In-memory gateway with switchable failures and a call log.
///
/// Every call yields once before doing anything, so concurrently driven
/// coordinator operations actually interleave.
#[derive(Default)]
pub struct ScriptedGateway {
    pub inner: InMemoryGateway,
    failing: Mutex<HashSet<Op>>,
    failing_update_ids: Mutex<HashSet<String>>,
    calls: Mutex<Vec<Call>>,
    observer: Mutex<Option<StoreHandle>>,
    observed_on_update: Mutex<Vec<Option<Manuscript>>>,
}

impl ScriptedGateway {
    pub fn with_manuscripts(manuscripts: Vec<Manuscript>) -> Self {
        Self {
            inner: InMemoryGateway::with_manuscripts(manuscripts),
            ..Self::default()
        }
    }

    pub fn fail(&self, op: Op) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn recover(&self, op: Op) {
        self.failing.lock().unwrap().remove(&op);
    }

    pub fn fail_update_for(&self, id: &str) {
        self.failing_update_ids.lock().unwrap().insert(id.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn count(&self, matcher: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|call| matcher(call)).count()
    }

    /// Makes every `update` call record what the coordinator's store holds
    /// for that id at the moment the call arrives.
    pub fn observe(&self, handle: StoreHandle) {
        *self.observer.lock().unwrap() = Some(handle);
    }

    pub fn observed_on_update(&self) -> Vec<Option<Manuscript>> {
        self.observed_on_update.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, op: Op) -> Result<(), GatewayError> {
        if self.failing.lock().unwrap().contains(&op) {
            return Err(GatewayError::Rejected {
                status: 503,
                message: format!("scripted {:?} failure", op),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceGateway for ScriptedGateway {
    async fn list(&self) -> Result<Vec<Manuscript>, GatewayError> {
        tokio::task::yield_now().await;
        self.record(Call::List);
        self.check(Op::List)?;
        self.inner.list().await
    }

    async fn create(&self, manuscript: Manuscript) -> Result<Manuscript, GatewayError> {
        tokio::task::yield_now().await;
        self.record(Call::Create(manuscript.id.clone()));
        self.check(Op::Create)?;
        self.inner.create(manuscript).await
    }

    async fn update(&self, manuscript: Manuscript) -> Result<Manuscript, GatewayError> {
        let observer = self.observer.lock().unwrap().clone();
        if let Some(handle) = observer {
            let seen = handle.get(&manuscript.id).await;
            self.observed_on_update.lock().unwrap().push(seen);
        }
        tokio::task::yield_now().await;
        self.record(Call::Update(manuscript.id.clone()));
        self.check(Op::Update)?;
        if self.failing_update_ids.lock().unwrap().contains(&manuscript.id) {
            return Err(GatewayError::Timeout(format!("update of {}", manuscript.id)));
        }
        self.inner.update(manuscript).await
    }

    async fn update_many(&self, ids: &[String], changes: &ManuscriptPatch) -> Result<(), GatewayError> {
        tokio::task::yield_now().await;
        self.record(Call::UpdateMany(ids.to_vec()));
        self.check(Op::UpdateMany)?;
        self.inner.update_many(ids, changes).await
    }

    async fn delete(&self, id: &str) -> Result<(), GatewayError> {
        tokio::task::yield_now().await;
        self.record(Call::Delete(id.to_string()));
        self.check(Op::Delete)?;
        self.inner.delete(id).await
    }

    async fn load_settings(&self) -> Result<Option<UserSettings>, GatewayError> {
        self.record(Call::LoadSettings);
        self.check(Op::LoadSettings)?;
        self.inner.load_settings().await
    }

    async fn save_settings(&self, settings: UserSettings) -> Result<UserSettings, GatewayError> {
        self.record(Call::SaveSettings);
        self.check(Op::SaveSettings)?;
        self.inner.save_settings(settings).await
    }

    fn backend_name(&self) -> &'static str {
        "scripted"
    }
}

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap()
}

pub fn manuscript(id: &str, manuscript_id: &str) -> Manuscript {
    ManuscriptDraft::new(manuscript_id, "JRN")
        .id(id)
        .into_manuscript(at(1, 9))
}

pub struct Harness {
    pub gateway: Arc<ScriptedGateway>,
    pub clock: Arc<ManualClock>,
    pub coordinator: MutationCoordinator,
}

/// Coordinator over a scripted gateway holding `manuscripts`, already loaded.
/// The clock starts at June 10th, 12:00 UTC.
pub async fn harness(manuscripts: Vec<Manuscript>) -> Harness {
    let gateway = Arc::new(ScriptedGateway::with_manuscripts(manuscripts));
    let clock = Arc::new(ManualClock::new(at(10, 12)));
    let coordinator = MutationCoordinator::with_clock(gateway.clone(), clock.clone());
    coordinator.reload().await.unwrap();
    gateway.clear_calls();
    Harness {
        gateway,
        clock,
        coordinator,
    }
}
