use actix::prelude::*;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::actors::{CoordinatorActor, ProviderActor, RequesterActor};
use crate::domain::{PatientId, ProviderId};

// ============================================================================
// Role Directory
// ============================================================================
//
// Explicit registry of running role instances, constructed once and injected
// (Arc) into every actor's constructor. Actors register themselves when they
// start; senders resolve a role to an address right before sending, so a
// message to a role that never came up resolves to None instead of failing
// the sending actor.
//
// ============================================================================

#[derive(Default)]
pub struct Directory {
    coordinator: RwLock<Option<Addr<CoordinatorActor>>>,
    providers: RwLock<HashMap<ProviderId, Addr<ProviderActor>>>,
    requesters: RwLock<HashMap<PatientId, Addr<RequesterActor>>>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_coordinator(&self, addr: Addr<CoordinatorActor>) {
        let mut slot = self.coordinator.write().expect("directory lock poisoned");
        if slot.replace(addr).is_some() {
            tracing::warn!("Coordinator re-registered, replacing previous address");
        }
    }

    pub fn resolve_coordinator(&self) -> Option<Addr<CoordinatorActor>> {
        self.coordinator
            .read()
            .expect("directory lock poisoned")
            .clone()
    }

    pub fn register_provider(&self, provider_id: ProviderId, addr: Addr<ProviderActor>) {
        self.providers
            .write()
            .expect("directory lock poisoned")
            .insert(provider_id, addr);
        tracing::debug!(provider_id, "Provider registered in directory");
    }

    pub fn resolve_provider(&self, provider_id: ProviderId) -> Option<Addr<ProviderActor>> {
        self.providers
            .read()
            .expect("directory lock poisoned")
            .get(&provider_id)
            .cloned()
    }

    pub fn register_requester(&self, patient_id: PatientId, addr: Addr<RequesterActor>) {
        self.requesters
            .write()
            .expect("directory lock poisoned")
            .insert(patient_id, addr);
        tracing::debug!(patient_id, "Requester registered in directory");
    }

    pub fn resolve_requester(&self, patient_id: PatientId) -> Option<Addr<RequesterActor>> {
        self.requesters
            .read()
            .expect("directory lock poisoned")
            .get(&patient_id)
            .cloned()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
