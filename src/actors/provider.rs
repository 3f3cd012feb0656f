use actix::prelude::*;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use crate::directory::Directory;
use crate::domain::{
    Availability, Consultation, ConsultationId, Diagnostic, PatientId, ProviderId, SchedulingError,
};
use crate::messages::{
    AvailabilityAnnounce, ConsultationRequest, Decision, DiagnosticSubmit, ProviderDecision,
    ScheduleNotice,
};

// ============================================================================
// Provider Actor - owns availability and decides on requests
// ============================================================================
//
// Responsibilities:
// - Maintains the authoritative list of its own availability slots and
//   announces each one to the Coordinator
// - Decides Approved/Refused for forwarded consultation requests
// - Mirrors consultations the Coordinator scheduled with it
// - Issues diagnostics for treated consultations
//
// ============================================================================

pub struct ProviderActor {
    directory: Arc<Directory>,
    provider_id: ProviderId,
    name: String,
    specialty: String,
    availabilities: Vec<Availability>,
    accepted: Vec<Consultation>,
    patient_history: HashMap<PatientId, Vec<Diagnostic>>,
    next_availability_id: u64,
}

impl ProviderActor {
    pub fn new(
        directory: Arc<Directory>,
        provider_id: ProviderId,
        name: impl Into<String>,
        specialty: impl Into<String>,
    ) -> Self {
        Self {
            directory,
            provider_id,
            name: name.into(),
            specialty: specialty.into(),
            availabilities: Vec::new(),
            accepted: Vec::new(),
            patient_history: HashMap::new(),
            next_availability_id: 1,
        }
    }

    /// Decision policy: approve on an exact `when` match, or when no
    /// availability has been declared at all. The empty-list fail-open is a
    /// deliberate bootstrap/testing default and part of the documented
    /// contract, not an oversight.
    fn is_available_at(&self, when: DateTime<Utc>) -> bool {
        if self.availabilities.is_empty() {
            return true;
        }
        self.availabilities.iter().any(|a| a.when == when)
    }

    fn record_consultation(&mut self, consultation: Consultation) {
        match self.accepted.iter_mut().find(|c| c.id == consultation.id) {
            Some(existing) => *existing = consultation,
            None => self.accepted.push(consultation),
        }
    }
}

impl Actor for ProviderActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.directory
            .register_provider(self.provider_id, ctx.address());
        tracing::info!(
            provider_id = self.provider_id,
            name = %self.name,
            specialty = %self.specialty,
            "Provider actor started"
        );
    }
}

// ============================================================================
// Control Messages
// ============================================================================

/// Declare a new open slot and announce it to the Coordinator.
#[derive(Message)]
#[rtype(result = "Availability")]
pub struct AddAvailability {
    pub when: DateTime<Utc>,
    pub duration_minutes: u32,
}

/// Write a diagnostic for an already-scheduled consultation and submit it to
/// the Coordinator.
#[derive(Message)]
#[rtype(result = "Result<Diagnostic, SchedulingError>")]
pub struct IssueDiagnostic {
    pub consultation_id: ConsultationId,
    pub description: String,
    pub recommendations: String,
}

// Snapshot queries. Each returns a value copy of internal state, never a
// live reference.

#[derive(Message)]
#[rtype(result = "Vec<Availability>")]
pub struct GetAvailabilities;

#[derive(Message)]
#[rtype(result = "Vec<Consultation>")]
pub struct GetAcceptedConsultations;

#[derive(Message)]
#[rtype(result = "Vec<Diagnostic>")]
pub struct GetPatientHistory {
    pub patient_id: PatientId,
}

// ============================================================================
// Message Handlers
// ============================================================================

impl Handler<AddAvailability> for ProviderActor {
    type Result = MessageResult<AddAvailability>;

    fn handle(&mut self, msg: AddAvailability, _: &mut Self::Context) -> Self::Result {
        let availability = Availability {
            id: self.next_availability_id,
            provider_id: self.provider_id,
            when: msg.when,
            duration_minutes: msg.duration_minutes,
        };
        self.next_availability_id += 1;
        self.availabilities.push(availability.clone());

        tracing::info!(
            provider_id = self.provider_id,
            when = %availability.when,
            duration_minutes = availability.duration_minutes,
            "Availability added"
        );

        match self.directory.resolve_coordinator() {
            Some(coordinator) => coordinator.do_send(AvailabilityAnnounce {
                availability: availability.clone(),
            }),
            None => tracing::warn!(
                provider_id = self.provider_id,
                "No coordinator registered, availability not announced"
            ),
        }

        MessageResult(availability)
    }
}

impl Handler<ConsultationRequest> for ProviderActor {
    type Result = ();

    fn handle(&mut self, msg: ConsultationRequest, _: &mut Self::Context) {
        let consultation = msg.consultation;

        let decision = if self.is_available_at(consultation.when) {
            Decision::Approved
        } else {
            Decision::Refused
        };

        tracing::info!(
            provider_id = self.provider_id,
            consultation_id = ?consultation.id,
            when = %consultation.when,
            decision = ?decision,
            "Consultation request decided"
        );

        match self.directory.resolve_coordinator() {
            Some(coordinator) => coordinator.do_send(ProviderDecision {
                decision,
                consultation,
            }),
            None => tracing::warn!(
                provider_id = self.provider_id,
                "No coordinator registered, decision dropped"
            ),
        }
    }
}

impl Handler<ScheduleNotice> for ProviderActor {
    type Result = ();

    fn handle(&mut self, msg: ScheduleNotice, _: &mut Self::Context) {
        let consultation = msg.consultation;

        if consultation.id.is_none() {
            tracing::warn!(
                provider_id = self.provider_id,
                "Schedule notice without authoritative id, dropping"
            );
            return;
        }

        tracing::info!(
            provider_id = self.provider_id,
            consultation_id = ?consultation.id,
            when = %consultation.when,
            status = ?consultation.status,
            "Schedule notice received"
        );
        self.record_consultation(consultation);
    }
}

impl Handler<IssueDiagnostic> for ProviderActor {
    type Result = Result<Diagnostic, SchedulingError>;

    fn handle(&mut self, msg: IssueDiagnostic, _: &mut Self::Context) -> Self::Result {
        let consultation = self
            .accepted
            .iter()
            .find(|c| c.id == Some(msg.consultation_id))
            .cloned()
            .ok_or(SchedulingError::ConsultationNotFound(msg.consultation_id))?;

        let diagnostic = Diagnostic::new(msg.consultation_id, msg.description, msg.recommendations);

        self.patient_history
            .entry(consultation.patient_id)
            .or_default()
            .push(diagnostic.clone());

        tracing::info!(
            provider_id = self.provider_id,
            consultation_id = msg.consultation_id,
            patient_id = consultation.patient_id,
            diagnostic_id = %diagnostic.id,
            "Diagnostic issued"
        );

        match self.directory.resolve_coordinator() {
            Some(coordinator) => coordinator.do_send(DiagnosticSubmit {
                diagnostic: diagnostic.clone(),
            }),
            None => tracing::warn!(
                provider_id = self.provider_id,
                "No coordinator registered, diagnostic not submitted"
            ),
        }

        Ok(diagnostic)
    }
}

impl Handler<GetAvailabilities> for ProviderActor {
    type Result = MessageResult<GetAvailabilities>;

    fn handle(&mut self, _: GetAvailabilities, _: &mut Self::Context) -> Self::Result {
        MessageResult(self.availabilities.clone())
    }
}

impl Handler<GetAcceptedConsultations> for ProviderActor {
    type Result = MessageResult<GetAcceptedConsultations>;

    fn handle(&mut self, _: GetAcceptedConsultations, _: &mut Self::Context) -> Self::Result {
        MessageResult(self.accepted.clone())
    }
}

impl Handler<GetPatientHistory> for ProviderActor {
    type Result = MessageResult<GetPatientHistory>;

    fn handle(&mut self, msg: GetPatientHistory, _: &mut Self::Context) -> Self::Result {
        MessageResult(
            self.patient_history
                .get(&msg.patient_id)
                .cloned()
                .unwrap_or_default(),
        )
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
