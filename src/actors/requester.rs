use actix::prelude::*;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use crate::directory::Directory;
use crate::domain::{Consultation, PatientId, PatientRecord, ProviderId};
use crate::messages::{
    AckOutcome, CompletionNotice, ConsultationRequest, PatientRegister, RequestAck, ScheduleNotice,
};

// ============================================================================
// Requester Actor - originates consultation requests
// ============================================================================
//
// Keeps two strictly separate identity spaces:
// - a local `u64` ref for each pending request, assigned here and never sent
//   on the wire
// - the authoritative consultation id, assigned by the Coordinator and only
//   learned through ScheduleNotice
//
// The mirror list holds authoritative records only; pending entries are
// dropped once a notice for the same (provider, when) arrives.
//
// ============================================================================

pub struct RequesterActor {
    directory: Arc<Directory>,
    patient_id: PatientId,
    name: String,
    surname: String,
    notes: String,
    consultations: Vec<Consultation>,
    pending: HashMap<u64, Consultation>,
    next_local_ref: u64,
}

impl RequesterActor {
    pub fn new(
        directory: Arc<Directory>,
        patient_id: PatientId,
        name: impl Into<String>,
        surname: impl Into<String>,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            directory,
            patient_id,
            name: name.into(),
            surname: surname.into(),
            notes: notes.into(),
            consultations: Vec::new(),
            pending: HashMap::new(),
            next_local_ref: 1,
        }
    }

}

impl Actor for RequesterActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.directory
            .register_requester(self.patient_id, ctx.address());
        tracing::info!(
            patient_id = self.patient_id,
            name = %self.name,
            surname = %self.surname,
            "Requester actor started"
        );
    }
}

// ============================================================================
// Control Messages
// ============================================================================

/// Ask the Coordinator to schedule a consultation with the given provider.
/// Replies with the provisional local ref, not an authoritative id.
#[derive(Message)]
#[rtype(result = "u64")]
pub struct RequestConsultation {
    pub provider_id: ProviderId,
    pub when: DateTime<Utc>,
}

/// Register this patient with the Coordinator's registry.
#[derive(Message)]
#[rtype(result = "()")]
pub struct RegisterSelf;

/// Snapshot of the authoritative consultations mirrored so far.
#[derive(Message)]
#[rtype(result = "Vec<Consultation>")]
pub struct GetMirroredConsultations;

// ============================================================================
// Message Handlers
// ============================================================================

impl Handler<RequestConsultation> for RequesterActor {
    type Result = MessageResult<RequestConsultation>;

    fn handle(&mut self, msg: RequestConsultation, _: &mut Self::Context) -> Self::Result {
        let consultation = Consultation::requested(self.patient_id, msg.provider_id, msg.when);

        let local_ref = self.next_local_ref;
        self.next_local_ref += 1;
        self.pending.insert(local_ref, consultation.clone());

        tracing::info!(
            patient_id = self.patient_id,
            provider_id = msg.provider_id,
            when = %msg.when,
            local_ref,
            "Consultation request sent"
        );

        match self.directory.resolve_coordinator() {
            Some(coordinator) => coordinator.do_send(ConsultationRequest { consultation }),
            None => tracing::warn!(
                patient_id = self.patient_id,
                local_ref,
                "No coordinator registered, request dropped"
            ),
        }

        MessageResult(local_ref)
    }
}

impl Handler<RegisterSelf> for RequesterActor {
    type Result = ResponseFuture<()>;

    fn handle(&mut self, _: RegisterSelf, _: &mut Self::Context) -> Self::Result {
        let directory = self.directory.clone();
        let patient_id = self.patient_id;
        let mut patient = PatientRecord::new(self.name.clone(), self.surname.clone(), self.notes.clone());
        patient.id = Some(patient_id);

        Box::pin(async move {
            let Some(coordinator) = directory.resolve_coordinator() else {
                tracing::warn!(patient_id, "No coordinator registered, registration dropped");
                return;
            };

            match coordinator.send(PatientRegister { patient }).await {
                Ok(record) => tracing::info!(
                    patient_id = ?record.id,
                    name = %record.name,
                    surname = %record.surname,
                    "Patient registered"
                ),
                Err(e) => tracing::warn!(patient_id, error = %e, "Registration failed"),
            }
        })
    }
}

impl Handler<RequestAck> for RequesterActor {
    type Result = ();

    // Acks carry no authoritative identity; log only, no state change.
    fn handle(&mut self, msg: RequestAck, _: &mut Self::Context) {
        match msg.outcome {
            AckOutcome::Forwarded => tracing::info!(
                patient_id = self.patient_id,
                status = %msg.status,
                "Request acknowledged"
            ),
            AckOutcome::Failure => tracing::warn!(
                patient_id = self.patient_id,
                status = %msg.status,
                "Request could not be relayed"
            ),
        }
    }
}

impl Handler<ScheduleNotice> for RequesterActor {
    type Result = ();

    fn handle(&mut self, msg: ScheduleNotice, _: &mut Self::Context) {
        let consultation = msg.consultation;

        if consultation.id.is_none() {
            tracing::warn!(
                patient_id = self.patient_id,
                "Schedule notice without authoritative id, dropping"
            );
            return;
        }

        tracing::info!(
            patient_id = self.patient_id,
            consultation_id = ?consultation.id,
            status = ?consultation.status,
            when = %consultation.when,
            "Consultation update received"
        );

        // Reconcile: the authoritative record supersedes the matching pending
        // provisional entry.
        let resolved = self
            .pending
            .iter()
            .find(|(_, p)| {
                p.provider_id == consultation.provider_id && p.when == consultation.when
            })
            .map(|(local_ref, _)| *local_ref);
        if let Some(local_ref) = resolved {
            self.pending.remove(&local_ref);
        }

        match self
            .consultations
            .iter_mut()
            .find(|c| c.id == consultation.id)
        {
            Some(existing) => *existing = consultation,
            None => self.consultations.push(consultation),
        }
    }
}

impl Handler<CompletionNotice> for RequesterActor {
    type Result = ();

    fn handle(&mut self, msg: CompletionNotice, _: &mut Self::Context) {
        tracing::info!(
            patient_id = self.patient_id,
            consultation_id = msg.consultation_id,
            diagnostic_id = %msg.diagnostic_id,
            note = %msg.note,
            "Completion notice received"
        );
    }
}

impl Handler<GetMirroredConsultations> for RequesterActor {
    type Result = MessageResult<GetMirroredConsultations>;

    fn handle(&mut self, _: GetMirroredConsultations, _: &mut Self::Context) -> Self::Result {
        MessageResult(self.consultations.clone())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
