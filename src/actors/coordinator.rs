use actix::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

use crate::directory::Directory;
use crate::domain::{
    Availability, Consultation, ConsultationStatus, Diagnostic, PatientId, PatientRecord,
    ProviderId, SchedulingError,
};
use crate::messages::{
    AckOutcome, AvailabilityAnnounce, CompletionNotice, ConsultationRequest, Decision,
    DiagnosticSubmit, PatientRegister, ProviderDecision, RequestAck, ScheduleNotice,
};

// ============================================================================
// Coordinator Actor - central router and registry
// ============================================================================
//
// Responsibilities:
// - Assigns authoritative consultation and patient identities
// - Forwards consultation requests to the named provider
// - Reconciles provider decisions and pushes updates to the mirrors
// - Caches per-provider availabilities and per-patient diagnostic history
//
// The identity counters and the slot-allocation check both run inside a
// single handler invocation, and every handler runs to completion before the
// next inbound message is taken from the mailbox. That serialization is what
// keeps two racing requests from both claiming the same slot.
//
// ============================================================================

pub struct CoordinatorActor {
    directory: Arc<Directory>,
    patients: Vec<PatientRecord>,
    consultations: Vec<Consultation>,
    provider_availabilities: HashMap<ProviderId, Vec<Availability>>,
    patient_diagnostics: HashMap<PatientId, Vec<Diagnostic>>,
    next_consultation_id: u64,
    next_patient_id: u64,
}

impl CoordinatorActor {
    pub fn new(directory: Arc<Directory>) -> Self {
        Self {
            directory,
            patients: Vec::new(),
            consultations: Vec::new(),
            provider_availabilities: HashMap::new(),
            patient_diagnostics: HashMap::new(),
            next_consultation_id: 1,
            next_patient_id: 1,
        }
    }

    fn assign_consultation_id(&mut self) -> u64 {
        let id = self.next_consultation_id;
        self.next_consultation_id += 1;
        id
    }

    /// A scheduled consultation already holds this provider's slot. Used when
    /// applying an Approved decision: the second of two racing approvals for
    /// the same slot gets downgraded to a refusal.
    fn scheduled_conflict(
        &self,
        candidate_id: u64,
        provider_id: ProviderId,
        when: chrono::DateTime<chrono::Utc>,
    ) -> bool {
        self.consultations.iter().any(|c| {
            c.id != Some(candidate_id)
                && c.provider_id == provider_id
                && c.when == when
                && c.status == ConsultationStatus::Scheduled
        })
    }

    /// Slot consumption for organizeConsultation: any non-refused
    /// consultation at the same (provider, when) blocks the slot.
    fn slot_taken(&self, provider_id: ProviderId, when: chrono::DateTime<chrono::Utc>) -> bool {
        self.consultations.iter().any(|c| {
            c.provider_id == provider_id
                && c.when == when
                && c.status != ConsultationStatus::Refused
        })
    }

    fn notify_requester(&self, patient_id: PatientId, notice: ScheduleNotice) {
        match self.directory.resolve_requester(patient_id) {
            Some(requester) => requester.do_send(notice),
            None => tracing::warn!(
                error = %SchedulingError::UnknownRequester(patient_id),
                "Requester notice dropped"
            ),
        }
    }

    fn notify_provider(&self, provider_id: ProviderId, notice: ScheduleNotice) {
        match self.directory.resolve_provider(provider_id) {
            Some(provider) => provider.do_send(notice),
            None => tracing::warn!(
                error = %SchedulingError::UnknownProvider(provider_id),
                "Provider notice dropped"
            ),
        }
    }
}

impl Actor for CoordinatorActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.directory.register_coordinator(ctx.address());
        tracing::info!("Coordinator actor started");
    }
}

// ============================================================================
// Control Messages
// ============================================================================

/// Alternate entry point: schedule the consultation into the first free
/// cached slot of the given provider. Fails with NoAvailableSlot (and sends
/// nothing) when every cached slot is consumed.
#[derive(Message)]
#[rtype(result = "Result<Consultation, SchedulingError>")]
pub struct OrganizeConsultation {
    pub consultation: Consultation,
    pub provider_id: ProviderId,
}

// Snapshot queries. Value copies only, never live references.

#[derive(Message)]
#[rtype(result = "Vec<PatientRecord>")]
pub struct GetPatients;

#[derive(Message)]
#[rtype(result = "Vec<Consultation>")]
pub struct GetConsultations;

#[derive(Message)]
#[rtype(result = "Vec<Availability>")]
pub struct GetProviderAvailabilities {
    pub provider_id: ProviderId,
}

#[derive(Message)]
#[rtype(result = "Vec<Diagnostic>")]
pub struct GetPatientDiagnostics {
    pub patient_id: PatientId,
}

// ============================================================================
// Message Handlers
// ============================================================================

impl Handler<PatientRegister> for CoordinatorActor {
    type Result = MessageResult<PatientRegister>;

    fn handle(&mut self, msg: PatientRegister, _: &mut Self::Context) -> Self::Result {
        let mut candidate = msg.patient;

        if let Some(existing) = self.patients.iter().find(|p| p.same_person(&candidate)) {
            tracing::info!(
                patient_id = ?existing.id,
                name = %existing.name,
                surname = %existing.surname,
                "Patient already registered"
            );
            return MessageResult(existing.clone());
        }

        if candidate.id.is_none() {
            candidate.id = Some(self.next_patient_id);
            self.next_patient_id += 1;
        }
        self.patients.push(candidate.clone());

        tracing::info!(
            patient_id = ?candidate.id,
            name = %candidate.name,
            surname = %candidate.surname,
            "New patient registered"
        );
        MessageResult(candidate)
    }
}

impl Handler<ConsultationRequest> for CoordinatorActor {
    type Result = ();

    fn handle(&mut self, msg: ConsultationRequest, _: &mut Self::Context) {
        let mut consultation = msg.consultation;

        let id = self.assign_consultation_id();
        consultation.id = Some(id);
        consultation.status = ConsultationStatus::Requested;
        self.consultations.push(consultation.clone());

        tracing::info!(
            consultation_id = id,
            patient_id = consultation.patient_id,
            provider_id = consultation.provider_id,
            when = %consultation.when,
            "Consultation request received"
        );

        // Forward to the provider; the ack tells the requester whether the
        // relay happened, not what was decided.
        let ack = match self.directory.resolve_provider(consultation.provider_id) {
            Some(provider) => {
                provider.do_send(ConsultationRequest {
                    consultation: consultation.clone(),
                });
                RequestAck {
                    outcome: AckOutcome::Forwarded,
                    status: format!(
                        "consultation #{id} forwarded to provider #{}",
                        consultation.provider_id
                    ),
                }
            }
            None => {
                tracing::warn!(
                    consultation_id = id,
                    error = %SchedulingError::UnknownProvider(consultation.provider_id),
                    "Request could not be forwarded"
                );
                RequestAck {
                    outcome: AckOutcome::Failure,
                    status: format!("provider #{} unreachable", consultation.provider_id),
                }
            }
        };

        match self.directory.resolve_requester(consultation.patient_id) {
            Some(requester) => requester.do_send(ack),
            None => tracing::warn!(
                error = %SchedulingError::UnknownRequester(consultation.patient_id),
                "Ack dropped"
            ),
        }
    }
}

impl Handler<ProviderDecision> for CoordinatorActor {
    type Result = ();

    fn handle(&mut self, msg: ProviderDecision, _: &mut Self::Context) {
        let Some(id) = msg.consultation.id else {
            tracing::warn!(
                error = %SchedulingError::UnassignedConsultation,
                "Malformed decision, dropping"
            );
            return;
        };

        let Some(idx) = self.consultations.iter().position(|c| c.id == Some(id)) else {
            tracing::warn!(
                error = %SchedulingError::ConsultationNotFound(id),
                "Decision references unknown consultation, dropping"
            );
            return;
        };

        let provider_id = self.consultations[idx].provider_id;
        let when = self.consultations[idx].when;

        // Re-check the slot at decision time: the provider does not consume
        // slots, so two racing approvals for the same slot both arrive here
        // and only the first may schedule.
        let effective = match msg.decision {
            Decision::Approved if self.scheduled_conflict(id, provider_id, when) => {
                tracing::warn!(
                    consultation_id = id,
                    provider_id,
                    when = %when,
                    "Slot already scheduled, downgrading approval to refusal"
                );
                Decision::Refused
            }
            decision => decision,
        };

        let transition = match effective {
            Decision::Approved => self.consultations[idx].schedule(),
            Decision::Refused => self.consultations[idx].refuse(),
        };
        if let Err(e) = transition {
            tracing::warn!(consultation_id = id, error = %e, "Decision dropped");
            return;
        }

        let updated = self.consultations[idx].clone();
        tracing::info!(
            consultation_id = id,
            status = ?updated.status,
            "Provider decision applied"
        );

        if updated.status == ConsultationStatus::Scheduled {
            self.notify_provider(
                provider_id,
                ScheduleNotice {
                    consultation: updated.clone(),
                },
            );
        }
        self.notify_requester(updated.patient_id, ScheduleNotice { consultation: updated });
    }
}

impl Handler<AvailabilityAnnounce> for CoordinatorActor {
    type Result = ();

    fn handle(&mut self, msg: AvailabilityAnnounce, _: &mut Self::Context) {
        let availability = msg.availability;
        tracing::debug!(
            provider_id = availability.provider_id,
            when = %availability.when,
            duration_minutes = availability.duration_minutes,
            "Availability announced"
        );

        // Upsert by exact (provider, when): re-announcing a slot replaces it.
        let cache = self
            .provider_availabilities
            .entry(availability.provider_id)
            .or_default();
        match cache.iter_mut().find(|a| a.when == availability.when) {
            Some(existing) => *existing = availability,
            None => cache.push(availability),
        }
    }
}

impl Handler<DiagnosticSubmit> for CoordinatorActor {
    type Result = ();

    fn handle(&mut self, msg: DiagnosticSubmit, _: &mut Self::Context) {
        let diagnostic = msg.diagnostic;

        let Some(idx) = self
            .consultations
            .iter()
            .position(|c| c.id == Some(diagnostic.consultation_id))
        else {
            tracing::warn!(
                error = %SchedulingError::ConsultationNotFound(diagnostic.consultation_id),
                "Diagnostic references unknown consultation, dropping"
            );
            return;
        };

        if let Err(e) = self.consultations[idx].complete() {
            tracing::warn!(
                consultation_id = diagnostic.consultation_id,
                error = %e,
                "Diagnostic dropped"
            );
            return;
        }

        let updated = self.consultations[idx].clone();
        self.patient_diagnostics
            .entry(updated.patient_id)
            .or_default()
            .push(diagnostic.clone());

        tracing::info!(
            consultation_id = diagnostic.consultation_id,
            patient_id = updated.patient_id,
            diagnostic_id = %diagnostic.id,
            "Consultation completed"
        );

        let patient_id = updated.patient_id;
        let consultation_id = diagnostic.consultation_id;
        self.notify_requester(patient_id, ScheduleNotice { consultation: updated });
        match self.directory.resolve_requester(patient_id) {
            Some(requester) => requester.do_send(CompletionNotice {
                consultation_id,
                diagnostic_id: diagnostic.id,
                note: "consultation completed, a diagnostic is available".to_string(),
            }),
            None => tracing::warn!(
                error = %SchedulingError::UnknownRequester(patient_id),
                "Completion notice dropped"
            ),
        }
    }
}

impl Handler<OrganizeConsultation> for CoordinatorActor {
    type Result = Result<Consultation, SchedulingError>;

    fn handle(&mut self, msg: OrganizeConsultation, _: &mut Self::Context) -> Self::Result {
        let slot = self
            .provider_availabilities
            .get(&msg.provider_id)
            .and_then(|cache| {
                cache
                    .iter()
                    .find(|a| !self.slot_taken(msg.provider_id, a.when))
                    .cloned()
            });

        let Some(slot) = slot else {
            tracing::info!(
                provider_id = msg.provider_id,
                "No free slot, consultation not organized"
            );
            return Err(SchedulingError::NoAvailableSlot(msg.provider_id));
        };

        let mut consultation = msg.consultation;
        if consultation.id.is_none() {
            consultation.id = Some(self.assign_consultation_id());
        }
        consultation.provider_id = msg.provider_id;
        consultation.when = slot.when;
        // Organized consultations never pass through Requested: the slot is
        // picked and confirmed in the same handler call.
        consultation.status = ConsultationStatus::Scheduled;
        self.consultations.push(consultation.clone());

        tracing::info!(
            consultation_id = ?consultation.id,
            patient_id = consultation.patient_id,
            provider_id = msg.provider_id,
            when = %consultation.when,
            "Consultation organized"
        );

        self.notify_provider(
            msg.provider_id,
            ScheduleNotice {
                consultation: consultation.clone(),
            },
        );
        self.notify_requester(
            consultation.patient_id,
            ScheduleNotice {
                consultation: consultation.clone(),
            },
        );

        Ok(consultation)
    }
}

impl Handler<GetPatients> for CoordinatorActor {
    type Result = MessageResult<GetPatients>;

    fn handle(&mut self, _: GetPatients, _: &mut Self::Context) -> Self::Result {
        MessageResult(self.patients.clone())
    }
}

impl Handler<GetConsultations> for CoordinatorActor {
    type Result = MessageResult<GetConsultations>;

    fn handle(&mut self, _: GetConsultations, _: &mut Self::Context) -> Self::Result {
        MessageResult(self.consultations.clone())
    }
}

impl Handler<GetProviderAvailabilities> for CoordinatorActor {
    type Result = MessageResult<GetProviderAvailabilities>;

    fn handle(&mut self, msg: GetProviderAvailabilities, _: &mut Self::Context) -> Self::Result {
        MessageResult(
            self.provider_availabilities
                .get(&msg.provider_id)
                .cloned()
                .unwrap_or_default(),
        )
    }
}

impl Handler<GetPatientDiagnostics> for CoordinatorActor {
    type Result = MessageResult<GetPatientDiagnostics>;

    fn handle(&mut self, msg: GetPatientDiagnostics, _: &mut Self::Context) -> Self::Result {
        MessageResult(
            self.patient_diagnostics
                .get(&msg.patient_id)
                .cloned()
                .unwrap_or_default(),
        )
    }
}

// ============================================================================
// Scenario Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::{
        AddAvailability, GetAcceptedConsultations, GetMirroredConsultations, IssueDiagnostic,
        ProviderActor, RequestConsultation, RequesterActor,
    };
    use chrono::{DateTime, TimeZone, Utc};
    use futures_util::future::join_all;
    use std::time::Duration;

    const PATIENT: PatientId = 123;
    const PROVIDER: ProviderId = 1;

    fn slot_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 10, 0, 0).unwrap()
    }

    struct Harness {
        coordinator: Addr<CoordinatorActor>,
        provider: Addr<ProviderActor>,
        requester: Addr<RequesterActor>,
    }

    async fn harness() -> Harness {
        let directory = Arc::new(Directory::new());
        let coordinator = CoordinatorActor::new(directory.clone()).start();
        let provider = ProviderActor::new(directory.clone(), PROVIDER, "House", "Diagnostics").start();
        let requester = RequesterActor::new(directory.clone(), PATIENT, "Curie", "Marie", "").start();
        settle().await;
        Harness {
            coordinator,
            provider,
            requester,
        }
    }

    // Let fire-and-forget notification chains drain.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[actix::test]
    async fn test_register_patient_assigns_id_and_dedupes() {
        let h = harness().await;

        let first = h
            .coordinator
            .send(PatientRegister {
                patient: PatientRecord::new("Curie", "Marie", "radiology follow-up"),
            })
            .await
            .unwrap();
        assert_eq!(first.id, Some(1));

        // Same (name, surname) pair: the existing record comes back.
        let duplicate = h
            .coordinator
            .send(PatientRegister {
                patient: PatientRecord::new("Curie", "Marie", "different notes"),
            })
            .await
            .unwrap();
        assert_eq!(duplicate.id, Some(1));
        assert_eq!(duplicate.notes, "radiology follow-up");

        let second = h
            .coordinator
            .send(PatientRegister {
                patient: PatientRecord::new("Pasteur", "Louis", ""),
            })
            .await
            .unwrap();
        assert_eq!(second.id, Some(2));

        let patients = h.coordinator.send(GetPatients).await.unwrap();
        assert_eq!(patients.len(), 2);
    }

    #[actix::test]
    async fn test_concurrent_requests_get_unique_increasing_ids() {
        let h = harness().await;

        let sends = (0..5u64).map(|i| {
            h.coordinator.send(ConsultationRequest {
                consultation: Consultation::requested(
                    PATIENT,
                    // Providers that never registered: the request is still
                    // stored, the ack is a failure.
                    100 + i,
                    slot_time() + chrono::Duration::hours(i as i64),
                ),
            })
        });
        join_all(sends).await;
        settle().await;

        let consultations = h.coordinator.send(GetConsultations).await.unwrap();
        assert_eq!(consultations.len(), 5);

        let ids: Vec<u64> = consultations.iter().filter_map(|c| c.id).collect();
        assert_eq!(ids.len(), 5);
        // Unique and strictly increasing in assignment order.
        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert!(consultations
            .iter()
            .all(|c| c.status == ConsultationStatus::Requested));
    }

    #[actix::test]
    async fn test_round_trip_scheduling() {
        let h = harness().await;

        h.provider
            .send(AddAvailability {
                when: slot_time(),
                duration_minutes: 30,
            })
            .await
            .unwrap();

        h.requester
            .send(RequestConsultation {
                provider_id: PROVIDER,
                when: slot_time(),
            })
            .await
            .unwrap();
        settle().await;

        let consultations = h.coordinator.send(GetConsultations).await.unwrap();
        assert_eq!(consultations.len(), 1);
        assert_eq!(consultations[0].id, Some(1));
        assert_eq!(consultations[0].status, ConsultationStatus::Scheduled);

        // The requester's mirror carries the same authoritative id.
        let mirrored = h.requester.send(GetMirroredConsultations).await.unwrap();
        assert_eq!(mirrored.len(), 1);
        assert_eq!(mirrored[0].id, Some(1));
        assert_eq!(mirrored[0].status, ConsultationStatus::Scheduled);
        assert_eq!(mirrored[0].provider_id, PROVIDER);
        assert_eq!(mirrored[0].when, slot_time());

        // The provider mirrors scheduled consultations too.
        let accepted = h.provider.send(GetAcceptedConsultations).await.unwrap();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].id, Some(1));
    }

    #[actix::test]
    async fn test_refused_when_no_exact_slot_match() {
        let h = harness().await;

        // A slot exists, but not at the requested time. No nearest-slot
        // fallback: the request is refused.
        h.provider
            .send(AddAvailability {
                when: slot_time() + chrono::Duration::hours(2),
                duration_minutes: 30,
            })
            .await
            .unwrap();

        h.requester
            .send(RequestConsultation {
                provider_id: PROVIDER,
                when: slot_time(),
            })
            .await
            .unwrap();
        settle().await;

        let consultations = h.coordinator.send(GetConsultations).await.unwrap();
        assert_eq!(consultations.len(), 1);
        assert_eq!(consultations[0].status, ConsultationStatus::Refused);

        let mirrored = h.requester.send(GetMirroredConsultations).await.unwrap();
        assert_eq!(mirrored.len(), 1);
        assert_eq!(mirrored[0].status, ConsultationStatus::Refused);

        let accepted = h.provider.send(GetAcceptedConsultations).await.unwrap();
        assert!(accepted.is_empty());
    }

    #[actix::test]
    async fn test_provider_with_no_availabilities_approves() {
        let h = harness().await;

        // Fail-open bootstrap default: an empty availability list approves
        // any request.
        h.requester
            .send(RequestConsultation {
                provider_id: PROVIDER,
                when: slot_time(),
            })
            .await
            .unwrap();
        settle().await;

        let mirrored = h.requester.send(GetMirroredConsultations).await.unwrap();
        assert_eq!(mirrored.len(), 1);
        assert_eq!(mirrored[0].status, ConsultationStatus::Scheduled);
    }

    #[actix::test]
    async fn test_availability_announce_upserts_by_when() {
        let h = harness().await;

        h.provider
            .send(AddAvailability {
                when: slot_time(),
                duration_minutes: 30,
            })
            .await
            .unwrap();
        h.provider
            .send(AddAvailability {
                when: slot_time(),
                duration_minutes: 45,
            })
            .await
            .unwrap();
        settle().await;

        let cached = h
            .coordinator
            .send(GetProviderAvailabilities {
                provider_id: PROVIDER,
            })
            .await
            .unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].duration_minutes, 45);
    }

    #[actix::test]
    async fn test_diagnostic_completes_consultation() {
        let h = harness().await;

        h.provider
            .send(AddAvailability {
                when: slot_time(),
                duration_minutes: 30,
            })
            .await
            .unwrap();
        h.requester
            .send(RequestConsultation {
                provider_id: PROVIDER,
                when: slot_time(),
            })
            .await
            .unwrap();
        settle().await;

        let diagnostic = h
            .provider
            .send(IssueDiagnostic {
                consultation_id: 1,
                description: "seasonal flu".to_string(),
                recommendations: "rest and fluids".to_string(),
            })
            .await
            .unwrap()
            .unwrap();
        settle().await;

        let consultations = h.coordinator.send(GetConsultations).await.unwrap();
        assert_eq!(consultations[0].status, ConsultationStatus::Completed);

        let history = h
            .coordinator
            .send(GetPatientDiagnostics {
                patient_id: PATIENT,
            })
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, diagnostic.id);

        let mirrored = h.requester.send(GetMirroredConsultations).await.unwrap();
        assert_eq!(mirrored[0].status, ConsultationStatus::Completed);
    }

    #[actix::test]
    async fn test_unknown_decision_correlation_is_dropped() {
        let h = harness().await;

        let mut ghost = Consultation::requested(PATIENT, PROVIDER, slot_time());
        ghost.id = Some(99);
        h.coordinator
            .send(ProviderDecision {
                decision: Decision::Approved,
                consultation: ghost,
            })
            .await
            .unwrap();

        // Dropped without a reply and without corrupting state.
        let consultations = h.coordinator.send(GetConsultations).await.unwrap();
        assert!(consultations.is_empty());
        let mirrored = h.requester.send(GetMirroredConsultations).await.unwrap();
        assert!(mirrored.is_empty());
    }

    #[actix::test]
    async fn test_decision_without_id_is_dropped() {
        let h = harness().await;

        h.coordinator
            .send(ProviderDecision {
                decision: Decision::Refused,
                consultation: Consultation::requested(PATIENT, PROVIDER, slot_time()),
            })
            .await
            .unwrap();

        let consultations = h.coordinator.send(GetConsultations).await.unwrap();
        assert!(consultations.is_empty());
    }

    #[actix::test]
    async fn test_duplicate_decision_for_terminal_consultation_is_dropped() {
        let h = harness().await;

        h.requester
            .send(RequestConsultation {
                provider_id: PROVIDER,
                when: slot_time(),
            })
            .await
            .unwrap();
        settle().await;

        // Already Scheduled by the fail-open provider; a late refusal for the
        // same id must not rewind the state machine.
        let consultations = h.coordinator.send(GetConsultations).await.unwrap();
        h.coordinator
            .send(ProviderDecision {
                decision: Decision::Refused,
                consultation: consultations[0].clone(),
            })
            .await
            .unwrap();
        settle().await;

        let after = h.coordinator.send(GetConsultations).await.unwrap();
        assert_eq!(after[0].status, ConsultationStatus::Scheduled);
    }

    #[actix::test]
    async fn test_organize_consultation_picks_first_free_slot() {
        let h = harness().await;

        h.provider
            .send(AddAvailability {
                when: slot_time(),
                duration_minutes: 30,
            })
            .await
            .unwrap();
        settle().await;

        let organized = h
            .coordinator
            .send(OrganizeConsultation {
                consultation: Consultation::requested(PATIENT, PROVIDER, slot_time()),
                provider_id: PROVIDER,
            })
            .await
            .unwrap()
            .unwrap();
        settle().await;

        assert_eq!(organized.id, Some(1));
        assert_eq!(organized.when, slot_time());
        assert_eq!(organized.status, ConsultationStatus::Scheduled);

        let accepted = h.provider.send(GetAcceptedConsultations).await.unwrap();
        assert_eq!(accepted.len(), 1);
        let mirrored = h.requester.send(GetMirroredConsultations).await.unwrap();
        assert_eq!(mirrored.len(), 1);
    }

    #[actix::test]
    async fn test_organize_consultation_fails_without_free_slot() {
        let h = harness().await;

        let result = h
            .coordinator
            .send(OrganizeConsultation {
                consultation: Consultation::requested(PATIENT, PROVIDER, slot_time()),
                provider_id: PROVIDER,
            })
            .await
            .unwrap();
        settle().await;

        assert!(matches!(
            result,
            Err(SchedulingError::NoAvailableSlot(PROVIDER))
        ));

        // Failure is surfaced to the caller only; nothing was recorded or
        // sent.
        let consultations = h.coordinator.send(GetConsultations).await.unwrap();
        assert!(consultations.is_empty());
        let mirrored = h.requester.send(GetMirroredConsultations).await.unwrap();
        assert!(mirrored.is_empty());
    }

    #[actix::test]
    async fn test_organize_consultation_skips_consumed_slot() {
        let h = harness().await;

        h.provider
            .send(AddAvailability {
                when: slot_time(),
                duration_minutes: 30,
            })
            .await
            .unwrap();
        h.provider
            .send(AddAvailability {
                when: slot_time() + chrono::Duration::hours(1),
                duration_minutes: 30,
            })
            .await
            .unwrap();
        settle().await;

        let first = h
            .coordinator
            .send(OrganizeConsultation {
                consultation: Consultation::requested(PATIENT, PROVIDER, slot_time()),
                provider_id: PROVIDER,
            })
            .await
            .unwrap()
            .unwrap();
        let second = h
            .coordinator
            .send(OrganizeConsultation {
                consultation: Consultation::requested(PATIENT, PROVIDER, slot_time()),
                provider_id: PROVIDER,
            })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(first.when, slot_time());
        assert_eq!(second.when, slot_time() + chrono::Duration::hours(1));
    }

    #[actix::test]
    async fn test_single_slot_race_schedules_exactly_one() {
        let h = harness().await;

        h.provider
            .send(AddAvailability {
                when: slot_time(),
                duration_minutes: 30,
            })
            .await
            .unwrap();
        settle().await;

        // Two concurrent requests for the provider's only slot. The provider
        // approves both; the coordinator must downgrade the loser.
        let sends = (0..2).map(|_| {
            h.requester.send(RequestConsultation {
                provider_id: PROVIDER,
                when: slot_time(),
            })
        });
        join_all(sends).await;
        tokio::time::sleep(Duration::from_millis(150)).await;

        let consultations = h.coordinator.send(GetConsultations).await.unwrap();
        assert_eq!(consultations.len(), 2);

        let scheduled = consultations
            .iter()
            .filter(|c| c.status == ConsultationStatus::Scheduled)
            .count();
        let refused = consultations
            .iter()
            .filter(|c| c.status == ConsultationStatus::Refused)
            .count();
        assert_eq!(scheduled, 1, "exactly one request may win the slot");
        assert_eq!(refused, 1);
    }
}
