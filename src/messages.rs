use actix::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Availability, Consultation, ConsultationId, Diagnostic, PatientRecord};

// ============================================================================
// Wire Protocol
// ============================================================================
//
// The typed message set exchanged between the three roles. Every payload is
// an owned copy of the sender's state; receiving a message never aliases
// another actor's data.
//
//   ConsultationRequest   Requester -> Coordinator -> Provider
//   RequestAck            Coordinator -> Requester
//   ProviderDecision      Provider -> Coordinator
//   AvailabilityAnnounce  Provider -> Coordinator
//   ScheduleNotice        Coordinator -> Provider / Requester
//   DiagnosticSubmit      Provider -> Coordinator
//   CompletionNotice      Coordinator -> Requester
//   PatientRegister       any -> Coordinator
//
// Actor-local control and query messages live next to their handlers in the
// actor modules.
//
// ============================================================================

/// Ask to schedule a consultation. On the first hop the consultation carries
/// no authoritative id; the Coordinator assigns one before forwarding.
#[derive(Message, Clone, Debug)]
#[rtype(result = "()")]
pub struct ConsultationRequest {
    pub consultation: Consultation,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AckOutcome {
    /// Request received and forwarded to the provider. Not yet a decision.
    Forwarded,
    /// The request could not be relayed; no decision will follow.
    Failure,
}

/// Coordinator's acknowledgment to the requester. Carries no authoritative
/// identity and causes no state change on the requester side.
#[derive(Message, Clone, Debug)]
#[rtype(result = "()")]
pub struct RequestAck {
    pub outcome: AckOutcome,
    pub status: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Approved,
    Refused,
}

/// Provider's answer to a forwarded request. The consultation (with its
/// authoritative id) is echoed back so the Coordinator can correlate the
/// decision without a separate lookup.
#[derive(Message, Clone, Debug)]
#[rtype(result = "()")]
pub struct ProviderDecision {
    pub decision: Decision,
    pub consultation: Consultation,
}

/// New or updated slot, announced by its owning provider.
#[derive(Message, Clone, Debug)]
#[rtype(result = "()")]
pub struct AvailabilityAnnounce {
    pub availability: Availability,
}

/// Authoritative consultation update pushed to the mirrors held by the
/// provider and the requester.
#[derive(Message, Clone, Debug)]
#[rtype(result = "()")]
pub struct ScheduleNotice {
    pub consultation: Consultation,
}

/// Consultation completion, submitted by the treating provider.
#[derive(Message, Clone, Debug)]
#[rtype(result = "()")]
pub struct DiagnosticSubmit {
    pub diagnostic: Diagnostic,
}

/// Tells the requester that a diagnostic is available for a completed
/// consultation.
#[derive(Message, Clone, Debug)]
#[rtype(result = "()")]
pub struct CompletionNotice {
    pub consultation_id: ConsultationId,
    pub diagnostic_id: Uuid,
    pub note: String,
}

/// Register (or dedupe) a patient with the Coordinator's registry. Replies
/// with the authoritative record.
#[derive(Message, Clone, Debug)]
#[rtype(result = "PatientRecord")]
pub struct PatientRegister {
    pub patient: PatientRecord,
}
