use super::consultation::ConsultationStatus;
use super::{ConsultationId, PatientId, ProviderId};

// ============================================================================
// Scheduling Errors
// ============================================================================
//
// All failures are handled locally by the actor that detects them; nothing
// here ever crosses an actor boundary as a panic. Where no reply channel
// exists the error is logged and the message dropped.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("no available slot for provider #{0}")]
    NoAvailableSlot(ProviderId),

    #[error("consultation #{0} not found")]
    ConsultationNotFound(ConsultationId),

    #[error("invalid status transition: {from:?} -> {to:?}")]
    InvalidStatusTransition {
        from: ConsultationStatus,
        to: ConsultationStatus,
    },

    #[error("consultation carries no authoritative id")]
    UnassignedConsultation,

    #[error("no provider #{0} registered in the directory")]
    UnknownProvider(ProviderId),

    #[error("no requester registered for patient #{0}")]
    UnknownRequester(PatientId),
}
