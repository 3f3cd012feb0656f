// ============================================================================
// Domain Module
// ============================================================================
//
// Scheduling domain model shared by all actors:
// - records.rs      - PatientRecord, Availability, Diagnostic value objects
// - consultation.rs - Consultation and its status state machine
// - errors.rs       - SchedulingError taxonomy
//
// All types here cross actor boundaries by value: payloads are cloned into
// messages, never aliased.
//
// ============================================================================

mod consultation;
mod errors;
mod records;

pub use consultation::{Consultation, ConsultationStatus};
pub use errors::SchedulingError;
pub use records::{Availability, Diagnostic, PatientRecord};

/// Identity assigned by the Coordinator's patient registry.
pub type PatientId = u64;

/// Identity of a provider (doctor) role instance.
pub type ProviderId = u64;

/// Authoritative consultation identity, assigned only by the Coordinator.
pub type ConsultationId = u64;
