// ============================================================================
// Actors Module
// ============================================================================
//
// One actor per role:
// - coordinator.rs - receptionist: registry, id assignment, reconciliation
// - provider.rs    - doctor: availabilities, decisions, diagnostics
// - requester.rs   - patient: originates requests, mirrors outcomes
//
// Each actor processes one inbound message at a time from its mailbox and
// suspends when the mailbox is empty. All cross-actor state travels as owned
// message payloads; there are no shared locks between roles.
//
// ============================================================================

mod coordinator;
mod provider;
mod requester;

pub use coordinator::{
    CoordinatorActor, GetConsultations, GetPatientDiagnostics, GetPatients,
    GetProviderAvailabilities, OrganizeConsultation,
};
pub use provider::{
    AddAvailability, GetAcceptedConsultations, GetAvailabilities, GetPatientHistory,
    IssueDiagnostic, ProviderActor,
};
pub use requester::{GetMirroredConsultations, RegisterSelf, RequestConsultation, RequesterActor};
