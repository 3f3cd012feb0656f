use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::SchedulingError;
use super::{ConsultationId, PatientId, ProviderId};

// ============================================================================
// Consultation - the schedulable unit of work
// ============================================================================
//
// The Coordinator is the single authoritative owner of consultation identity
// and status. Provider and Requester only ever hold mirrored copies keyed by
// the same id, refreshed after each transition via ScheduleNotice.
//
// Status transitions:
//   Requested -> Scheduled | Refused   (provider decision)
//   Scheduled -> Completed             (diagnostic submitted)
//   Refused, Completed                 terminal
//
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsultationStatus {
    Requested,
    Scheduled,
    Refused,
    Completed,
}

impl ConsultationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConsultationStatus::Refused | ConsultationStatus::Completed)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Consultation {
    /// Authoritative id, assigned only by the Coordinator. `None` on the
    /// first hop of a request; a requester's provisional reference lives in
    /// its own local id space and never appears here.
    pub id: Option<ConsultationId>,
    pub when: DateTime<Utc>,
    pub status: ConsultationStatus,
    pub patient_id: PatientId,
    pub provider_id: ProviderId,
}

impl Consultation {
    pub fn requested(patient_id: PatientId, provider_id: ProviderId, when: DateTime<Utc>) -> Self {
        Self {
            id: None,
            when,
            status: ConsultationStatus::Requested,
            patient_id,
            provider_id,
        }
    }

    /// Apply a provider decision: `Requested -> Scheduled` on approval,
    /// `Requested -> Refused` otherwise.
    pub fn schedule(&mut self) -> Result<(), SchedulingError> {
        match self.status {
            ConsultationStatus::Requested => {
                self.status = ConsultationStatus::Scheduled;
                Ok(())
            }
            other => Err(SchedulingError::InvalidStatusTransition {
                from: other,
                to: ConsultationStatus::Scheduled,
            }),
        }
    }

    pub fn refuse(&mut self) -> Result<(), SchedulingError> {
        match self.status {
            ConsultationStatus::Requested => {
                self.status = ConsultationStatus::Refused;
                Ok(())
            }
            other => Err(SchedulingError::InvalidStatusTransition {
                from: other,
                to: ConsultationStatus::Refused,
            }),
        }
    }

    /// `Scheduled -> Completed`, on diagnostic submission.
    pub fn complete(&mut self) -> Result<(), SchedulingError> {
        match self.status {
            ConsultationStatus::Scheduled => {
                self.status = ConsultationStatus::Completed;
                Ok(())
            }
            other => Err(SchedulingError::InvalidStatusTransition {
                from: other,
                to: ConsultationStatus::Completed,
            }),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
