use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ConsultationId, PatientId, ProviderId};

// ============================================================================
// Scheduling Value Objects
// ============================================================================

/// A patient as known to the Coordinator's registry.
///
/// The id is assigned once, on first registration; re-registering the same
/// (name, surname) pair returns the existing record instead of a duplicate.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PatientRecord {
    pub id: Option<PatientId>,
    pub name: String,
    pub surname: String,
    pub notes: String,
}

impl PatientRecord {
    pub fn new(name: impl Into<String>, surname: impl Into<String>, notes: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            surname: surname.into(),
            notes: notes.into(),
        }
    }

    /// Registry dedupe key: two candidates with the same (name, surname) are
    /// the same patient.
    pub fn same_person(&self, other: &PatientRecord) -> bool {
        self.name == other.name && self.surname == other.surname
    }
}

/// An open time slot owned by the provider that created it. The Coordinator
/// holds a read-only mirror, upserted by exact `when` match.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Availability {
    /// Locally unique within the owning provider.
    pub id: u64,
    pub provider_id: ProviderId,
    pub when: DateTime<Utc>,
    pub duration_minutes: u32,
}

/// Outcome record produced by a provider after treating a consultation.
/// Immutable once created.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Diagnostic {
    pub id: Uuid,
    pub consultation_id: ConsultationId,
    pub description: String,
    pub recommendations: String,
}

impl Diagnostic {
    pub fn new(
        consultation_id: ConsultationId,
        description: impl Into<String>,
        recommendations: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            consultation_id,
            description: description.into(),
            recommendations: recommendations.into(),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_same_person_matches_on_name_and_surname() {
        let a = PatientRecord::new("Curie", "Marie", "radiology follow-up");
        let mut b = PatientRecord::new("Curie", "Marie", "different notes");
        b.id = Some(42);

        assert!(a.same_person(&b));

        let c = PatientRecord::new("Curie", "Pierre", "");
        assert!(!a.same_person(&c));
    }

    #[test]
    fn test_availability_serialization() {
        let availability = Availability {
            id: 1,
            provider_id: 7,
            when: Utc.with_ymd_and_hms(2024, 1, 10, 10, 0, 0).unwrap(),
            duration_minutes: 30,
        };

        let json = serde_json::to_string(&availability).unwrap();
        let deserialized: Availability = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.id, availability.id);
        assert_eq!(deserialized.provider_id, availability.provider_id);
        assert_eq!(deserialized.when, availability.when);
        assert_eq!(deserialized.duration_minutes, 30);
    }

    #[test]
    fn test_diagnostic_ids_are_unique() {
        let a = Diagnostic::new(1, "seasonal flu", "rest and fluids");
        let b = Diagnostic::new(1, "seasonal flu", "rest and fluids");
        assert_ne!(a.id, b.id);
        assert_eq!(a.consultation_id, b.consultation_id);
    }
}
