//! Patient intake records and the documents the record store keeps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::Error;

/// Rejection message for a body that is not a non-empty JSON object.
pub const MALFORMED_BODY: &str = "Request body is empty or not properly formatted";

/// A fully-defaulted intake record as submitted by the onboarding form.
///
/// Missing or `null` fields become empty strings or lists, so nothing
/// downstream has to reason about absent values. A field with the wrong JSON
/// type is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatientIntake {
    #[serde(deserialize_with = "nullable")]
    pub personal_info: PersonalInfo,
    #[serde(deserialize_with = "nullable")]
    pub emergency_contacts: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub medical_info: MedicalInfo,
    #[serde(deserialize_with = "nullable")]
    pub doctor_info: DoctorInfo,
    #[serde(deserialize_with = "nullable")]
    pub routine_info: RoutineInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalInfo {
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub address: String,
    #[serde(deserialize_with = "nullable")]
    pub dob: String,
    #[serde(deserialize_with = "nullable")]
    pub contact_number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MedicalInfo {
    #[serde(deserialize_with = "nullable")]
    pub medications: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub conditions: String,
    #[serde(deserialize_with = "nullable")]
    pub surgery_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DoctorInfo {
    #[serde(deserialize_with = "nullable")]
    pub contact: String,
    #[serde(deserialize_with = "nullable")]
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoutineInfo {
    #[serde(deserialize_with = "nullable")]
    pub sleep_schedule: String,
    #[serde(deserialize_with = "nullable")]
    pub diet_preferences: String,
    #[serde(deserialize_with = "nullable")]
    pub allergies: String,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl PatientIntake {
    /// Validate a raw request body into a typed record.
    pub fn from_json(body: &Value) -> Result<Self, Error> {
        match body.as_object() {
            Some(fields) if !fields.is_empty() => {}
            _ => {
                return Err(Error::invalid_input(MALFORMED_BODY))
            }
        }

        let mut intake: PatientIntake = serde_json::from_value(body.clone())
            .map_err(|e| Error::invalid_input(format!("malformed intake record: {e}")))?;
        intake.drop_blank_entries();
        Ok(intake)
    }

    /// Canonical serialization used as generation input.
    pub fn to_canonical_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn drop_blank_entries(&mut self) {
        self.emergency_contacts.retain(|c| !c.trim().is_empty());
        self.medical_info.medications.retain(|m| !m.trim().is_empty());
    }
}

/// What the record store keeps for one patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDocument {
    #[serde(flatten)]
    pub intake: PatientIntake,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_schedule: Option<String>,
}

impl PatientDocument {
    /// Stage an intake record for insertion, stamped with the current time.
    pub fn staged(intake: PatientIntake) -> Self {
        Self {
            intake,
            created_at: Utc::now(),
            generated_schedule: None,
        }
    }

    pub fn with_schedule(mut self, schedule: impl Into<String>) -> Self {
        self.generated_schedule = Some(schedule.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_missing_fields_are_defaulted() {
        let intake = PatientIntake::from_json(&json!({
            "personalInfo": { "name": "Ann" },
            "medicalInfo": { "surgeryType": "knee" }
        }))
        .unwrap();

        assert_eq!(intake.personal_info.name, "Ann");
        assert_eq!(intake.personal_info.address, "");
        assert_eq!(intake.medical_info.surgery_type, "knee");
        assert!(intake.medical_info.medications.is_empty());
        assert!(intake.emergency_contacts.is_empty());
        assert_eq!(intake.routine_info, RoutineInfo::default());
    }

    #[test]
    fn test_null_fields_are_defaulted() {
        let intake = PatientIntake::from_json(&json!({
            "personalInfo": { "name": null, "dob": "1960-02-01" },
            "doctorInfo": null,
            "emergencyContacts": null
        }))
        .unwrap();

        assert_eq!(intake.personal_info.name, "");
        assert_eq!(intake.personal_info.dob, "1960-02-01");
        assert_eq!(intake.doctor_info, DoctorInfo::default());
        assert!(intake.emergency_contacts.is_empty());
    }

    #[test]
    fn test_blank_list_entries_are_dropped() {
        let intake = PatientIntake::from_json(&json!({
            "emergencyContacts": ["Bob 555-0100", "  "],
            "medicalInfo": { "medications": ["", "Ibuprofen 400mg"] }
        }))
        .unwrap();

        assert_eq!(intake.emergency_contacts, vec!["Bob 555-0100"]);
        assert_eq!(intake.medical_info.medications, vec!["Ibuprofen 400mg"]);
    }

    #[test]
    fn test_empty_or_non_object_body_is_rejected() {
        for body in [json!({}), json!(null), json!("text"), json!([1, 2])] {
            let err = PatientIntake::from_json(&body).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
        }
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        let err = PatientIntake::from_json(&json!({
            "medicalInfo": { "medications": "aspirin" }
        }))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().contains("malformed intake record"));
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let intake = PatientIntake::from_json(&json!({
            "personalInfo": { "name": "Ann" },
            "timestamp": "2024-03-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(intake.personal_info.name, "Ann");
    }

    #[test]
    fn test_canonical_json_is_stable() {
        let intake = PatientIntake::from_json(&json!({
            "routineInfo": { "allergies": "penicillin" },
            "personalInfo": { "name": "Ann" }
        }))
        .unwrap();
        let first = intake.to_canonical_json().unwrap();
        let second = intake.clone().to_canonical_json().unwrap();
        assert_eq!(first, second);
        // Field order follows the record layout, not the submission order.
        assert!(first.find("personalInfo").unwrap() < first.find("routineInfo").unwrap());
    }

    #[test]
    fn test_document_serializes_flat() {
        let intake = PatientIntake::from_json(&json!({
            "personalInfo": { "name": "Ann" }
        }))
        .unwrap();
        let document = PatientDocument::staged(intake).with_schedule("| Time | Task |");
        let value = serde_json::to_value(&document).unwrap();

        assert_eq!(value["personalInfo"]["name"], "Ann");
        assert_eq!(value["generatedSchedule"], "| Time | Task |");
        assert!(value.get("createdAt").is_some());

        let back: PatientDocument = serde_json::from_value(value).unwrap();
        assert_eq!(back, document);
    }
}
