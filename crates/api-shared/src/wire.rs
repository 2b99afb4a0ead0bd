//! Request and response bodies of the clinic HTTP API.
//!
//! Request types are *drafts*: every field is optional so that create and update share one
//! shape and missing fields surface as field-keyed validation errors rather than
//! deserialisation failures. Optional text columns use `Option<Option<String>>` so an update can
//! tell "absent" (keep) from `null` (clear).

use chrono::{DateTime, NaiveDate, Utc};
use clinic_types::{Choice, Gender, MappingStatus, Specialization};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Marks a present field as `Some`, even when its value is `null`.
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageRes {
    pub message: String,
}

// ============================================================================
// AUTHENTICATION
// ============================================================================

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct RegisterReq {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirm: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct LoginReq {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct RefreshReq {
    pub refresh: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct UserRes {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub date_joined: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TokensRes {
    pub access: String,
    pub refresh: String,
}

/// Body returned by `/register` and `/login`.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthRes {
    pub message: String,
    pub user: UserRes,
    pub tokens: TokensRes,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RefreshRes {
    pub access: String,
}

// ============================================================================
// PATIENTS
// ============================================================================

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct PatientReq {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// `YYYY-MM-DD`
    pub date_of_birth: Option<String>,
    /// `M`, `F` or `O`
    pub gender: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub blood_group: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub allergies: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub medical_history: Option<Option<String>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PatientRes {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub blood_group: Option<String>,
    pub allergies: Option<String>,
    pub medical_history: Option<String>,
    /// Username of the owner.
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PatientEnvelope {
    pub message: String,
    pub patient: PatientRes,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PatientListRes {
    pub count: usize,
    pub patients: Vec<PatientRes>,
}

// ============================================================================
// DOCTORS
// ============================================================================

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct DoctorReq {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub license_number: Option<String>,
    pub specialization: Option<String>,
    pub experience_years: Option<i64>,
    pub qualification: Option<String>,
    pub hospital_name: Option<String>,
    pub hospital_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub consultation_fee: Option<Decimal>,
    pub availability: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub bio: Option<Option<String>>,
    /// Only honoured on update; new doctors always start active.
    pub is_active: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DoctorRes {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub license_number: String,
    pub specialization: Specialization,
    pub specialization_display: String,
    pub experience_years: u32,
    pub qualification: String,
    pub hospital_name: String,
    pub hospital_address: String,
    pub city: String,
    pub state: String,
    pub consultation_fee: Decimal,
    pub availability: String,
    pub bio: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

/// Reduced doctor view used in listings and nested inside mappings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DoctorSummaryRes {
    pub id: i64,
    pub full_name: String,
    pub specialization: Specialization,
    pub specialization_display: String,
    pub hospital_name: String,
    pub city: String,
    pub consultation_fee: Decimal,
    pub experience_years: u32,
    pub is_active: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DoctorEnvelope {
    pub message: String,
    pub doctor: DoctorRes,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DoctorListRes {
    pub count: usize,
    pub doctors: Vec<DoctorSummaryRes>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DoctorFilters {
    pub specialization: Option<String>,
    /// Case-insensitive substring of the city.
    pub city: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SpecializationsRes {
    pub specializations: Vec<Choice>,
}

// ============================================================================
// MAPPINGS
// ============================================================================

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct MappingCreateReq {
    pub patient: Option<i64>,
    pub doctor: Option<i64>,
    /// Defaults to `active`.
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct MappingUpdateReq {
    pub status: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatusFilter {
    pub status: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MappingRes {
    pub id: i64,
    pub patient: i64,
    pub doctor: i64,
    pub patient_details: PatientRes,
    pub doctor_details: DoctorSummaryRes,
    pub assigned_date: NaiveDate,
    pub status: MappingStatus,
    pub status_display: String,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct MappingEnvelope {
    pub message: String,
    pub mapping: MappingRes,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct MappingListRes {
    pub count: usize,
    pub mappings: Vec<MappingRes>,
}

/// Mappings of one patient, keyed the way clients expect: the doctors assigned to them.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PatientMappingsRes {
    /// Full name of the patient.
    pub patient: String,
    pub count: usize,
    pub doctors: Vec<MappingRes>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusChoicesRes {
    pub status_choices: Vec<Choice>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_text_distinguishes_absent_from_null() {
        let absent: PatientReq = serde_json::from_str(r#"{"city": "Leeds"}"#).unwrap();
        assert_eq!(absent.allergies, None);

        let cleared: PatientReq = serde_json::from_str(r#"{"allergies": null}"#).unwrap();
        assert_eq!(cleared.allergies, Some(None));

        let set: PatientReq = serde_json::from_str(r#"{"allergies": "peanuts"}"#).unwrap();
        assert_eq!(set.allergies, Some(Some("peanuts".into())));
    }

    #[test]
    fn consultation_fee_accepts_numbers_and_strings() {
        let from_str: DoctorReq = serde_json::from_str(r#"{"consultation_fee": "150.50"}"#).unwrap();
        let from_num: DoctorReq = serde_json::from_str(r#"{"consultation_fee": 150.5}"#).unwrap();
        assert_eq!(from_str.consultation_fee, from_num.consultation_fee);
    }
}
