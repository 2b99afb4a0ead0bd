//! Patient registry.
//!
//! Patients are private to the user who created them: every read and write is scoped by
//! `created_by`, and a patient owned by someone else is reported as not found. Emails are unique
//! across all patients, not just within one owner.

use crate::constants::{
    BLOOD_GROUP_MAX_LEN, CITY_MAX_LEN, NAME_MAX_LEN, PHONE_MAX_LEN, STATE_MAX_LEN,
    ZIP_CODE_MAX_LEN,
};
use crate::db::unique_violation;
use crate::validation::{
    choice, date, email, long_text, nullable_text, text, FieldErrors, Operation, Resolver,
};
use crate::{ClinicError, ClinicResult};
use api_shared::{PatientReq, PatientRes};
use chrono::{DateTime, NaiveDate, Utc};
use clinic_types::Gender;
use sqlx::{FromRow, SqlitePool};

const PATIENT_SELECT: &str = "SELECT p.id, p.first_name, p.last_name, p.email, p.phone,
        p.date_of_birth, p.gender, p.address, p.city, p.state, p.zip_code, p.blood_group,
        p.allergies, p.medical_history, p.created_by, u.username AS owner, p.created_at,
        p.updated_at
    FROM patients p JOIN users u ON u.id = p.created_by";

const EMAIL_TAKEN: &str = "A patient with this email already exists.";

#[derive(Clone, Debug, PartialEq)]
pub struct Patient {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
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
    pub created_by: i64,
    /// Username of `created_by`.
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn to_res(&self) -> PatientRes {
        PatientRes {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            full_name: self.full_name(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            date_of_birth: self.date_of_birth,
            gender: self.gender,
            address: self.address.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            zip_code: self.zip_code.clone(),
            blood_group: self.blood_group.clone(),
            allergies: self.allergies.clone(),
            medical_history: self.medical_history.clone(),
            created_by: self.owner.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct PatientRow {
    id: i64,
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    date_of_birth: NaiveDate,
    gender: String,
    address: String,
    city: String,
    state: String,
    zip_code: String,
    blood_group: Option<String>,
    allergies: Option<String>,
    medical_history: Option<String>,
    created_by: i64,
    owner: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PatientRow> for Patient {
    type Error = ClinicError;

    fn try_from(row: PatientRow) -> ClinicResult<Self> {
        let gender = row
            .gender
            .parse::<Gender>()
            .map_err(|e| ClinicError::corrupt("patients.gender", e))?;
        Ok(Patient {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            date_of_birth: row.date_of_birth,
            gender,
            address: row.address,
            city: row.city,
            state: row.state,
            zip_code: row.zip_code,
            blood_group: row.blood_group,
            allergies: row.allergies,
            medical_history: row.medical_history,
            created_by: row.created_by,
            owner: row.owner,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Every writable column, after validation.
struct PatientFields {
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    date_of_birth: NaiveDate,
    gender: Gender,
    address: String,
    city: String,
    state: String,
    zip_code: String,
    blood_group: Option<String>,
    allergies: Option<String>,
    medical_history: Option<String>,
}

/// Look up a patient regardless of owner.
pub(crate) async fn find_patient(pool: &SqlitePool, id: i64) -> ClinicResult<Option<Patient>> {
    sqlx::query_as::<_, PatientRow>(&format!("{PATIENT_SELECT} WHERE p.id = ?1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(Patient::try_from)
        .transpose()
}

#[derive(Clone, Debug)]
pub struct PatientService {
    pool: SqlitePool,
}

impl PatientService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Every patient owned by `owner`, newest first.
    pub async fn list(&self, owner: i64) -> ClinicResult<Vec<Patient>> {
        sqlx::query_as::<_, PatientRow>(&format!(
            "{PATIENT_SELECT} WHERE p.created_by = ?1 ORDER BY p.created_at DESC, p.id DESC"
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Patient::try_from)
        .collect()
    }

    /// # Errors
    ///
    /// - [`ClinicError::NotFound`] unless `owner` created the patient.
    pub async fn get(&self, owner: i64, id: i64) -> ClinicResult<Patient> {
        sqlx::query_as::<_, PatientRow>(&format!(
            "{PATIENT_SELECT} WHERE p.id = ?1 AND p.created_by = ?2"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?
        .map(Patient::try_from)
        .transpose()?
        .ok_or(ClinicError::NotFound("patient"))
    }

    pub async fn create(&self, owner: i64, req: PatientReq) -> ClinicResult<Patient> {
        let fields = self.resolve(Operation::Create, req).await?;
        let now = Utc::now();

        let inserted: Result<(i64,), sqlx::Error> = sqlx::query_as(
            "INSERT INTO patients (first_name, last_name, email, phone, date_of_birth, gender,
                address, city, state, zip_code, blood_group, allergies, medical_history,
                created_by, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)
             RETURNING id",
        )
        .bind(&fields.first_name)
        .bind(&fields.last_name)
        .bind(&fields.email)
        .bind(&fields.phone)
        .bind(fields.date_of_birth)
        .bind(fields.gender.as_str())
        .bind(&fields.address)
        .bind(&fields.city)
        .bind(&fields.state)
        .bind(&fields.zip_code)
        .bind(&fields.blood_group)
        .bind(&fields.allergies)
        .bind(&fields.medical_history)
        .bind(owner)
        .bind(now)
        .fetch_one(&self.pool)
        .await;

        let (id,) = inserted.map_err(email_conflict)?;
        tracing::info!(patient_id = id, owner, "patient created");
        self.get(owner, id).await
    }

    /// Partial update: fields absent from `req` keep their current values.
    pub async fn update(&self, owner: i64, id: i64, req: PatientReq) -> ClinicResult<Patient> {
        let current = self.get(owner, id).await?;
        let fields = self.resolve(Operation::Update(&current), req).await?;

        let result = sqlx::query(
            "UPDATE patients SET first_name = ?1, last_name = ?2, email = ?3, phone = ?4,
                date_of_birth = ?5, gender = ?6, address = ?7, city = ?8, state = ?9,
                zip_code = ?10, blood_group = ?11, allergies = ?12, medical_history = ?13,
                updated_at = ?14
             WHERE id = ?15 AND created_by = ?16",
        )
        .bind(&fields.first_name)
        .bind(&fields.last_name)
        .bind(&fields.email)
        .bind(&fields.phone)
        .bind(fields.date_of_birth)
        .bind(fields.gender.as_str())
        .bind(&fields.address)
        .bind(&fields.city)
        .bind(&fields.state)
        .bind(&fields.zip_code)
        .bind(&fields.blood_group)
        .bind(&fields.allergies)
        .bind(&fields.medical_history)
        .bind(Utc::now())
        .bind(id)
        .bind(owner)
        .execute(&self.pool)
        .await
        .map_err(email_conflict)?;

        if result.rows_affected() == 0 {
            return Err(ClinicError::NotFound("patient"));
        }
        tracing::info!(patient_id = id, owner, "patient updated");
        self.get(owner, id).await
    }

    /// Delete a patient and, through the foreign key, its mappings.
    ///
    /// Returns the record as it was before deletion.
    pub async fn delete(&self, owner: i64, id: i64) -> ClinicResult<Patient> {
        let patient = self.get(owner, id).await?;
        let result = sqlx::query("DELETE FROM patients WHERE id = ?1 AND created_by = ?2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ClinicError::NotFound("patient"));
        }
        tracing::info!(patient_id = id, owner, "patient deleted");
        Ok(patient)
    }

    async fn resolve(
        &self,
        op: Operation<'_, Patient>,
        req: PatientReq,
    ) -> ClinicResult<PatientFields> {
        let exclude_id = match &op {
            Operation::Create => None,
            Operation::Update(current) => Some(current.id),
        };
        let mut r = Resolver::new(op);

        let first_name = r.required(
            "first_name",
            req.first_name,
            |c| c.first_name.clone(),
            text(NAME_MAX_LEN),
        );
        let last_name = r.required(
            "last_name",
            req.last_name,
            |c| c.last_name.clone(),
            text(NAME_MAX_LEN),
        );
        let email = r.required("email", req.email, |c| c.email.clone(), email);
        let phone = r.required("phone", req.phone, |c| c.phone.clone(), text(PHONE_MAX_LEN));
        let date_of_birth = r.required(
            "date_of_birth",
            req.date_of_birth,
            |c| c.date_of_birth,
            date,
        );
        let gender = r.required("gender", req.gender, |c| c.gender, choice::<Gender>);
        let address = r.required("address", req.address, |c| c.address.clone(), long_text);
        let city = r.required("city", req.city, |c| c.city.clone(), text(CITY_MAX_LEN));
        let state = r.required("state", req.state, |c| c.state.clone(), text(STATE_MAX_LEN));
        let zip_code = r.required(
            "zip_code",
            req.zip_code,
            |c| c.zip_code.clone(),
            text(ZIP_CODE_MAX_LEN),
        );
        let blood_group = r.optional(
            "blood_group",
            req.blood_group,
            |c| c.blood_group.clone(),
            nullable_text(Some(BLOOD_GROUP_MAX_LEN)),
        );
        let allergies = r.optional(
            "allergies",
            req.allergies,
            |c| c.allergies.clone(),
            nullable_text(None),
        );
        let medical_history = r.optional(
            "medical_history",
            req.medical_history,
            |c| c.medical_history.clone(),
            nullable_text(None),
        );

        if !r.has_error("email") && self.email_taken(&email, exclude_id).await? {
            r.reject("email", EMAIL_TAKEN);
        }

        Ok(r.finish(PatientFields {
            first_name,
            last_name,
            email,
            phone,
            date_of_birth,
            gender,
            address,
            city,
            state,
            zip_code,
            blood_group,
            allergies,
            medical_history,
        })?)
    }

    async fn email_taken(&self, email: &str, exclude_id: Option<i64>) -> ClinicResult<bool> {
        let found: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM patients WHERE email = ?1 AND id IS NOT ?2")
                .bind(email)
                .bind(exclude_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }
}

fn email_conflict(err: sqlx::Error) -> ClinicError {
    match unique_violation(&err) {
        Some(msg) if msg.contains("patients.email") => {
            FieldErrors::single("email", EMAIL_TAKEN).into()
        }
        _ => err.into(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::connect_in_memory;
    use crate::repositories::users::tests::register;

    pub(crate) fn jo() -> PatientReq {
        PatientReq {
            first_name: Some("Jo".into()),
            last_name: Some("Doe".into()),
            email: Some("jo@x.com".into()),
            phone: Some("0123456789".into()),
            date_of_birth: Some("1990-01-01".into()),
            gender: Some("F".into()),
            address: Some("1 High Street".into()),
            city: Some("Leeds".into()),
            state: Some("West Yorkshire".into()),
            zip_code: Some("LS1 1AA".into()),
            ..PatientReq::default()
        }
    }

    #[tokio::test]
    async fn create_and_read_back() {
        let pool = connect_in_memory().await.unwrap();
        let alice = register(&pool, "alice").await;
        let service = PatientService::new(pool);

        let patient = service.create(alice.id, jo()).await.expect("valid patient");
        assert_eq!(patient.full_name(), "Jo Doe");
        assert_eq!(patient.gender, Gender::Female);
        assert_eq!(patient.owner, "alice");
        assert_eq!(patient.blood_group, None);

        let res = patient.to_res();
        assert_eq!(res.created_by, "alice");
        assert_eq!(res.full_name, "Jo Doe");
        assert_eq!(service.get(alice.id, patient.id).await.unwrap(), patient);
        assert_eq!(service.list(alice.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn other_owners_see_nothing() {
        let pool = connect_in_memory().await.unwrap();
        let alice = register(&pool, "alice").await;
        let bob = register(&pool, "bob").await;
        let service = PatientService::new(pool);
        let patient = service.create(alice.id, jo()).await.unwrap();

        assert!(service.list(bob.id).await.unwrap().is_empty());
        assert!(matches!(
            service.get(bob.id, patient.id).await,
            Err(ClinicError::NotFound("patient"))
        ));
        assert!(matches!(
            service.update(bob.id, patient.id, PatientReq::default()).await,
            Err(ClinicError::NotFound("patient"))
        ));
        assert!(matches!(
            service.delete(bob.id, patient.id).await,
            Err(ClinicError::NotFound("patient"))
        ));
        assert!(service.get(alice.id, patient.id).await.is_ok());
    }

    #[tokio::test]
    async fn email_is_unique_across_owners() {
        let pool = connect_in_memory().await.unwrap();
        let alice = register(&pool, "alice").await;
        let bob = register(&pool, "bob").await;
        let service = PatientService::new(pool);
        service.create(alice.id, jo()).await.unwrap();

        let err = service.create(bob.id, jo()).await.unwrap_err();
        assert_eq!(
            err.field_errors().unwrap().get("email"),
            Some(&[EMAIL_TAKEN.to_string()][..])
        );
    }

    #[tokio::test]
    async fn create_collects_field_errors() {
        let pool = connect_in_memory().await.unwrap();
        let alice = register(&pool, "alice").await;
        let service = PatientService::new(pool);

        let req = PatientReq {
            gender: Some("X".into()),
            date_of_birth: Some("01/01/1990".into()),
            zip_code: Some("12345678901".into()),
            first_name: None,
            ..jo()
        };
        let err = service.create(alice.id, req).await.unwrap_err();
        let errors = err.field_errors().unwrap();
        for field in ["gender", "date_of_birth", "zip_code", "first_name"] {
            assert!(errors.has(field), "expected an error for {field}");
        }
        assert!(!errors.has("email"));
    }

    #[tokio::test]
    async fn partial_update_keeps_other_fields_and_own_email() {
        let pool = connect_in_memory().await.unwrap();
        let alice = register(&pool, "alice").await;
        let service = PatientService::new(pool);
        let patient = service.create(alice.id, jo()).await.unwrap();

        let req = PatientReq {
            city: Some("York".into()),
            email: Some("jo@x.com".into()),
            allergies: Some(Some("penicillin".into())),
            ..PatientReq::default()
        };
        let updated = service.update(alice.id, patient.id, req).await.unwrap();
        assert_eq!(updated.city, "York");
        assert_eq!(updated.first_name, "Jo");
        assert_eq!(updated.allergies.as_deref(), Some("penicillin"));
        assert_eq!(updated.created_at, patient.created_at);
        assert!(updated.updated_at >= patient.updated_at);

        let cleared = service
            .update(
                alice.id,
                patient.id,
                PatientReq {
                    allergies: Some(None),
                    ..PatientReq::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.allergies, None);
    }

    #[tokio::test]
    async fn update_rejects_another_patients_email() {
        let pool = connect_in_memory().await.unwrap();
        let alice = register(&pool, "alice").await;
        let service = PatientService::new(pool);
        service.create(alice.id, jo()).await.unwrap();
        let other = service
            .create(
                alice.id,
                PatientReq {
                    email: Some("sam@x.com".into()),
                    ..jo()
                },
            )
            .await
            .unwrap();

        let err = service
            .update(
                alice.id,
                other.id,
                PatientReq {
                    email: Some("jo@x.com".into()),
                    ..PatientReq::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err.field_errors().unwrap().has("email"));
    }

    #[tokio::test]
    async fn list_is_newest_first_and_delete_removes() {
        let pool = connect_in_memory().await.unwrap();
        let alice = register(&pool, "alice").await;
        let service = PatientService::new(pool);
        let first = service.create(alice.id, jo()).await.unwrap();
        let second = service
            .create(
                alice.id,
                PatientReq {
                    email: Some("sam@x.com".into()),
                    ..jo()
                },
            )
            .await
            .unwrap();

        let ids: Vec<i64> = service
            .list(alice.id)
            .await
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);

        let deleted = service.delete(alice.id, first.id).await.unwrap();
        assert_eq!(deleted.full_name(), "Jo Doe");
        assert!(matches!(
            service.get(alice.id, first.id).await,
            Err(ClinicError::NotFound(_))
        ));
    }
}
