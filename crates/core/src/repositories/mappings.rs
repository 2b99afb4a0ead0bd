//! Assignment ledger linking patients to doctors.
//!
//! A mapping may only be created by the owner of its patient, only for an active doctor, and a
//! patient/doctor pair can hold at most one `active` mapping at a time. Inactive and completed
//! mappings for the same pair may accumulate freely. The partial unique index
//! `mappings_one_active_pair` backs the duplicate check when two requests race.

use crate::db::unique_violation;
use crate::repositories::doctors::{find_doctor, Doctor};
use crate::repositories::patients::{find_patient, Patient};
use crate::validation::{choice, nullable_text, FieldErrors, Operation, Resolver, REQUIRED};
use crate::{ClinicError, ClinicResult};
use api_shared::{MappingCreateReq, MappingRes, MappingUpdateReq};
use chrono::{DateTime, NaiveDate, Utc};
use clinic_types::{Choice, MappingStatus};
use sqlx::{FromRow, SqlitePool};

const MAPPING_SELECT: &str = "SELECT m.id, m.patient_id, m.doctor_id, m.assigned_date, m.status,
        m.notes, m.created_by, u.username AS owner, m.created_at, m.updated_at
    FROM mappings m JOIN users u ON u.id = m.created_by";

const NOT_YOUR_PATIENT: &str = "You can only assign doctors to your own patients.";
const INACTIVE_DOCTOR: &str = "Cannot assign an inactive doctor.";

#[derive(Clone, Debug, PartialEq)]
pub struct Mapping {
    pub id: i64,
    pub patient: Patient,
    pub doctor: Doctor,
    pub assigned_date: NaiveDate,
    pub status: MappingStatus,
    pub notes: Option<String>,
    pub created_by: i64,
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Mapping {
    pub fn to_res(&self) -> MappingRes {
        MappingRes {
            id: self.id,
            patient: self.patient.id,
            doctor: self.doctor.id,
            patient_details: self.patient.to_res(),
            doctor_details: self.doctor.to_summary(),
            assigned_date: self.assigned_date,
            status: self.status,
            status_display: self.status.label().to_owned(),
            notes: self.notes.clone(),
            created_by: self.owner.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct MappingRow {
    id: i64,
    patient_id: i64,
    doctor_id: i64,
    assigned_date: NaiveDate,
    status: String,
    notes: Option<String>,
    created_by: i64,
    owner: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn already_assigned(patient: &Patient, doctor: &Doctor) -> FieldErrors {
    FieldErrors::non_field(format!(
        "Patient {} is already actively assigned to {}",
        patient.full_name(),
        doctor.full_name()
    ))
}

fn does_not_exist(id: i64) -> String {
    format!("Invalid pk \"{id}\" - object does not exist.")
}

/// Status filter from a query string; blank means no filter.
fn status_filter(status: Option<&str>) -> Option<&str> {
    status.map(str::trim).filter(|s| !s.is_empty())
}

/// Fields an update may change.
struct MappingChanges {
    status: MappingStatus,
    notes: Option<String>,
}

#[derive(Clone, Debug)]
pub struct MappingService {
    pool: SqlitePool,
}

impl MappingService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Mappings created by `owner`, optionally with a given status.
    pub async fn list(&self, owner: i64, status: Option<&str>) -> ClinicResult<Vec<Mapping>> {
        let rows = sqlx::query_as::<_, MappingRow>(&format!(
            "{MAPPING_SELECT}
             WHERE m.created_by = ?1 AND (?2 IS NULL OR m.status = ?2)
             ORDER BY m.created_at DESC, m.id DESC"
        ))
        .bind(owner)
        .bind(status_filter(status))
        .fetch_all(&self.pool)
        .await?;
        self.hydrate_all(rows).await
    }

    /// The patient and its mappings created by `owner`.
    ///
    /// # Errors
    ///
    /// - [`ClinicError::NotFound`] unless `owner` created the patient.
    pub async fn list_for_patient(
        &self,
        owner: i64,
        patient_id: i64,
        status: Option<&str>,
    ) -> ClinicResult<(Patient, Vec<Mapping>)> {
        let patient = find_patient(&self.pool, patient_id)
            .await?
            .filter(|p| p.created_by == owner)
            .ok_or(ClinicError::NotFound("patient"))?;

        let rows = sqlx::query_as::<_, MappingRow>(&format!(
            "{MAPPING_SELECT}
             WHERE m.patient_id = ?1 AND m.created_by = ?2 AND (?3 IS NULL OR m.status = ?3)
             ORDER BY m.created_at DESC, m.id DESC"
        ))
        .bind(patient_id)
        .bind(owner)
        .bind(status_filter(status))
        .fetch_all(&self.pool)
        .await?;

        let mappings = self.hydrate_all(rows).await?;
        Ok((patient, mappings))
    }

    /// A mapping created by `owner`.
    pub async fn get_owned(&self, owner: i64, id: i64) -> ClinicResult<Mapping> {
        let row = sqlx::query_as::<_, MappingRow>(&format!(
            "{MAPPING_SELECT} WHERE m.id = ?1 AND m.created_by = ?2"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ClinicError::NotFound("mapping"))?;
        self.hydrate(row).await
    }

    /// Assign a doctor to one of the caller's patients.
    ///
    /// # Errors
    ///
    /// [`ClinicError::Validation`] when:
    /// - `patient` or `doctor` is missing or does not exist;
    /// - `status` is not a known status;
    /// - the patient belongs to another user;
    /// - the doctor is inactive;
    /// - the requested status is `active` and the pair already has an active mapping.
    pub async fn create(&self, owner: i64, req: MappingCreateReq) -> ClinicResult<Mapping> {
        let mut errors = FieldErrors::new();

        let patient = match req.patient {
            None => {
                errors.add("patient", REQUIRED);
                None
            }
            Some(id) => {
                let found = find_patient(&self.pool, id).await?;
                if found.is_none() {
                    errors.add("patient", does_not_exist(id));
                }
                found
            }
        };
        let doctor = match req.doctor {
            None => {
                errors.add("doctor", REQUIRED);
                None
            }
            Some(id) => {
                let found = find_doctor(&self.pool, id).await?;
                if found.is_none() {
                    errors.add("doctor", does_not_exist(id));
                }
                found
            }
        };
        let status = match req.status {
            None => MappingStatus::default(),
            Some(raw) => choice::<MappingStatus>(raw).unwrap_or_else(|message| {
                errors.add("status", message);
                MappingStatus::default()
            }),
        };
        let notes = req.notes.map(|n| n.trim().to_owned());

        let (Some(patient), Some(doctor)) = (patient, doctor) else {
            return Err(errors.into());
        };
        errors.into_result()?;

        if patient.created_by != owner {
            tracing::warn!(owner, patient_id = patient.id, "mapping for another user's patient");
            return Err(FieldErrors::non_field(NOT_YOUR_PATIENT).into());
        }
        if !doctor.is_active {
            return Err(FieldErrors::non_field(INACTIVE_DOCTOR).into());
        }
        if status == MappingStatus::Active
            && self.active_pair_exists(patient.id, doctor.id, None).await?
        {
            return Err(already_assigned(&patient, &doctor).into());
        }

        let now = Utc::now();
        let inserted: Result<(i64,), sqlx::Error> = sqlx::query_as(
            "INSERT INTO mappings (patient_id, doctor_id, assigned_date, status, notes,
                created_by, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
             RETURNING id",
        )
        .bind(patient.id)
        .bind(doctor.id)
        .bind(now.date_naive())
        .bind(status.as_str())
        .bind(&notes)
        .bind(owner)
        .bind(now)
        .fetch_one(&self.pool)
        .await;

        let (id,) = match inserted {
            Ok(row) => row,
            Err(err) if unique_violation(&err).is_some() => {
                return Err(already_assigned(&patient, &doctor).into())
            }
            Err(err) => return Err(err.into()),
        };

        tracing::info!(
            mapping_id = id,
            patient_id = patient.id,
            doctor_id = doctor.id,
            %status,
            "mapping created"
        );
        self.get_owned(owner, id).await
    }

    /// Change the status and/or notes of a mapping created by `owner`.
    ///
    /// Moving a mapping to `active` is refused while another active mapping exists for the same
    /// pair.
    pub async fn update(&self, owner: i64, id: i64, req: MappingUpdateReq) -> ClinicResult<Mapping> {
        let current = self.get_owned(owner, id).await?;

        let mut r = Resolver::new(Operation::Update(&current));
        let status = r.required("status", req.status, |c| c.status, choice::<MappingStatus>);
        let notes = r.optional("notes", req.notes, |c| c.notes.clone(), nullable_text(None));
        let changes = r.finish(MappingChanges { status, notes })?;

        if changes.status == MappingStatus::Active
            && self
                .active_pair_exists(current.patient.id, current.doctor.id, Some(id))
                .await?
        {
            return Err(already_assigned(&current.patient, &current.doctor).into());
        }

        let result = sqlx::query(
            "UPDATE mappings SET status = ?1, notes = ?2, updated_at = ?3
             WHERE id = ?4 AND created_by = ?5",
        )
        .bind(changes.status.as_str())
        .bind(&changes.notes)
        .bind(Utc::now())
        .bind(id)
        .bind(owner)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => return Err(ClinicError::NotFound("mapping")),
            Ok(_) => {}
            Err(err) if unique_violation(&err).is_some() => {
                return Err(already_assigned(&current.patient, &current.doctor).into())
            }
            Err(err) => return Err(err.into()),
        }

        tracing::info!(mapping_id = id, status = %changes.status, "mapping updated");
        self.get_owned(owner, id).await
    }

    /// Remove a mapping; returns it as it was.
    pub async fn delete(&self, owner: i64, id: i64) -> ClinicResult<Mapping> {
        let mapping = self.get_owned(owner, id).await?;
        let result = sqlx::query("DELETE FROM mappings WHERE id = ?1 AND created_by = ?2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ClinicError::NotFound("mapping"));
        }
        tracing::info!(mapping_id = id, owner, "mapping deleted");
        Ok(mapping)
    }

    pub fn status_choices() -> Vec<Choice> {
        Choice::mapping_statuses()
    }

    async fn active_pair_exists(
        &self,
        patient_id: i64,
        doctor_id: i64,
        exclude_id: Option<i64>,
    ) -> ClinicResult<bool> {
        let found: Option<(i64,)> = sqlx::query_as(
            "SELECT id FROM mappings
             WHERE patient_id = ?1 AND doctor_id = ?2 AND status = 'active' AND id IS NOT ?3",
        )
        .bind(patient_id)
        .bind(doctor_id)
        .bind(exclude_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found.is_some())
    }

    async fn hydrate_all(&self, rows: Vec<MappingRow>) -> ClinicResult<Vec<Mapping>> {
        let mut mappings = Vec::with_capacity(rows.len());
        for row in rows {
            mappings.push(self.hydrate(row).await?);
        }
        Ok(mappings)
    }

    async fn hydrate(&self, row: MappingRow) -> ClinicResult<Mapping> {
        let status = row
            .status
            .parse::<MappingStatus>()
            .map_err(|e| ClinicError::corrupt("mappings.status", e))?;
        let patient = find_patient(&self.pool, row.patient_id)
            .await?
            .ok_or_else(|| ClinicError::corrupt("mappings.patient_id", row.patient_id))?;
        let doctor = find_doctor(&self.pool, row.doctor_id)
            .await?
            .ok_or_else(|| ClinicError::corrupt("mappings.doctor_id", row.doctor_id))?;

        Ok(Mapping {
            id: row.id,
            patient,
            doctor,
            assigned_date: row.assigned_date,
            status,
            notes: row.notes,
            created_by: row.created_by,
            owner: row.owner,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
