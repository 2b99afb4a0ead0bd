//! Doctor directory.
//!
//! Active doctors are readable by every authenticated user; only the creating user may update or
//! delete one. Deactivated doctors disappear from the directory but remain editable by their
//! owner, who can reactivate them.

use crate::constants::{
    CITY_MAX_LEN, HOSPITAL_NAME_MAX_LEN, LICENSE_NUMBER_MAX_LEN, NAME_MAX_LEN, PHONE_MAX_LEN,
    QUALIFICATION_MAX_LEN, STATE_MAX_LEN,
};
use crate::db::unique_violation;
use crate::validation::{
    choice, email, fee, long_text, nullable_text, text, years, FieldErrors, Operation, Resolver,
};
use crate::{ClinicError, ClinicResult};
use api_shared::{DoctorFilters, DoctorReq, DoctorRes, DoctorSummaryRes};
use chrono::{DateTime, Utc};
use clinic_types::{Choice, Specialization};
use rust_decimal::Decimal;
use sqlx::{FromRow, SqlitePool};
use std::str::FromStr;

const DOCTOR_SELECT: &str = "SELECT d.id, d.first_name, d.last_name, d.email, d.phone,
        d.license_number, d.specialization, d.experience_years, d.qualification,
        d.hospital_name, d.hospital_address, d.city, d.state, d.consultation_fee,
        d.availability, d.bio, d.is_active, d.created_by, u.username AS owner, d.created_at,
        d.updated_at
    FROM doctors d JOIN users u ON u.id = d.created_by";

const EMAIL_TAKEN: &str = "A doctor with this email already exists.";
const LICENSE_TAKEN: &str = "A doctor with this license number already exists.";

#[derive(Clone, Debug, PartialEq)]
pub struct Doctor {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub license_number: String,
    pub specialization: Specialization,
    pub experience_years: u32,
    pub qualification: String,
    pub hospital_name: String,
    pub hospital_address: String,
    pub city: String,
    pub state: String,
    pub consultation_fee: Decimal,
    pub availability: String,
    pub bio: Option<String>,
    pub is_active: bool,
    pub created_by: i64,
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Doctor {
    pub fn full_name(&self) -> String {
        format!("Dr. {} {}", self.first_name, self.last_name)
    }

    pub fn to_res(&self) -> DoctorRes {
        DoctorRes {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            full_name: self.full_name(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            license_number: self.license_number.clone(),
            specialization: self.specialization,
            specialization_display: self.specialization.label().to_owned(),
            experience_years: self.experience_years,
            qualification: self.qualification.clone(),
            hospital_name: self.hospital_name.clone(),
            hospital_address: self.hospital_address.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            consultation_fee: self.consultation_fee,
            availability: self.availability.clone(),
            bio: self.bio.clone(),
            created_by: self.owner.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            is_active: self.is_active,
        }
    }

    pub fn to_summary(&self) -> DoctorSummaryRes {
        DoctorSummaryRes {
            id: self.id,
            full_name: self.full_name(),
            specialization: self.specialization,
            specialization_display: self.specialization.label().to_owned(),
            hospital_name: self.hospital_name.clone(),
            city: self.city.clone(),
            consultation_fee: self.consultation_fee,
            experience_years: self.experience_years,
            is_active: self.is_active,
        }
    }
}

#[derive(FromRow)]
struct DoctorRow {
    id: i64,
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    license_number: String,
    specialization: String,
    experience_years: i64,
    qualification: String,
    hospital_name: String,
    hospital_address: String,
    city: String,
    state: String,
    consultation_fee: String,
    availability: String,
    bio: Option<String>,
    is_active: bool,
    created_by: i64,
    owner: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DoctorRow> for Doctor {
    type Error = ClinicError;

    fn try_from(row: DoctorRow) -> ClinicResult<Self> {
        let specialization = row
            .specialization
            .parse::<Specialization>()
            .map_err(|e| ClinicError::corrupt("doctors.specialization", e))?;
        let experience_years = u32::try_from(row.experience_years)
            .map_err(|e| ClinicError::corrupt("doctors.experience_years", e))?;
        let consultation_fee = Decimal::from_str(&row.consultation_fee)
            .map_err(|e| ClinicError::corrupt("doctors.consultation_fee", e))?;

        Ok(Doctor {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            license_number: row.license_number,
            specialization,
            experience_years,
            qualification: row.qualification,
            hospital_name: row.hospital_name,
            hospital_address: row.hospital_address,
            city: row.city,
            state: row.state,
            consultation_fee,
            availability: row.availability,
            bio: row.bio,
            is_active: row.is_active,
            created_by: row.created_by,
            owner: row.owner,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

struct DoctorFields {
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    license_number: String,
    specialization: Specialization,
    experience_years: u32,
    qualification: String,
    hospital_name: String,
    hospital_address: String,
    city: String,
    state: String,
    consultation_fee: Decimal,
    availability: String,
    bio: Option<String>,
    is_active: bool,
}

/// Look up a doctor regardless of owner or activation.
pub(crate) async fn find_doctor(pool: &SqlitePool, id: i64) -> ClinicResult<Option<Doctor>> {
    sqlx::query_as::<_, DoctorRow>(&format!("{DOCTOR_SELECT} WHERE d.id = ?1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(Doctor::try_from)
        .transpose()
}

fn collect(rows: Vec<DoctorRow>) -> ClinicResult<Vec<Doctor>> {
    rows.into_iter().map(Doctor::try_from).collect()
}

/// Treat `?specialization=` the same as an absent filter.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Clone, Debug)]
pub struct DoctorService {
    pool: SqlitePool,
}

impl DoctorService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Active doctors, optionally narrowed by exact specialization and a case-insensitive city
    /// substring.
    pub async fn list(&self, filters: &DoctorFilters) -> ClinicResult<Vec<Doctor>> {
        let rows = sqlx::query_as::<_, DoctorRow>(&format!(
            "{DOCTOR_SELECT}
             WHERE d.is_active = 1
               AND (?1 IS NULL OR d.specialization = ?1)
               AND (?2 IS NULL OR instr(lower(d.city), lower(?2)) > 0)
             ORDER BY d.created_at DESC, d.id DESC"
        ))
        .bind(non_empty(&filters.specialization))
        .bind(non_empty(&filters.city))
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    /// Every doctor, active or not.
    pub async fn list_all(&self) -> ClinicResult<Vec<Doctor>> {
        let rows = sqlx::query_as::<_, DoctorRow>(&format!(
            "{DOCTOR_SELECT} ORDER BY d.created_at DESC, d.id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    /// # Errors
    ///
    /// - [`ClinicError::NotFound`] unless the doctor exists and is active.
    pub async fn get(&self, id: i64) -> ClinicResult<Doctor> {
        find_doctor(&self.pool, id)
            .await?
            .filter(|d| d.is_active)
            .ok_or(ClinicError::NotFound("doctor"))
    }

    /// A doctor created by `owner`, active or not.
    pub async fn get_owned(&self, owner: i64, id: i64) -> ClinicResult<Doctor> {
        find_doctor(&self.pool, id)
            .await?
            .filter(|d| d.created_by == owner)
            .ok_or(ClinicError::NotFound("doctor"))
    }

    /// New doctors are always active, whatever `req.is_active` says.
    pub async fn create(&self, owner: i64, req: DoctorReq) -> ClinicResult<Doctor> {
        let fields = self.resolve(Operation::Create, req).await?;
        let now = Utc::now();

        let inserted: Result<(i64,), sqlx::Error> = sqlx::query_as(
            "INSERT INTO doctors (first_name, last_name, email, phone, license_number,
                specialization, experience_years, qualification, hospital_name,
                hospital_address, city, state, consultation_fee, availability, bio, is_active,
                created_by, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                ?17, ?18, ?18)
             RETURNING id",
        )
        .bind(&fields.first_name)
        .bind(&fields.last_name)
        .bind(&fields.email)
        .bind(&fields.phone)
        .bind(&fields.license_number)
        .bind(fields.specialization.as_str())
        .bind(fields.experience_years)
        .bind(&fields.qualification)
        .bind(&fields.hospital_name)
        .bind(&fields.hospital_address)
        .bind(&fields.city)
        .bind(&fields.state)
        .bind(fields.consultation_fee.to_string())
        .bind(&fields.availability)
        .bind(&fields.bio)
        .bind(fields.is_active)
        .bind(owner)
        .bind(now)
        .fetch_one(&self.pool)
        .await;

        let (id,) = inserted.map_err(uniqueness_conflict)?;
        tracing::info!(doctor_id = id, owner, "doctor created");
        self.get_owned(owner, id).await
    }

    /// Partial update by the owner; may toggle `is_active`.
    pub async fn update(&self, owner: i64, id: i64, req: DoctorReq) -> ClinicResult<Doctor> {
        let current = self.get_owned(owner, id).await?;
        let fields = self.resolve(Operation::Update(&current), req).await?;

        let result = sqlx::query(
            "UPDATE doctors SET first_name = ?1, last_name = ?2, email = ?3, phone = ?4,
                license_number = ?5, specialization = ?6, experience_years = ?7,
                qualification = ?8, hospital_name = ?9, hospital_address = ?10, city = ?11,
                state = ?12, consultation_fee = ?13, availability = ?14, bio = ?15,
                is_active = ?16, updated_at = ?17
             WHERE id = ?18 AND created_by = ?19",
        )
        .bind(&fields.first_name)
        .bind(&fields.last_name)
        .bind(&fields.email)
        .bind(&fields.phone)
        .bind(&fields.license_number)
        .bind(fields.specialization.as_str())
        .bind(fields.experience_years)
        .bind(&fields.qualification)
        .bind(&fields.hospital_name)
        .bind(&fields.hospital_address)
        .bind(&fields.city)
        .bind(&fields.state)
        .bind(fields.consultation_fee.to_string())
        .bind(&fields.availability)
        .bind(&fields.bio)
        .bind(fields.is_active)
        .bind(Utc::now())
        .bind(id)
        .bind(owner)
        .execute(&self.pool)
        .await
        .map_err(uniqueness_conflict)?;

        if result.rows_affected() == 0 {
            return Err(ClinicError::NotFound("doctor"));
        }
        tracing::info!(doctor_id = id, owner, "doctor updated");
        self.get_owned(owner, id).await
    }

    /// Delete a doctor owned by `owner` together with its mappings.
    pub async fn delete(&self, owner: i64, id: i64) -> ClinicResult<Doctor> {
        let doctor = self.get_owned(owner, id).await?;
        let result = sqlx::query("DELETE FROM doctors WHERE id = ?1 AND created_by = ?2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ClinicError::NotFound("doctor"));
        }
        tracing::info!(doctor_id = id, owner, "doctor deleted");
        Ok(doctor)
    }

    /// Activation toggle for operators; not scoped to an owner.
    pub async fn set_active(&self, id: i64, active: bool) -> ClinicResult<Doctor> {
        let result = sqlx::query("UPDATE doctors SET is_active = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(active)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ClinicError::NotFound("doctor"));
        }

        tracing::info!(doctor_id = id, active, "doctor activation changed");
        find_doctor(&self.pool, id)
            .await?
            .ok_or(ClinicError::NotFound("doctor"))
    }

    pub fn specializations() -> Vec<Choice> {
        Choice::specializations()
    }

    async fn resolve(&self, op: Operation<'_, Doctor>, req: DoctorReq) -> ClinicResult<DoctorFields> {
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
        let license_number = r.required(
            "license_number",
            req.license_number,
            |c| c.license_number.clone(),
            text(LICENSE_NUMBER_MAX_LEN),
        );
        let specialization = r.required(
            "specialization",
            req.specialization,
            |c| c.specialization,
            choice::<Specialization>,
        );
        let experience_years = r.required(
            "experience_years",
            req.experience_years,
            |c| c.experience_years,
            years,
        );
        let qualification = r.required(
            "qualification",
            req.qualification,
            |c| c.qualification.clone(),
            text(QUALIFICATION_MAX_LEN),
        );
        let hospital_name = r.required(
            "hospital_name",
            req.hospital_name,
            |c| c.hospital_name.clone(),
            text(HOSPITAL_NAME_MAX_LEN),
        );
        let hospital_address = r.required(
            "hospital_address",
            req.hospital_address,
            |c| c.hospital_address.clone(),
            long_text,
        );
        let city = r.required("city", req.city, |c| c.city.clone(), text(CITY_MAX_LEN));
        let state = r.required("state", req.state, |c| c.state.clone(), text(STATE_MAX_LEN));
        let consultation_fee = r.required(
            "consultation_fee",
            req.consultation_fee,
            |c| c.consultation_fee,
            fee,
        );
        let availability = r.required(
            "availability",
            req.availability,
            |c| c.availability.clone(),
            long_text,
        );
        let bio = r.optional("bio", req.bio, |c| c.bio.clone(), nullable_text(None));
        let is_active = match exclude_id {
            None => true,
            Some(_) => r.optional("is_active", req.is_active, |c| c.is_active, Ok),
        };

        if !r.has_error("email") && self.taken("email", &email, exclude_id).await? {
            r.reject("email", EMAIL_TAKEN);
        }
        if !r.has_error("license_number")
            && self
                .taken("license_number", &license_number, exclude_id)
                .await?
        {
            r.reject("license_number", LICENSE_TAKEN);
        }

        Ok(r.finish(DoctorFields {
            first_name,
            last_name,
            email,
            phone,
            license_number,
            specialization,
            experience_years,
            qualification,
            hospital_name,
            hospital_address,
            city,
            state,
            consultation_fee,
            availability,
            bio,
            is_active,
        })?)
    }

    /// `column` is one of the two unique doctor columns, never user input.
    async fn taken(
        &self,
        column: &'static str,
        value: &str,
        exclude_id: Option<i64>,
    ) -> ClinicResult<bool> {
        let found: Option<(i64,)> = sqlx::query_as(&format!(
            "SELECT id FROM doctors WHERE {column} = ?1 AND id IS NOT ?2"
        ))
        .bind(value)
        .bind(exclude_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found.is_some())
    }
}

fn uniqueness_conflict(err: sqlx::Error) -> ClinicError {
    match unique_violation(&err) {
        Some(msg) if msg.contains("doctors.email") => {
            FieldErrors::single("email", EMAIL_TAKEN).into()
        }
        Some(msg) if msg.contains("doctors.license_number") => {
            FieldErrors::single("license_number", LICENSE_TAKEN).into()
        }
        _ => err.into(),
    }
}
