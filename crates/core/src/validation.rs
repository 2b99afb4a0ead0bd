//! Input validation utilities.
//!
//! Create and update requests arrive as drafts in which every field is optional. A single
//! [`Resolver`] per entity turns a draft into the complete set of writable columns:
//!
//! - on [`Operation::Create`] a missing required field is an error and a missing optional field
//!   takes its default;
//! - on [`Operation::Update`] a missing field keeps the current value.
//!
//! Every present field is parsed and checked the same way in both cases. Errors are collected per
//! field rather than failing on the first one.

use crate::constants::{FEE_DECIMAL_PLACES, FEE_MAX_DIGITS, MAX_EXPERIENCE_YEARS};
use crate::{ClinicError, ClinicResult};
use chrono::NaiveDate;
use clinic_types::{EmailAddress, NonEmptyText};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Key under which errors that do not belong to a single field are reported.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";

/// What a draft is being resolved for.
pub enum Operation<'a, T> {
    Create,
    /// Partial update of an existing record.
    Update(&'a T),
}

/// Field-keyed validation messages, serialised as `{"field": ["message", ...]}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a single error on a single field.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn non_field(message: impl Into<String>) -> Self {
        Self::single(NON_FIELD_ERRORS, message)
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(())` when no errors were recorded.
    pub fn into_result(self) -> ClinicResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ClinicError::Validation(self))
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Resolves draft fields against an [`Operation`], collecting errors.
pub struct Resolver<'a, T> {
    op: Operation<'a, T>,
    errors: FieldErrors,
}

impl<'a, T> Resolver<'a, T> {
    pub fn new(op: Operation<'a, T>) -> Self {
        Self {
            op,
            errors: FieldErrors::new(),
        }
    }

    /// Resolve a field that must have a value after the operation.
    ///
    /// Returns `V::default()` when an error was recorded; the caller discards the result in that
    /// case because [`Resolver::finish`] fails.
    pub fn required<I, V: Default>(
        &mut self,
        field: &str,
        incoming: Option<I>,
        current: impl FnOnce(&T) -> V,
        parse: impl FnOnce(I) -> Result<V, String>,
    ) -> V {
        match (incoming, &self.op) {
            (Some(raw), _) => self.parsed(field, raw, parse),
            (None, Operation::Update(existing)) => current(existing),
            (None, Operation::Create) => {
                self.errors.add(field, REQUIRED);
                V::default()
            }
        }
    }

    /// Resolve a field that may be left out on create.
    pub fn optional<I, V: Default>(
        &mut self,
        field: &str,
        incoming: Option<I>,
        current: impl FnOnce(&T) -> V,
        parse: impl FnOnce(I) -> Result<V, String>,
    ) -> V {
        match (incoming, &self.op) {
            (Some(raw), _) => self.parsed(field, raw, parse),
            (None, Operation::Update(existing)) => current(existing),
            (None, Operation::Create) => V::default(),
        }
    }

    /// Record an error that is not produced by a single field parser.
    pub fn reject(&mut self, field: &str, message: impl Into<String>) {
        self.errors.add(field, message);
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.errors.has(field)
    }

    /// Hand back `value` if no error was recorded.
    pub fn finish<V>(self, value: V) -> Result<V, FieldErrors> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self.errors)
        }
    }

    fn parsed<I, V: Default>(
        &mut self,
        field: &str,
        raw: I,
        parse: impl FnOnce(I) -> Result<V, String>,
    ) -> V {
        match parse(raw) {
            Ok(value) => value,
            Err(message) => {
                self.errors.add(field, message);
                V::default()
            }
        }
    }
}

// ============================================================================
// FIELD PARSERS
// ============================================================================

fn too_long(max: usize) -> String {
    format!("Ensure this field has no more than {max} characters.")
}

/// Required, non-blank text of at most `max` characters (trimmed).
pub fn text(max: usize) -> impl FnOnce(String) -> Result<String, String> {
    move |raw| {
        let text = long_text(raw)?;
        if text.chars().count() > max {
            return Err(too_long(max));
        }
        Ok(text)
    }
}

/// Required, non-blank text without a length limit.
pub fn long_text(raw: String) -> Result<String, String> {
    NonEmptyText::new(raw)
        .map(NonEmptyText::into_inner)
        .map_err(|_| BLANK.to_string())
}

/// Nullable text that may also be blank, optionally bounded.
pub fn nullable_text(
    max: Option<usize>,
) -> impl FnOnce(Option<String>) -> Result<Option<String>, String> {
    move |raw| match raw {
        None => Ok(None),
        Some(value) => {
            let trimmed = value.trim();
            if let Some(max) = max {
                if trimmed.chars().count() > max {
                    return Err(too_long(max));
                }
            }
            Ok(Some(trimmed.to_owned()))
        }
    }
}

/// Text that may be blank but not null, bounded by `max`.
pub fn blank_text(max: usize) -> impl FnOnce(String) -> Result<String, String> {
    move |raw| {
        let trimmed = raw.trim();
        if trimmed.chars().count() > max {
            return Err(too_long(max));
        }
        Ok(trimmed.to_owned())
    }
}

/// Normalised email address, returned as its string form.
pub fn email(raw: String) -> Result<String, String> {
    if raw.trim().is_empty() {
        return Err(BLANK.into());
    }
    EmailAddress::parse(&raw)
        .map(|e| e.as_str().to_owned())
        .map_err(|e| e.to_string())
}

/// `YYYY-MM-DD` date.
pub fn date(raw: String) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.".to_string()
    })
}

/// One of a fixed vocabulary.
pub fn choice<C>(raw: String) -> Result<C, String>
where
    C: FromStr,
    C::Err: std::fmt::Display,
{
    raw.parse::<C>().map_err(|e| e.to_string())
}

/// Non-negative whole number of years.
pub fn years(raw: i64) -> Result<u32, String> {
    if raw < 0 {
        return Err("Ensure this value is greater than or equal to 0.".into());
    }
    if raw > MAX_EXPERIENCE_YEARS {
        return Err(format!(
            "Ensure this value is less than or equal to {MAX_EXPERIENCE_YEARS}."
        ));
    }
    u32::try_from(raw).map_err(|e| e.to_string())
}

/// Non-negative money amount, rescaled to [`FEE_DECIMAL_PLACES`].
pub fn fee(raw: Decimal) -> Result<Decimal, String> {
    if raw.is_sign_negative() && !raw.is_zero() {
        return Err("Ensure this value is greater than or equal to 0.".into());
    }

    let normalized = raw.normalize();
    if normalized.scale() > FEE_DECIMAL_PLACES {
        return Err(format!(
            "Ensure that there are no more than {FEE_DECIMAL_PLACES} decimal places."
        ));
    }

    let max_whole_digits = FEE_MAX_DIGITS - FEE_DECIMAL_PLACES;
    let whole = normalized.trunc();
    let whole_digits = if whole.is_zero() {
        0
    } else {
        whole.to_string().trim_start_matches('-').len() as u32
    };
    if whole_digits > max_whole_digits {
        return Err(format!(
            "Ensure that there are no more than {max_whole_digits} digits before the decimal point."
        ));
    }

    let mut value = normalized;
    value.rescale(FEE_DECIMAL_PLACES);
    Ok(value)
}
