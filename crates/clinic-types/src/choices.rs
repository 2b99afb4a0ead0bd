//! Fixed vocabularies.
//!
//! Each enum is stored in the database by its wire value (`as_str`) and listed to clients as
//! `(value, label)` pairs through [`Choice`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// A `(value, label)` pair as returned by the enum listing endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

/// Returned when a stored or submitted value is not part of a vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("\"{value}\" is not a valid choice.")]
pub struct UnknownChoice {
    pub value: String,
}

impl UnknownChoice {
    fn new(value: &str) -> Self {
        Self {
            value: value.to_owned(),
        }
    }
}

/// Patient gender, exchanged as a single-letter code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[default]
    #[serde(rename = "O")]
    Other,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Other];

    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
            Gender::Other => "O",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }
}

impl FromStr for Gender {
    type Err = UnknownChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Gender::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| UnknownChoice::new(s))
    }
}

/// Medical specialization of a doctor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Specialization {
    Cardiology,
    Dermatology,
    Endocrinology,
    Gastroenterology,
    GeneralMedicine,
    Neurology,
    Oncology,
    Orthopedics,
    Pediatrics,
    Psychiatry,
    Radiology,
    Surgery,
    Urology,
    #[default]
    Other,
}

impl Specialization {
    pub const ALL: [Specialization; 14] = [
        Specialization::Cardiology,
        Specialization::Dermatology,
        Specialization::Endocrinology,
        Specialization::Gastroenterology,
        Specialization::GeneralMedicine,
        Specialization::Neurology,
        Specialization::Oncology,
        Specialization::Orthopedics,
        Specialization::Pediatrics,
        Specialization::Psychiatry,
        Specialization::Radiology,
        Specialization::Surgery,
        Specialization::Urology,
        Specialization::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Specialization::Cardiology => "cardiology",
            Specialization::Dermatology => "dermatology",
            Specialization::Endocrinology => "endocrinology",
            Specialization::Gastroenterology => "gastroenterology",
            Specialization::GeneralMedicine => "general_medicine",
            Specialization::Neurology => "neurology",
            Specialization::Oncology => "oncology",
            Specialization::Orthopedics => "orthopedics",
            Specialization::Pediatrics => "pediatrics",
            Specialization::Psychiatry => "psychiatry",
            Specialization::Radiology => "radiology",
            Specialization::Surgery => "surgery",
            Specialization::Urology => "urology",
            Specialization::Other => "other",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Specialization::Cardiology => "Cardiology",
            Specialization::Dermatology => "Dermatology",
            Specialization::Endocrinology => "Endocrinology",
            Specialization::Gastroenterology => "Gastroenterology",
            Specialization::GeneralMedicine => "General Medicine",
            Specialization::Neurology => "Neurology",
            Specialization::Oncology => "Oncology",
            Specialization::Orthopedics => "Orthopedics",
            Specialization::Pediatrics => "Pediatrics",
            Specialization::Psychiatry => "Psychiatry",
            Specialization::Radiology => "Radiology",
            Specialization::Surgery => "Surgery",
            Specialization::Urology => "Urology",
            Specialization::Other => "Other",
        }
    }
}

impl FromStr for Specialization {
    type Err = UnknownChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Specialization::ALL
            .into_iter()
            .find(|sp| sp.as_str() == s)
            .ok_or_else(|| UnknownChoice::new(s))
    }
}

/// Lifecycle of a patient-doctor assignment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MappingStatus {
    #[default]
    Active,
    Inactive,
    Completed,
}

impl MappingStatus {
    pub const ALL: [MappingStatus; 3] = [
        MappingStatus::Active,
        MappingStatus::Inactive,
        MappingStatus::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MappingStatus::Active => "active",
            MappingStatus::Inactive => "inactive",
            MappingStatus::Completed => "completed",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MappingStatus::Active => "Active",
            MappingStatus::Inactive => "Inactive",
            MappingStatus::Completed => "Completed",
        }
    }
}

impl FromStr for MappingStatus {
    type Err = UnknownChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MappingStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| UnknownChoice::new(s))
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Specialization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for MappingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Choice {
    fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_owned(),
            label: label.to_owned(),
        }
    }

    pub fn genders() -> Vec<Choice> {
        Gender::ALL
            .iter()
            .map(|g| Choice::new(g.as_str(), g.label()))
            .collect()
    }

    pub fn specializations() -> Vec<Choice> {
        Specialization::ALL
            .iter()
            .map(|s| Choice::new(s.as_str(), s.label()))
            .collect()
    }

    pub fn mapping_statuses() -> Vec<Choice> {
        MappingStatus::ALL
            .iter()
            .map(|s| Choice::new(s.as_str(), s.label()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_values_match_stored_values() {
        for sp in Specialization::ALL {
            let json = serde_json::to_string(&sp).unwrap();
            assert_eq!(json, format!("\"{}\"", sp.as_str()));
        }
        for g in Gender::ALL {
            let json = serde_json::to_string(&g).unwrap();
            assert_eq!(json, format!("\"{}\"", g.as_str()));
        }
        for st in MappingStatus::ALL {
            let json = serde_json::to_string(&st).unwrap();
            assert_eq!(json, format!("\"{}\"", st.as_str()));
        }
    }

    #[test]
    fn specialization_listing_has_fourteen_labelled_entries() {
        let choices = Choice::specializations();
        assert_eq!(choices.len(), 14);
        assert_eq!(
            choices[4],
            Choice {
                value: "general_medicine".into(),
                label: "General Medicine".into()
            }
        );
    }

    #[test]
    fn from_str_rejects_unknown_values() {
        assert_eq!("F".parse::<Gender>(), Ok(Gender::Female));
        assert_eq!("completed".parse::<MappingStatus>(), Ok(MappingStatus::Completed));
        let err = "dentistry".parse::<Specialization>().unwrap_err();
        assert_eq!(err.to_string(), "\"dentistry\" is not a valid choice.");
    }
}
