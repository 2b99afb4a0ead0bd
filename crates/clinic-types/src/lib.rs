//! # Clinic Types
//!
//! Validated primitives and fixed vocabularies shared by every clinic crate.
//!
//! - [`NonEmptyText`]: trimmed text that is guaranteed to contain something
//! - [`EmailAddress`]: a lightly validated, lowercase-domain email address
//! - [`Gender`], [`Specialization`], [`MappingStatus`]: the enums stored in the database and
//!   exchanged on the wire, each with a human-readable label

mod choices;

pub use choices::{Choice, Gender, MappingStatus, Specialization, UnknownChoice};

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Errors produced when parsing an [`EmailAddress`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("Enter a valid email address.")]
    Invalid,
    #[error("Ensure this field has no more than {max} characters.")]
    TooLong { max: usize },
}

/// An email address with a single `@`, a non-empty local part and a dotted domain.
///
/// The domain part is lowercased on construction; the local part is kept as given.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Maximum length accepted for any stored email address.
    pub const MAX_LEN: usize = 254;

    pub fn parse(input: &str) -> Result<Self, EmailError> {
        let trimmed = input.trim();
        if trimmed.len() > Self::MAX_LEN {
            return Err(EmailError::TooLong { max: Self::MAX_LEN });
        }

        let (local, domain) = trimmed.split_once('@').ok_or(EmailError::Invalid)?;
        if local.is_empty() || domain.contains('@') || trimmed.chars().any(char::is_whitespace) {
            return Err(EmailError::Invalid);
        }

        let labels_ok = domain
            .split('.')
            .all(|label| !label.is_empty() && !label.starts_with('-') && !label.ends_with('-'));
        if !domain.contains('.') || !labels_ok {
            return Err(EmailError::Invalid);
        }

        Ok(Self(format!("{local}@{}", domain.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_text_trims_and_rejects_blank() {
        assert_eq!(NonEmptyText::new("  Jo ").unwrap().into_inner(), "Jo");
        assert!(matches!(NonEmptyText::new("   "), Err(TextError::Empty)));
    }

    #[test]
    fn email_lowercases_domain_only() {
        let email = EmailAddress::parse("Jo.Doe@Example.COM").expect("valid email");
        assert_eq!(email.as_str(), "Jo.Doe@example.com");
    }

    #[test]
    fn email_rejects_malformed_input() {
        for bad in ["", "jo", "jo@", "@x.com", "jo@x", "jo@@x.com", "jo doe@x.com", "jo@-x.com"] {
            assert_eq!(EmailAddress::parse(bad), Err(EmailError::Invalid), "{bad}");
        }
    }

    #[test]
    fn email_enforces_maximum_length() {
        let long = format!("{}@x.com", "a".repeat(EmailAddress::MAX_LEN));
        assert_eq!(
            EmailAddress::parse(&long),
            Err(EmailError::TooLong {
                max: EmailAddress::MAX_LEN
            })
        );
    }
}
