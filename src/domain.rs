//! Attribute domains.
//!
//! Each domain carries its own vocabulary, synonym table and entity table.
//! Domains never share canonical values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One of the attribute categories in the dataset.
///
/// # Examples
///
/// ```
/// use pharmacanon::Domain;
///
/// let domain: Domain = "Effect".parse().unwrap();
/// assert_eq!(domain, Domain::Effect);
/// assert_eq!(domain.to_string(), "effect");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Domain {
    /// Pharmacological targets (receptors, channels, enzymes).
    Target,
    /// Adverse-effect names.
    Effect,
    /// Metabolism roles (inhibitor, inducer, substrate...).
    Role,
}

impl Domain {
    /// Every domain, in processing order.
    pub const ALL: [Self; 3] = [Self::Target, Self::Effect, Self::Role];

    /// The lowercase name used in configuration and storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Target => "target",
            Self::Effect => "effect",
            Self::Role => "role",
        }
    }
}

impl FromStr for Domain {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ValidationError::UnknownDomain {
                value: value.to_string(),
            })
    }
}

impl TryFrom<String> for Domain {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Domain> for String {
    fn from(value: Domain) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
