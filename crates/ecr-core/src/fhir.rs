use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EcrError;

/// FHIR version tag carried by a launch context.
///
/// Decoding is lenient: tags are matched case-insensitively and anything
/// unrecognised decodes as DSTU2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum FhirVersion {
    #[default]
    #[serde(rename = "DSTU2")]
    Dstu2,
    #[serde(rename = "DSTU2_1")]
    Dstu2_1,
    #[serde(rename = "DSTU3")]
    Dstu3,
    #[serde(rename = "R4")]
    R4,
}

impl FhirVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            FhirVersion::Dstu2 => "DSTU2",
            FhirVersion::Dstu2_1 => "DSTU2_1",
            FhirVersion::Dstu3 => "DSTU3",
            FhirVersion::R4 => "R4",
        }
    }

    /// Parses a version tag, falling back to DSTU2 for anything unrecognised.
    pub fn from_tag(tag: &str) -> Self {
        tag.parse().unwrap_or_default()
    }

    /// JSON media type the server expects for this version.
    pub fn media_type(&self) -> &'static str {
        match self {
            FhirVersion::Dstu2 | FhirVersion::Dstu2_1 => "application/json+fhir",
            FhirVersion::Dstu3 | FhirVersion::R4 => "application/fhir+json",
        }
    }
}

impl From<String> for FhirVersion {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl fmt::Display for FhirVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FhirVersion {
    type Err = EcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DSTU2" | "1.0.2" => Ok(FhirVersion::Dstu2),
            "DSTU2_1" | "1.4.0" => Ok(FhirVersion::Dstu2_1),
            "DSTU3" | "STU3" | "3.0.2" => Ok(FhirVersion::Dstu3),
            "R4" | "4.0.1" => Ok(FhirVersion::R4),
            _ => Err(EcrError::precondition(format!("Unknown FHIR version: {s}"))),
        }
    }
}
