//! Clinical data retrieved for a launch and code extraction by path.
//!
//! Resources are kept as raw FHIR JSON grouped by resource type. Code paths
//! are dotted expressions rooted at a resource type, e.g. `Condition.code` or
//! `Observation.value`. Navigation flattens arrays, and a segment that names
//! a choice element (`value`) also matches its typed variants
//! (`valueCodeableConcept`, `valueCoding`).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{EcrError, EcrResult};
use crate::window::{TimeWindow, parse_fhir_date_time};

/// Elements checked, in order, for a resource's clinically relevant date.
const DATE_ELEMENTS: &[&str] = &[
    "onsetDateTime",
    "effectiveDateTime",
    "occurrenceDateTime",
    "recordedDate",
    "authoredOn",
    "issued",
    "dateAsserted",
    "date",
];

/// A coded value. Equality covers system and code; display is informational.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Code {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Code {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            system: None,
            code: code.into(),
            display: None,
        }
    }

    pub fn with_system(system: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            code: code.into(),
            display: None,
        }
    }

    /// Opaque token used for matching: `system|code`, or the bare code.
    pub fn token(&self) -> String {
        match &self.system {
            Some(system) => format!("{system}|{}", self.code),
            None => self.code.clone(),
        }
    }

    /// Reads a FHIR `Coding` object.
    fn from_coding(coding: &Value) -> Option<Self> {
        let code = coding.get("code")?.as_str()?.trim();
        if code.is_empty() {
            return None;
        }
        Some(Self {
            system: coding
                .get("system")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            code: code.to_string(),
            display: coding
                .get("display")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}

impl PartialEq for Code {
    fn eq(&self, other: &Self) -> bool {
        self.system == other.system && self.code == other.code
    }
}

impl Eq for Code {}

impl PartialOrd for Code {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Code {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (&self.system, &self.code).cmp(&(&other.system, &other.code))
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// Resources retrieved for one launch, grouped by resource type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClinicalData {
    resources: BTreeMap<String, Vec<Value>>,
}

impl ClinicalData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds clinical data from a FHIR `Bundle`.
    ///
    /// # Errors
    ///
    /// Returns `EcrError::RetrievalFailure` if the value is not a Bundle.
    pub fn from_bundle(bundle: &Value) -> EcrResult<Self> {
        let mut data = Self::new();
        data.extend_from_bundle(bundle)?;
        Ok(data)
    }

    /// Adds every entry resource of a FHIR `Bundle`.
    ///
    /// # Errors
    ///
    /// Returns `EcrError::RetrievalFailure` if the value is not a Bundle.
    pub fn extend_from_bundle(&mut self, bundle: &Value) -> EcrResult<usize> {
        if resource_type(bundle) != Some("Bundle") {
            return Err(EcrError::retrieval(format!(
                "expected a Bundle, found {}",
                resource_type(bundle).unwrap_or("a value without resourceType")
            )));
        }

        let mut added = 0;
        for entry in bundle
            .get("entry")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
        {
            if let Some(resource) = entry.get("resource") {
                if self.push(resource.clone()) {
                    added += 1;
                }
            }
        }
        Ok(added)
    }

    /// Adds one resource. Values without a `resourceType` are ignored.
    pub fn push(&mut self, resource: Value) -> bool {
        let Some(rt) = resource_type(&resource).map(str::to_string) else {
            return false;
        };
        self.resources.entry(rt).or_default().push(resource);
        true
    }

    /// Drops resources whose clinical date falls outside `window`.
    ///
    /// Resources without a recognizable date are kept.
    pub fn retain_within(&mut self, window: &TimeWindow) {
        for resources in self.resources.values_mut() {
            resources.retain(|r| primary_date(r).is_none_or(|d| window.contains(d)));
        }
        self.resources.retain(|_, resources| !resources.is_empty());
    }

    pub fn resources(&self, resource_type: &str) -> &[Value] {
        self.resources
            .get(resource_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.resources.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Extracts every code found at `path` across all matching resources.
    ///
    /// Unknown resource types, missing elements and malformed paths yield an
    /// empty set rather than an error.
    pub fn codes_for_path(&self, path: &str) -> BTreeSet<Code> {
        let mut segments = path.split('.').map(str::trim);
        let Some(root) = segments.next().filter(|s| !s.is_empty()) else {
            return BTreeSet::new();
        };
        let segments: Vec<&str> = segments.collect();
        if segments.iter().any(|s| s.is_empty()) {
            return BTreeSet::new();
        }

        let mut codes = BTreeSet::new();
        for resource in self.resources(root) {
            let mut current = vec![resource];
            for segment in &segments {
                current = current
                    .into_iter()
                    .flat_map(|value| navigate(value, segment))
                    .collect();
            }
            for value in current {
                collect_codes(value, &mut codes);
            }
        }
        codes
    }

    /// Token form of [`codes_for_path`](Self::codes_for_path).
    pub fn code_tokens_for_path(&self, path: &str) -> BTreeSet<String> {
        self.codes_for_path(path).iter().map(Code::token).collect()
    }
}

fn resource_type(value: &Value) -> Option<&str> {
    value.get("resourceType").and_then(Value::as_str)
}

/// Steps into `segment`, flattening arrays and resolving choice elements.
fn navigate<'a>(value: &'a Value, segment: &str) -> Vec<&'a Value> {
    let Some(object) = value.as_object() else {
        return Vec::new();
    };

    let found: Vec<&Value> = match object.get(segment) {
        Some(v) => vec![v],
        None => object
            .iter()
            .filter(|(key, _)| is_choice_variant(key, segment))
            .map(|(_, v)| v)
            .collect(),
    };

    found
        .into_iter()
        .flat_map(|v| match v {
            Value::Array(items) => items.iter().collect::<Vec<_>>(),
            other => vec![other],
        })
        .collect()
}

fn is_choice_variant(key: &str, segment: &str) -> bool {
    key.strip_prefix(segment)
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_uppercase())
}

/// Collects codes from a CodeableConcept, a Coding or a bare code string.
fn collect_codes(value: &Value, codes: &mut BTreeSet<Code>) {
    match value {
        Value::String(code) if !code.trim().is_empty() => {
            codes.insert(Code::new(code.trim()));
        }
        Value::Object(object) => {
            if let Some(codings) = object.get("coding").and_then(Value::as_array) {
                codes.extend(codings.iter().filter_map(Code::from_coding));
            } else if let Some(code) = Code::from_coding(value) {
                codes.insert(code);
            }
        }
        _ => {}
    }
}

/// Clinically relevant date of a resource, if one can be found.
pub fn primary_date(resource: &Value) -> Option<time::OffsetDateTime> {
    for element in DATE_ELEMENTS {
        if let Some(date) = resource
            .get(*element)
            .and_then(Value::as_str)
            .and_then(parse_fhir_date_time)
        {
            return Some(date);
        }
    }
    for element in ["period", "effectivePeriod", "onsetPeriod"] {
        if let Some(date) = resource
            .get(element)
            .and_then(|p| p.get("start"))
            .and_then(Value::as_str)
            .and_then(parse_fhir_date_time)
        {
            return Some(date);
        }
    }
    None
}
