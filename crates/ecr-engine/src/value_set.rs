//! Reportable-condition value sets.
//!
//! A [`StaticValueSetProvider`] holds one value set in memory and hands out
//! snapshots. It can be built from explicit codes or from a FHIR `ValueSet`
//! resource (`expansion.contains` and `compose.include.concept`), and replaced
//! atomically while evaluations are in flight.

use arc_swap::ArcSwap;
use ecr_core::{EcrError, EcrResult};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use crate::services::ValueSetProvider;

/// OID of the COVID-19 trigger-code value set used by default.
pub const DEFAULT_VALUE_SET_ID: &str = "2.16.840.1.113762.1.4.1146.1123";

/// Version recorded with matches against the default value set.
pub const DEFAULT_VALUE_SET_VERSION: &str = "1";

/// Reference codes with their provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceValueSet {
    pub id: String,
    pub version: String,
    pub codes: BTreeSet<String>,
}

impl ReferenceValueSet {
    pub fn new<I, S>(id: impl Into<String>, version: impl Into<String>, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            version: version.into(),
            codes: codes.into_iter().map(Into::into).collect(),
        }
    }

    /// Reads codes from a FHIR `ValueSet` resource.
    ///
    /// `id` and `version` default to the resource's own `id` and `version`
    /// when `None`. Codes are tokenized as `system|code`, or the bare code if
    /// no system is given.
    ///
    /// # Errors
    ///
    /// Returns `EcrError::Configuration` if the value is not a ValueSet or
    /// carries no identifier.
    pub fn from_fhir(
        value_set: &Value,
        id: Option<&str>,
        version: Option<&str>,
    ) -> EcrResult<Self> {
        if value_set.get("resourceType").and_then(Value::as_str) != Some("ValueSet") {
            return Err(EcrError::configuration("expected a FHIR ValueSet resource"));
        }

        let id = id
            .or_else(|| value_set.get("id").and_then(Value::as_str))
            .ok_or_else(|| EcrError::configuration("value set has no id"))?;
        let version = version
            .or_else(|| value_set.get("version").and_then(Value::as_str))
            .unwrap_or(DEFAULT_VALUE_SET_VERSION);

        let mut codes = BTreeSet::new();

        if let Some(contains) = value_set
            .get("expansion")
            .and_then(|e| e.get("contains"))
            .and_then(Value::as_array)
        {
            collect_expansion(contains, &mut codes);
        }

        for include in value_set
            .get("compose")
            .and_then(|c| c.get("include"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
        {
            let system = include.get("system").and_then(Value::as_str);
            for concept in include
                .get("concept")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default()
            {
                if let Some(code) = concept.get("code").and_then(Value::as_str) {
                    codes.insert(token(system, code));
                }
            }
        }

        Ok(Self {
            id: id.to_string(),
            version: version.to_string(),
            codes,
        })
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

fn token(system: Option<&str>, code: &str) -> String {
    match system.filter(|s| !s.is_empty()) {
        Some(system) => format!("{system}|{code}"),
        None => code.to_string(),
    }
}

/// Expansions nest: a `contains` entry may itself contain entries.
fn collect_expansion(contains: &[Value], codes: &mut BTreeSet<String>) {
    for entry in contains {
        if let Some(code) = entry.get("code").and_then(Value::as_str) {
            codes.insert(token(entry.get("system").and_then(Value::as_str), code));
        }
        if let Some(nested) = entry.get("contains").and_then(Value::as_array) {
            collect_expansion(nested, codes);
        }
    }
}

/// In-memory value-set provider with atomic replacement.
pub struct StaticValueSetProvider {
    current: ArcSwap<ReferenceValueSet>,
}

impl StaticValueSetProvider {
    pub fn new(value_set: ReferenceValueSet) -> Self {
        Self {
            current: ArcSwap::from_pointee(value_set),
        }
    }

    /// Loads a FHIR ValueSet JSON file.
    ///
    /// # Errors
    ///
    /// Returns `EcrError::Configuration` if the file cannot be read or parsed.
    pub fn from_file(
        path: impl AsRef<Path>,
        id: Option<&str>,
        version: Option<&str>,
    ) -> EcrResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            EcrError::configuration(format!("cannot read value set {}: {e}", path.display()))
        })?;
        let json: Value = serde_json::from_str(&text).map_err(|e| {
            EcrError::configuration(format!("cannot parse value set {}: {e}", path.display()))
        })?;
        let value_set = ReferenceValueSet::from_fhir(&json, id, version)?;
        tracing::info!(
            value_set = %value_set.id,
            version = %value_set.version,
            codes = value_set.len(),
            "Loaded reportable value set"
        );
        Ok(Self::new(value_set))
    }

    /// Swaps in a new value set. Evaluations already holding a snapshot keep it.
    pub fn replace(&self, value_set: ReferenceValueSet) {
        self.current.store(Arc::new(value_set));
    }
}

impl ValueSetProvider for StaticValueSetProvider {
    fn reportable_value_set(&self) -> Arc<ReferenceValueSet> {
        self.current.load_full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn covid_value_set() -> Value {
        json!({
            "resourceType": "ValueSet",
            "id": "covid-triggers",
            "version": "2020-03-20",
            "compose": {"include": [
                {"system": "http://hl7.org/fhir/sid/icd-10-cm", "concept": [
                    {"code": "U07.1"}, {"code": "J11.1"}
                ]}
            ]},
            "expansion": {"contains": [
                {"system": "http://loinc.org", "code": "94500-6", "contains": [
                    {"system": "http://loinc.org", "code": "94309-2"}
                ]},
                {"code": "840539006"}
            ]}
        })
    }

    #[test]
    fn test_from_fhir_collects_compose_and_expansion() {
        let vs = ReferenceValueSet::from_fhir(&covid_value_set(), None, None).unwrap();
        assert_eq!(vs.id, "covid-triggers");
        assert_eq!(vs.version, "2020-03-20");
        assert_eq!(vs.len(), 5);
        assert!(vs.codes.contains("http://hl7.org/fhir/sid/icd-10-cm|U07.1"));
        assert!(vs.codes.contains("http://loinc.org|94309-2"));
        assert!(vs.codes.contains("840539006"));
    }

    #[test]
    fn test_from_fhir_explicit_provenance_wins() {
        let vs = ReferenceValueSet::from_fhir(
            &covid_value_set(),
            Some(DEFAULT_VALUE_SET_ID),
            Some(DEFAULT_VALUE_SET_VERSION),
        )
        .unwrap();
        assert_eq!(vs.id, DEFAULT_VALUE_SET_ID);
        assert_eq!(vs.version, "1");
    }

    #[test]
    fn test_from_fhir_rejects_other_resources() {
        let err = ReferenceValueSet::from_fhir(&json!({"resourceType": "CodeSystem"}), None, None)
            .unwrap_err();
        assert_eq!(err.kind(), ecr_core::ErrorKind::Configuration);

        let err = ReferenceValueSet::from_fhir(&json!({"resourceType": "ValueSet"}), None, None)
            .unwrap_err();
        assert!(err.to_string().contains("no id"));
    }

    #[test]
    fn test_provider_snapshots_survive_replace() {
        let provider =
            StaticValueSetProvider::new(ReferenceValueSet::new("vs", "1", ["U07.1"]));
        let before = provider.reportable_value_set();

        provider.replace(ReferenceValueSet::new("vs", "2", ["U07.1", "U07.2"]));
        let after = provider.reportable_value_set();

        assert_eq!(before.version, "1");
        assert_eq!(before.len(), 1);
        assert_eq!(after.version, "2");
        assert_eq!(after.len(), 2);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", covid_value_set()).unwrap();

        let provider = StaticValueSetProvider::from_file(file.path(), None, None).unwrap();
        assert_eq!(provider.reportable_value_set().len(), 5);

        let err = StaticValueSetProvider::from_file("/nonexistent/vs.json", None, None)
            .err()
            .unwrap();
        assert!(err.to_string().contains("cannot read value set"));
    }
}
