use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{SourceError, SourceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordSet {
    Payments,
    Collectors,
    Members,
}

impl RecordSet {
    pub fn table(self) -> &'static str {
        match self {
            RecordSet::Payments => "payment_requests",
            RecordSet::Collectors => "members_collectors",
            RecordSet::Members => "members",
        }
    }
}

impl fmt::Display for RecordSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Procedure {
    SecurityAudit,
    MemberNumberCheck,
    RoleValidation,
}

impl Procedure {
    pub fn name(self) -> &'static str {
        match self {
            Procedure::SecurityAudit => "audit_security_settings",
            Procedure::MemberNumberCheck => "check_member_numbers",
            Procedure::RoleValidation => "validate_user_roles",
        }
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Read-only access to the hosted backend: paged row reads and
/// parameterless procedure calls.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn query(
        &self,
        set: RecordSet,
        fields: &[&str],
        offset: i64,
        limit: i64,
    ) -> SourceResult<Vec<Value>>;

    async fn invoke(&self, procedure: Procedure) -> SourceResult<Value>;
}

#[derive(Debug, Default, Deserialize)]
struct FixtureFile {
    #[serde(default)]
    payment_requests: Vec<Value>,
    #[serde(default)]
    members_collectors: Vec<Value>,
    #[serde(default)]
    members: Vec<Value>,
    #[serde(default)]
    procedures: HashMap<String, Value>,
}

/// In-memory backend fed from a JSON document, for offline runs.
#[derive(Debug, Default, Clone)]
pub struct FixtureSource {
    sets: HashMap<RecordSet, Vec<Value>>,
    procedures: HashMap<String, Value>,
}

impl FixtureSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> SourceResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SourceError::Fixture(format!("{}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> SourceResult<Self> {
        let file: FixtureFile =
            serde_json::from_str(text).map_err(|e| SourceError::Fixture(e.to_string()))?;
        Ok(Self::new()
            .with_rows(RecordSet::Payments, file.payment_requests)
            .with_rows(RecordSet::Collectors, file.members_collectors)
            .with_rows(RecordSet::Members, file.members)
            .with_procedures(file.procedures))
    }

    pub fn with_rows(mut self, set: RecordSet, rows: Vec<Value>) -> Self {
        self.sets.insert(set, rows);
        self
    }

    pub fn with_procedure(mut self, procedure: Procedure, result: Value) -> Self {
        self.procedures.insert(procedure.name().to_string(), result);
        self
    }

    fn with_procedures(mut self, procedures: HashMap<String, Value>) -> Self {
        self.procedures.extend(procedures);
        self
    }

    pub fn row_count(&self, set: RecordSet) -> usize {
        self.sets.get(&set).map_or(0, Vec::len)
    }
}

#[async_trait]
impl DataSource for FixtureSource {
    async fn query(
        &self,
        set: RecordSet,
        fields: &[&str],
        offset: i64,
        limit: i64,
    ) -> SourceResult<Vec<Value>> {
        if offset < 0 || limit <= 0 {
            return Err(SourceError::Fixture(format!(
                "invalid range offset={offset} limit={limit}"
            )));
        }
        let rows = self.sets.get(&set).map(Vec::as_slice).unwrap_or_default();
        let start = (offset as usize).min(rows.len());
        let end = start.saturating_add(limit as usize).min(rows.len());
        Ok(rows[start..end]
            .iter()
            .map(|row| project(row, fields))
            .collect())
    }

    async fn invoke(&self, procedure: Procedure) -> SourceResult<Value> {
        self.procedures
            .get(procedure.name())
            .cloned()
            .ok_or_else(|| SourceError::UnknownProcedure {
                name: procedure.name().to_string(),
            })
    }
}

/// Keeps only the requested columns; `*` keeps the whole row.
fn project(row: &Value, fields: &[&str]) -> Value {
    match row {
        Value::Object(map) if !fields.contains(&"*") => Value::Object(
            map.iter()
                .filter(|(key, _)| fields.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        ),
        _ => row.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn numbered(count: usize) -> Vec<Value> {
        (0..count).map(|i| json!({"id": i, "note": "x"})).collect()
    }

    #[tokio::test]
    async fn query_slices_by_offset_and_limit() {
        let source = FixtureSource::new().with_rows(RecordSet::Payments, numbered(5));
        let page = source.query(RecordSet::Payments, &["id"], 3, 10).await.unwrap();
        assert_eq!(page, vec![json!({"id": 3}), json!({"id": 4})]);

        let past_end = source.query(RecordSet::Payments, &["id"], 9, 10).await.unwrap();
        assert!(past_end.is_empty());
    }

    #[tokio::test]
    async fn star_keeps_whole_row() {
        let source = FixtureSource::new().with_rows(RecordSet::Collectors, numbered(1));
        let page = source.query(RecordSet::Collectors, &["*"], 0, 10).await.unwrap();
        assert_eq!(page, vec![json!({"id": 0, "note": "x"})]);
    }

    #[tokio::test]
    async fn unknown_procedure_is_an_error() {
        let source = FixtureSource::new();
        let err = source.invoke(Procedure::SecurityAudit).await.unwrap_err();
        assert!(matches!(err, SourceError::UnknownProcedure { .. }));
    }

    #[test]
    fn loads_fixture_document() {
        let source = FixtureSource::from_json(
            r#"{
                "payment_requests": [{"amount": 10, "status": "approved"}],
                "members": [{}, {}],
                "procedures": {"validate_user_roles": []}
            }"#,
        )
        .unwrap();
        assert_eq!(source.row_count(RecordSet::Payments), 1);
        assert_eq!(source.row_count(RecordSet::Members), 2);
        assert_eq!(source.row_count(RecordSet::Collectors), 0);
    }

    #[test]
    fn rejects_malformed_fixture() {
        let err = FixtureSource::from_json("{not json").unwrap_err();
        assert!(matches!(err, SourceError::Fixture(_)));
    }
}
