use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Yearly dues charged to a member whose record carries no amount at all.
/// Only a missing or null amount falls back. A stored 0 is a real amount
/// and stays 0; it is not treated as unset.
pub const DEFAULT_YEARLY_DUE: Decimal = Decimal::from_parts(40, 0, 0, false, 0);

pub const COLLECTORS_WITHOUT_ROLE: &str = "Collectors Without Role";
pub const MULTIPLE_ROLES_ASSIGNED: &str = "Multiple Roles Assigned";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Approved,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRecord {
    #[serde(default, deserialize_with = "nullable_decimal")]
    pub amount: Decimal,
    #[serde(default, deserialize_with = "nullable_status")]
    pub status: PaymentStatus,
    #[serde(default)]
    pub payment_type: Option<String>,
}

/// A collector assignment row. Only the row count matters to the totals.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct CollectorRecord(pub serde_json::Map<String, serde_json::Value>);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberDueRecord {
    #[serde(default)]
    pub yearly_payment_amount: Option<Decimal>,
    #[serde(default)]
    pub emergency_collection_amount: Option<Decimal>,
}

impl MemberDueRecord {
    pub fn yearly_due(&self) -> Decimal {
        self.yearly_payment_amount.unwrap_or(DEFAULT_YEARLY_DUE)
    }

    pub fn emergency_due(&self) -> Decimal {
        self.emergency_collection_amount.unwrap_or(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FinancialTotals {
    pub total_collected: Decimal,
    pub pending_amount: Decimal,
    pub remaining_amount: Decimal,
    pub total_collectors: usize,
    pub total_transactions: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Success,
    Info,
}

impl Severity {
    /// Case-insensitive; unknown labels render as informational.
    pub fn from_status(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "critical" => Severity::Critical,
            "warning" => Severity::Warning,
            "success" => Severity::Success,
            _ => Severity::Info,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
            Severity::Success => "success",
            Severity::Info => "info",
        }
    }

    pub fn marker(self) -> &'static str {
        match self {
            Severity::Critical => "[x]",
            Severity::Warning => "[!]",
            Severity::Success => "[ok]",
            Severity::Info => "[i]",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorRoleIssue {
    pub collector_name: String,
    #[serde(default)]
    pub member_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleConflict {
    pub user_id: Uuid,
    pub roles: Vec<String>,
    #[serde(default)]
    pub created_at: Vec<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CheckDetails {
    CollectorsWithoutRole(Vec<CollectorRoleIssue>),
    MultipleRoles(Vec<RoleConflict>),
    Generic(serde_json::Value),
}

impl CheckDetails {
    /// Picks the typed shape for the known categories and falls back to the
    /// raw payload when the category is unknown or the payload doesn't fit.
    pub fn from_payload(check_type: &str, payload: serde_json::Value) -> Self {
        if check_type.eq_ignore_ascii_case(COLLECTORS_WITHOUT_ROLE) {
            if let Some(rows) = typed_rows::<CollectorRoleIssue>(&payload) {
                return CheckDetails::CollectorsWithoutRole(rows);
            }
        } else if check_type.eq_ignore_ascii_case(MULTIPLE_ROLES_ASSIGNED) {
            if let Some(rows) = typed_rows::<RoleConflict>(&payload) {
                return CheckDetails::MultipleRoles(rows);
            }
        }
        CheckDetails::Generic(payload)
    }
}

/// Accepts either an array of rows or a single row object.
fn typed_rows<T: serde::de::DeserializeOwned>(payload: &serde_json::Value) -> Option<Vec<T>> {
    match payload {
        serde_json::Value::Array(_) => serde_json::from_value(payload.clone()).ok(),
        serde_json::Value::Object(_) => serde_json::from_value(payload.clone())
            .ok()
            .map(|row| vec![row]),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemCheckResult {
    pub check_type: String,
    pub status: String,
    pub details: CheckDetails,
}

impl SystemCheckResult {
    pub fn severity(&self) -> Severity {
        Severity::from_status(&self.status)
    }
}

/// Row shape returned by the security audit and role validation procedures.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCheckRow {
    pub check_type: String,
    pub status: String,
    #[serde(default)]
    pub details: serde_json::Value,
}

impl From<RawCheckRow> for SystemCheckResult {
    fn from(row: RawCheckRow) -> Self {
        let details = CheckDetails::from_payload(&row.check_type, row.details);
        SystemCheckResult {
            check_type: row.check_type,
            status: row.status,
            details,
        }
    }
}

/// Row shape returned by the member number check.
#[derive(Debug, Clone, Deserialize)]
pub struct MemberNumberIssue {
    pub issue_type: String,
    #[serde(default)]
    pub description: serde_json::Value,
    #[serde(default)]
    pub affected_table: serde_json::Value,
    #[serde(default)]
    pub member_number: serde_json::Value,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckGroup {
    pub check_type: String,
    pub status: String,
    pub results: Vec<SystemCheckResult>,
}

impl CheckGroup {
    pub fn severity(&self) -> Severity {
        Severity::from_status(&self.status)
    }
}

fn nullable_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Decimal>::deserialize(deserializer)?.unwrap_or_default())
}

fn nullable_status<'de, D>(deserializer: D) -> Result<PaymentStatus, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<PaymentStatus>::deserialize(deserializer)?.unwrap_or_default())
}
