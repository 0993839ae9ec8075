use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::CheckInvocationError;
use crate::models::{
    CheckDetails, CheckGroup, MemberNumberIssue, RawCheckRow, SystemCheckResult,
};
use crate::source::{DataSource, Procedure};

/// Status given to every member number finding, whatever the check reports.
pub const MEMBER_ISSUE_STATUS: &str = "Warning";

/// Runs the three health checks. Any failing procedure fails the whole batch.
pub async fn run_system_checks(
    source: &dyn DataSource,
) -> Result<Vec<SystemCheckResult>, CheckInvocationError> {
    let (security, members, roles) = tokio::try_join!(
        invoke_rows::<RawCheckRow>(source, Procedure::SecurityAudit),
        invoke_rows::<MemberNumberIssue>(source, Procedure::MemberNumberCheck),
        invoke_rows::<RawCheckRow>(source, Procedure::RoleValidation),
    )?;

    log::info!(
        "System checks returned {} security, {} member, {} role findings",
        security.len(),
        members.len(),
        roles.len()
    );

    let mut results = Vec::with_capacity(security.len() + members.len() + roles.len());
    results.extend(security.into_iter().map(SystemCheckResult::from));
    results.extend(members.into_iter().map(normalize_member_issue));
    results.extend(roles.into_iter().map(SystemCheckResult::from));
    Ok(results)
}

async fn invoke_rows<T: DeserializeOwned>(
    source: &dyn DataSource,
    procedure: Procedure,
) -> Result<Vec<T>, CheckInvocationError> {
    let payload = source.invoke(procedure).await.map_err(|source| {
        log::error!("Error running {procedure}: {source}");
        CheckInvocationError::Invoke { procedure, source }
    })?;

    let payload = match payload {
        Value::Null => return Ok(Vec::new()),
        Value::Array(_) => payload,
        single => Value::Array(vec![single]),
    };
    serde_json::from_value(payload)
        .map_err(|source| CheckInvocationError::Decode { procedure, source })
}

pub fn normalize_member_issue(issue: MemberNumberIssue) -> SystemCheckResult {
    let mut details = serde_json::Map::new();
    details.insert("description".to_string(), issue.description);
    details.insert("affected_table".to_string(), issue.affected_table);
    details.insert("member_number".to_string(), issue.member_number);
    for (key, value) in issue.extra {
        details.entry(key).or_insert(value);
    }

    SystemCheckResult {
        check_type: issue.issue_type,
        status: MEMBER_ISSUE_STATUS.to_string(),
        details: CheckDetails::Generic(Value::Object(details)),
    }
}

/// Groups by check type in order of first appearance. A group shows the
/// status of its first result.
pub fn group_by_check_type(results: Vec<SystemCheckResult>) -> Vec<CheckGroup> {
    let mut groups: Vec<CheckGroup> = Vec::new();

    for result in results {
        match groups
            .iter_mut()
            .find(|group| group.check_type == result.check_type)
        {
            Some(group) => group.results.push(result),
            None => groups.push(CheckGroup {
                check_type: result.check_type.clone(),
                status: result.status.clone(),
                results: vec![result],
            }),
        }
    }

    groups
}
