use std::fmt::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::models::{
    CheckDetails, CheckGroup, CollectorRoleIssue, FinancialTotals, RoleConflict,
};

pub fn render_totals(totals: &FinancialTotals) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "- Total collected: {:.2}", totals.total_collected);
    let _ = writeln!(output, "- Pending amount: {:.2}", totals.pending_amount);
    let _ = writeln!(output, "- Remaining amount: {:.2}", totals.remaining_amount);
    let _ = writeln!(output, "- Active collectors: {}", totals.total_collectors);
    let _ = writeln!(output, "- Transactions: {}", totals.total_transactions);
    output
}

pub fn render_groups(groups: &[CheckGroup]) -> String {
    let mut output = String::new();

    if groups.is_empty() {
        let _ = writeln!(output, "No issues reported.");
        return output;
    }

    for group in groups {
        let severity = group.severity();
        let _ = writeln!(
            output,
            "### {} {} ({})",
            severity.marker(),
            group.check_type,
            group.status
        );
        let _ = writeln!(output);

        let details: Vec<&CheckDetails> = group.results.iter().map(|r| &r.details).collect();
        output.push_str(&render_details(&details));
        let _ = writeln!(output);
    }

    output
}

/// Table categories merge the rows of every result in the group; anything
/// else is listed one result at a time.
fn render_details(details: &[&CheckDetails]) -> String {
    let mut collectors: Vec<&CollectorRoleIssue> = Vec::new();
    let mut conflicts: Vec<&RoleConflict> = Vec::new();
    let mut generic = String::new();

    for detail in details {
        match detail {
            CheckDetails::CollectorsWithoutRole(rows) => collectors.extend(rows),
            CheckDetails::MultipleRoles(rows) => conflicts.extend(rows),
            CheckDetails::Generic(value) => generic.push_str(&render_key_values(value)),
        }
    }

    let mut output = String::new();
    if !collectors.is_empty() {
        output.push_str(&render_collector_table(&collectors));
    }
    if !conflicts.is_empty() {
        output.push_str(&render_role_table(&conflicts));
    }
    output.push_str(&generic);
    output
}

fn render_collector_table(rows: &[&CollectorRoleIssue]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "| Collector | Member Number |");
    let _ = writeln!(output, "|---|---|");
    for row in rows {
        let _ = writeln!(
            output,
            "| {} | {} |",
            row.collector_name,
            row.member_number.as_deref().unwrap_or("-")
        );
    }
    output
}

fn render_role_table(rows: &[&RoleConflict]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "| User ID | Roles | Created |");
    let _ = writeln!(output, "|---|---|---|");
    for row in rows {
        let created = row
            .created_at
            .iter()
            .map(format_date)
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(
            output,
            "| {} | {} | {} |",
            row.user_id,
            row.roles.join(", "),
            created
        );
    }
    output
}

pub fn render_key_values(value: &Value) -> String {
    let mut output = String::new();
    match value {
        Value::String(text) => {
            let _ = writeln!(output, "{text}");
        }
        Value::Object(map) => {
            for (key, value) in map {
                let _ = writeln!(output, "- {key}: {}", pretty(value));
            }
        }
        Value::Array(items) => {
            for (index, value) in items.iter().enumerate() {
                let _ = writeln!(output, "- {index}: {}", pretty(value));
            }
        }
        Value::Null => {}
        other => {
            let _ = writeln!(output, "{}", pretty(other));
        }
    }
    output
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

pub fn format_date(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%-m/%-d/%Y").to_string()
}

pub fn build_report(
    generated_at: DateTime<Utc>,
    totals: &FinancialTotals,
    groups: &[CheckGroup],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Financial & Collector Report");
    let _ = writeln!(output, "Generated {}", generated_at.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Totals");
    output.push_str(&render_totals(totals));
    let _ = writeln!(output);
    let _ = writeln!(output, "## System Checks");
    let _ = writeln!(output);
    output.push_str(&render_groups(groups));

    output
}

#[derive(Serialize)]
struct CheckCsvRow<'a> {
    check_type: &'a str,
    status: &'a str,
    severity: &'a str,
    details: String,
}

/// One CSV row per check result, details as compact JSON.
pub fn write_checks_csv(path: &Path, groups: &[CheckGroup]) -> anyhow::Result<usize> {
    let mut writer = csv::Writer::from_path(path)?;
    let mut written = 0usize;

    for group in groups {
        for result in &group.results {
            writer.serialize(CheckCsvRow {
                check_type: &result.check_type,
                status: &result.status,
                severity: result.severity().label(),
                details: serde_json::to_string(&result.details)?,
            })?;
            written += 1;
        }
    }

    writer.flush()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::group_by_check_type;
    use crate::models::{SystemCheckResult, COLLECTORS_WITHOUT_ROLE, MULTIPLE_ROLES_ASSIGNED};
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn result(check_type: &str, status: &str, payload: Value) -> SystemCheckResult {
        SystemCheckResult {
            check_type: check_type.to_string(),
            status: status.to_string(),
            details: CheckDetails::from_payload(check_type, payload),
        }
    }

    #[test]
    fn formats_dates_month_first() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 5, 23, 10, 0).unwrap();
        assert_eq!(format_date(&ts), "3/5/2024");
    }

    #[test]
    fn collectors_render_as_one_table_per_group() {
        let groups = group_by_check_type(vec![
            result(
                COLLECTORS_WITHOUT_ROLE,
                "Warning",
                json!([{"collector_name": "Sarah Ahmed", "member_number": "TS00012"}]),
            ),
            result(COLLECTORS_WITHOUT_ROLE, "Warning", json!({"collector_name": "Omar Khan"})),
        ]);
        let rendered = render_groups(&groups);

        assert!(rendered.contains("### [!] Collectors Without Role (Warning)"));
        assert_eq!(rendered.matches("| Collector | Member Number |").count(), 1);
        assert!(rendered.contains("| Sarah Ahmed | TS00012 |"));
        assert!(rendered.contains("| Omar Khan | - |"));
    }

    #[test]
    fn role_conflicts_join_roles_and_dates() {
        let groups = group_by_check_type(vec![result(
            MULTIPLE_ROLES_ASSIGNED,
            "critical",
            json!([{
                "user_id": "0c22f1f1-9184-4fd4-9b21-28c68a6a89dc",
                "roles": ["admin", "collector"],
                "created_at": ["2024-01-15T10:20:30Z", "2024-02-01T00:00:00Z"]
            }]),
        )]);
        let rendered = render_groups(&groups);

        assert!(rendered.contains("### [x] Multiple Roles Assigned (critical)"));
        assert!(rendered.contains(
            "| 0c22f1f1-9184-4fd4-9b21-28c68a6a89dc | admin, collector | 1/15/2024, 2/1/2024 |"
        ));
    }

    #[test]
    fn generic_details_list_keys_with_json_values() {
        let rendered = render_key_values(&json!({
            "description": "Member number used twice",
            "member_ids": [7, 9]
        }));
        assert!(rendered.contains("- description: \"Member number used twice\""));
        assert!(rendered.contains("- member_ids: [\n  7,\n  9\n]"));
    }

    #[test]
    fn array_details_list_index_value_pairs() {
        let rendered = render_key_values(&json!([{"table": "members"}, "orphaned row"]));
        assert_eq!(
            rendered,
            "- 0: {\n  \"table\": \"members\"\n}\n- 1: \"orphaned row\"\n"
        );
    }

    #[test]
    fn string_details_print_verbatim() {
        assert_eq!(render_key_values(&json!("all good")), "all good\n");
    }

    #[test]
    fn empty_check_set_says_so() {
        assert_eq!(render_groups(&[]), "No issues reported.\n");
    }

    #[test]
    fn report_contains_both_sections() {
        let totals = FinancialTotals {
            total_collected: Decimal::from(100),
            pending_amount: Decimal::from(50),
            remaining_amount: Decimal::from(-10),
            total_collectors: 3,
            total_transactions: 7,
        };
        let generated = Utc.with_ymd_and_hms(2026, 2, 8, 9, 30, 0).unwrap();
        let report = build_report(generated, &totals, &[]);

        assert!(report.starts_with("# Financial & Collector Report\nGenerated 2026-02-08 09:30 UTC"));
        assert!(report.contains("- Remaining amount: -10.00"));
        assert!(report.contains("- Transactions: 7"));
        assert!(report.contains("## System Checks"));
    }

    #[test]
    fn csv_export_writes_a_row_per_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checks.csv");
        let groups = group_by_check_type(vec![
            result("RLS Disabled", "Critical", json!({"table": "payments"})),
            result("RLS Disabled", "Critical", json!({"table": "members"})),
            result("Auth Settings", "success", json!("ok")),
        ]);

        let written = write_checks_csv(&path, &groups).unwrap();
        assert_eq!(written, 3);

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("check_type,status,severity,details"));
        assert_eq!(
            lines.next(),
            Some(r#"RLS Disabled,Critical,critical,"{""table"":""payments""}""#)
        );
        assert_eq!(lines.nth(1), Some("Auth Settings,success,success,\"\"\"ok\"\"\""));
    }
}
