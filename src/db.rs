use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use crate::error::SourceResult;
use crate::source::{DataSource, Procedure, RecordSet};

/// Backend reached through a Postgres pool. Every read is ordered by primary
/// key so consecutive offsets never overlap.
#[derive(Debug, Clone)]
pub struct PgSource {
    pool: PgPool,
}

impl PgSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> SourceResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }
}

pub fn page_sql(set: RecordSet, fields: &[&str]) -> String {
    let columns = if fields.is_empty() || fields.contains(&"*") {
        "*".to_string()
    } else {
        fields
            .iter()
            .map(|field| format!("\"{}\"", field.replace('"', "")))
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "SELECT to_jsonb(t) AS row FROM (\
         SELECT {columns} FROM public.{table} ORDER BY id OFFSET $1 LIMIT $2\
         ) t",
        table = set.table(),
    )
}

pub fn procedure_sql(procedure: Procedure) -> String {
    format!(
        "SELECT COALESCE(jsonb_agg(to_jsonb(r)), '[]'::jsonb) AS result \
         FROM public.{}() r",
        procedure.name()
    )
}

#[async_trait]
impl DataSource for PgSource {
    async fn query(
        &self,
        set: RecordSet,
        fields: &[&str],
        offset: i64,
        limit: i64,
    ) -> SourceResult<Vec<Value>> {
        let sql = page_sql(set, fields);
        let records = sqlx::query(&sql)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            rows.push(record.try_get::<Value, _>("row")?);
        }
        Ok(rows)
    }

    async fn invoke(&self, procedure: Procedure) -> SourceResult<Value> {
        let sql = procedure_sql(procedure);
        let result: Value = sqlx::query(&sql)
            .fetch_one(&self.pool)
            .await?
            .try_get("result")?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_sql_quotes_requested_columns() {
        let sql = page_sql(RecordSet::Payments, &["amount", "status"]);
        assert!(sql.contains("SELECT \"amount\", \"status\" FROM public.payment_requests"));
        assert!(sql.contains("ORDER BY id OFFSET $1 LIMIT $2"));
    }

    #[test]
    fn page_sql_selects_everything_for_star() {
        let sql = page_sql(RecordSet::Collectors, &["*"]);
        assert!(sql.contains("SELECT * FROM public.members_collectors"));
    }

    #[test]
    fn procedure_sql_aggregates_rows() {
        let sql = procedure_sql(Procedure::MemberNumberCheck);
        assert!(sql.contains("FROM public.check_member_numbers() r"));
        assert!(sql.contains("jsonb_agg"));
    }
}
