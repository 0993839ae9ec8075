use rust_decimal::Decimal;
use serde::de::DeserializeOwned;

use crate::error::FetchError;
use crate::models::{
    CollectorRecord, FinancialTotals, MemberDueRecord, PaymentRecord, PaymentStatus,
};
use crate::source::{DataSource, RecordSet};

pub const DEFAULT_PAGE_SIZE: i64 = 1000;

pub const PAYMENT_FIELDS: &[&str] = &["amount", "status", "payment_type"];
pub const COLLECTOR_FIELDS: &[&str] = &["*"];
pub const MEMBER_FIELDS: &[&str] = &[
    "yearly_payment_amount",
    "emergency_collection_amount",
    "yearly_payment_status",
    "emergency_collection_status",
];

/// Reads a whole record set page by page. Offsets advance by `page_size`
/// and the loop ends on the first short or empty page.
pub async fn fetch_all<T: DeserializeOwned>(
    source: &dyn DataSource,
    set: RecordSet,
    fields: &[&str],
    page_size: i64,
) -> Result<Vec<T>, FetchError> {
    let page_size = page_size.max(1);
    let mut records = Vec::new();
    let mut offset = 0i64;

    loop {
        let page = source
            .query(set, fields, offset, page_size)
            .await
            .map_err(|source| {
                log::error!("Error fetching {set} at offset {offset}: {source}");
                FetchError::Query {
                    set,
                    offset,
                    source,
                }
            })?;
        let fetched = page.len();
        log::debug!("{set}: fetched {fetched} rows at offset {offset}");

        for row in page {
            let index = records.len();
            let record = serde_json::from_value(row)
                .map_err(|source| FetchError::Decode { set, index, source })?;
            records.push(record);
        }

        if (fetched as i64) < page_size {
            break;
        }
        offset += page_size;
    }

    Ok(records)
}

pub async fn compute_financial_totals(
    source: &dyn DataSource,
    page_size: i64,
) -> Result<FinancialTotals, FetchError> {
    log::info!("Fetching financial totals");

    let (payments, collectors, members) = tokio::try_join!(
        fetch_all::<PaymentRecord>(source, RecordSet::Payments, PAYMENT_FIELDS, page_size),
        fetch_all::<CollectorRecord>(source, RecordSet::Collectors, COLLECTOR_FIELDS, page_size),
        fetch_all::<MemberDueRecord>(source, RecordSet::Members, MEMBER_FIELDS, page_size),
    )?;

    log::info!("Total payments found: {}", payments.len());
    log::info!("Total collectors found: {}", collectors.len());
    log::info!("Total members found: {}", members.len());

    Ok(summarize(&payments, &collectors, &members))
}

pub fn summarize(
    payments: &[PaymentRecord],
    collectors: &[CollectorRecord],
    members: &[MemberDueRecord],
) -> FinancialTotals {
    let total_collected = sum_by_status(payments, PaymentStatus::Approved);
    let pending_amount = sum_by_status(payments, PaymentStatus::Pending);
    let (yearly, emergency) = total_dues(members);

    FinancialTotals {
        total_collected,
        pending_amount,
        remaining_amount: yearly + emergency - total_collected,
        total_collectors: collectors.len(),
        total_transactions: payments.len(),
    }
}

pub fn sum_by_status(payments: &[PaymentRecord], status: PaymentStatus) -> Decimal {
    payments
        .iter()
        .filter(|payment| payment.status == status)
        .map(|payment| payment.amount)
        .sum()
}

/// Returns (yearly, emergency) dues across all members.
pub fn total_dues(members: &[MemberDueRecord]) -> (Decimal, Decimal) {
    members.iter().fold(
        (Decimal::ZERO, Decimal::ZERO),
        |(yearly, emergency), member| {
            (yearly + member.yearly_due(), emergency + member.emergency_due())
        },
    )
}
