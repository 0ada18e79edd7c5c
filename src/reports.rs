//! Derived figures for the reporting view and the printable documents.
//!
//! Nothing here is stored: every model is recomputed from the member and
//! payment collections on demand.

use crate::matrix::{find_payment, month_abbreviation, round_to_2_decimals};
use crate::schemas::{Cell, Member, MemberId, Payment, PaymentStatus};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

pub const TOP_OPERATORS: usize = 5;
pub const RECENT_ACTIVITY: usize = 8;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTotal {
    pub month: u8,
    pub label: &'static str,
    /// Sum of paid amounts. Pending payments are not collected money.
    pub total: f64,
    /// Every payment of the month, paid or pending.
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatusCounts {
    pub active: usize,
    pub inactive: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorTally {
    pub name: String,
    pub members: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub member_id: MemberId,
    pub member_name: String,
    /// `street, number`
    pub address: String,
    pub operator: Option<String>,
    pub at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub year: i32,
    pub monthly: Vec<MonthlyTotal>,
    pub total_collected: f64,
    pub monthly_average: f64,
    pub status: StatusCounts,
    pub top_operators: Vec<OperatorTally>,
    pub recent_activity: Vec<ActivityEntry>,
}

pub fn monthly_totals(payments: &[Payment], year: i32) -> Vec<MonthlyTotal> {
    (0..12u8)
        .map(|month| {
            let in_month = payments
                .iter()
                .filter(|payment| payment.month == month && payment.year == year);
            let (total, count) = in_month.fold((0.0, 0), |(total, count), payment| {
                let collected = if payment.is_paid() { payment.amount } else { 0.0 };
                (total + collected, count + 1)
            });
            MonthlyTotal {
                month,
                label: month_abbreviation(month),
                total: round_to_2_decimals(total),
                count,
            }
        })
        .collect()
}

pub fn collected_in_year(payments: &[Payment], year: i32) -> f64 {
    let total: f64 = payments
        .iter()
        .filter(|payment| payment.year == year && payment.is_paid())
        .map(|payment| payment.amount)
        .sum();
    round_to_2_decimals(total)
}

pub fn status_counts(members: &[Member]) -> StatusCounts {
    let active = members.iter().filter(|member| member.active).count();
    StatusCounts {
        active,
        inactive: members.len() - active,
    }
}

/// Members registered per operator, most productive first.
pub fn top_operators(members: &[Member], limit: usize) -> Vec<OperatorTally> {
    let mut tally: HashMap<&str, usize> = HashMap::new();
    for name in members.iter().filter_map(|member| member.created_by_name.as_deref()) {
        tally.entry(name).and_modify(|count| *count += 1).or_insert(1);
    }
    let mut ranked: Vec<OperatorTally> = tally
        .into_iter()
        .map(|(name, members)| OperatorTally {
            name: name.to_string(),
            members,
        })
        .collect();
    ranked.sort_by(|a, b| b.members.cmp(&a.members).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(limit);
    ranked
}

/// Most recently touched members. A member never stamped sorts as the epoch.
pub fn recent_activity(members: &[Member], limit: usize) -> Vec<ActivityEntry> {
    let mut sorted: Vec<&Member> = members.iter().collect();
    sorted.sort_by_key(|member| {
        std::cmp::Reverse(member.updated_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH))
    });
    sorted
        .into_iter()
        .take(limit)
        .map(|member| ActivityEntry {
            member_id: member.id.clone(),
            member_name: member.name.clone(),
            address: format!("{}, {}", member.address.street, member.address.number),
            operator: member
                .updated_by_name
                .clone()
                .or_else(|| member.created_by_name.clone()),
            at: member.updated_at,
        })
        .collect()
}

pub fn summarize(members: &[Member], payments: &[Payment], year: i32) -> ReportSummary {
    let monthly = monthly_totals(payments, year);
    let total_collected = round_to_2_decimals(monthly.iter().map(|month| month.total).sum());
    ReportSummary {
        year,
        monthly,
        total_collected,
        monthly_average: round_to_2_decimals(total_collected / 12.0),
        status: status_counts(members),
        top_operators: top_operators(members, TOP_OPERATORS),
        recent_activity: recent_activity(members, RECENT_ACTIVITY),
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum PrintedCell {
    Absent,
    #[serde(rename_all = "camelCase")]
    Paid { payment_date: NaiveDate },
    #[serde(rename_all = "camelCase")]
    Pending { payment_date: NaiveDate },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PrintedRow {
    pub name: String,
    pub cells: Vec<PrintedCell>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMatrixReport {
    pub association_name: String,
    pub year: i32,
    pub issued_at: NaiveDateTime,
    pub active_members: usize,
    pub total_collected: f64,
    pub operator_name: String,
    pub rows: Vec<PrintedRow>,
}

impl PaymentMatrixReport {
    pub fn build(
        association_name: &str,
        members: &[Member],
        payments: &[Payment],
        year: i32,
        operator_name: &str,
        issued_at: NaiveDateTime,
    ) -> Self {
        let rows: Vec<PrintedRow> = members
            .iter()
            .filter(|member| member.active)
            .map(|member| PrintedRow {
                name: member.name.clone(),
                cells: (0..12u8)
                    .map(|month| {
                        let cell = Cell {
                            member_id: member.id.clone(),
                            month,
                            year,
                        };
                        match find_payment(payments, &cell) {
                            None => PrintedCell::Absent,
                            Some(payment) => match payment.status {
                                PaymentStatus::Paid => PrintedCell::Paid {
                                    payment_date: payment.payment_date,
                                },
                                PaymentStatus::Pending => PrintedCell::Pending {
                                    payment_date: payment.payment_date,
                                },
                            },
                        }
                    })
                    .collect(),
            })
            .collect();
        PaymentMatrixReport {
            association_name: association_name.to_string(),
            year,
            issued_at,
            active_members: rows.len(),
            total_collected: collected_in_year(payments, year),
            operator_name: operator_name.to_string(),
            rows,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagementReport {
    pub association_name: String,
    pub issued_at: NaiveDateTime,
    pub summary: ReportSummary,
}

impl ManagementReport {
    pub fn build(
        association_name: &str,
        members: &[Member],
        payments: &[Payment],
        year: i32,
        issued_at: NaiveDateTime,
    ) -> Self {
        ManagementReport {
            association_name: association_name.to_string(),
            issued_at,
            summary: summarize(members, payments, year),
        }
    }
}
