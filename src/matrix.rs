use crate::error::{AppError, AppResult};
use crate::policy::{self, Action};
use crate::schemas::{Cell, Member, MemberId, Payment, PaymentDraft, PaymentId, PaymentStatus, User};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

pub const MONTH_NAMES: [&str; 12] = [
    "Janeiro",
    "Fevereiro",
    "Março",
    "Abril",
    "Maio",
    "Junho",
    "Julho",
    "Agosto",
    "Setembro",
    "Outubro",
    "Novembro",
    "Dezembro",
];

pub const DEFAULT_AMOUNT: &str = "30.00";

pub fn month_abbreviation(month: u8) -> &'static str {
    MONTH_NAMES
        .get(month as usize)
        .copied()
        .map(|name| name.get(..3).unwrap_or(name))
        .unwrap_or("")
}

pub fn find_payment<'a>(payments: &'a [Payment], cell: &Cell) -> Option<&'a Payment> {
    payments.iter().find(|payment| cell.matches(payment))
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum CellState {
    Awaiting,
    #[serde(rename_all = "camelCase")]
    Paid { payment_id: PaymentId, amount: f64 },
    #[serde(rename_all = "camelCase")]
    Pending { payment_id: PaymentId, amount: f64 },
}

pub fn resolve_cell(payments: &[Payment], cell: &Cell) -> CellState {
    match find_payment(payments, cell) {
        None => CellState::Awaiting,
        Some(payment) => {
            let payment_id = payment.id.clone();
            let amount = payment.amount;
            match payment.status {
                PaymentStatus::Paid => CellState::Paid { payment_id, amount },
                PaymentStatus::Pending => CellState::Pending { payment_id, amount },
            }
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixRow {
    pub member_id: MemberId,
    pub member_name: String,
    pub cells: Vec<CellState>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixView {
    pub year: i32,
    pub months: Vec<&'static str>,
    pub rows: Vec<MatrixRow>,
}

/// Active members whose name contains `term`, each with twelve resolved cells.
pub fn matrix_view(members: &[Member], payments: &[Payment], year: i32, term: &str) -> MatrixView {
    let term = term.to_lowercase();
    let rows = members
        .iter()
        .filter(|member| member.active && member.name.to_lowercase().contains(&term))
        .map(|member| MatrixRow {
            member_id: member.id.clone(),
            member_name: member.name.clone(),
            cells: (0..12u8)
                .map(|month| {
                    let cell = Cell {
                        member_id: member.id.clone(),
                        month,
                        year,
                    };
                    resolve_cell(payments, &cell)
                })
                .collect(),
        })
        .collect();
    MatrixView {
        year,
        months: MONTH_NAMES.to_vec(),
        rows,
    }
}

pub fn default_draft(today: NaiveDate) -> PaymentDraft {
    PaymentDraft {
        amount: DEFAULT_AMOUNT.to_string(),
        payment_date: today,
        status: PaymentStatus::Paid,
    }
}

pub fn draft_for(payment: &Payment) -> PaymentDraft {
    PaymentDraft {
        amount: format!("{:.2}", payment.amount),
        payment_date: payment.payment_date,
        status: payment.status,
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenedCell {
    pub cell: Cell,
    pub title: String,
    pub payment_id: Option<PaymentId>,
    pub draft: PaymentDraft,
    pub read_only: bool,
}

/// Opening an empty cell means starting a new payment, which viewers can't do.
pub fn open_cell(
    payments: &[Payment],
    cell: Cell,
    member_name: &str,
    operator: &User,
    today: NaiveDate,
) -> AppResult<OpenedCell> {
    validate_month(cell.month)?;
    policy::authorize(operator, Action::ViewPayments)?;
    let existing = find_payment(payments, &cell);
    if existing.is_none() {
        policy::authorize(operator, Action::EditPayments)?;
    }
    Ok(OpenedCell {
        title: format!(
            "{} de {} - {}",
            MONTH_NAMES[cell.month as usize], cell.year, member_name
        ),
        payment_id: existing.map(|payment| payment.id.clone()),
        draft: existing.map(draft_for).unwrap_or_else(|| default_draft(today)),
        read_only: !policy::can(operator, Action::EditPayments),
        cell,
    })
}

pub fn validate_month(month: u8) -> AppResult<()> {
    if month < 12 {
        Ok(())
    } else {
        Err(AppError::validation(format!("month {month} is outside 0..=11")))
    }
}

pub fn parse_amount(amount: &str) -> AppResult<f64> {
    let value: f64 = amount
        .trim()
        .replace(',', ".")
        .parse()
        .map_err(|_| AppError::validation(format!("amount {amount:?} is not a number")))?;
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::validation(format!(
            "amount {amount:?} must be a non-negative number"
        )));
    }
    let rounded = round_to_2_decimals(value);
    if !rounded.is_finite() {
        return Err(AppError::validation(format!("amount {amount:?} is too large")));
    }
    // -0 parses fine and would print as "-0.00".
    Ok(rounded.abs())
}

pub fn round_to_2_decimals(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}

/// Applies a submitted draft to a snapshot of the ledger.
///
/// `existing_id` is whatever the caller believed was in the cell when it
/// was opened. The record is replaced in place when it is known, otherwise a
/// new record with `new_id` is appended. This function does not look the cell
/// up again: a caller holding a stale `None` appends a second record for the
/// same cell. The registry avoids that by resolving `existing_id` under its
/// write lock.
pub fn apply_edit(
    payments: &[Payment],
    cell: &Cell,
    existing_id: Option<&str>,
    draft: &PaymentDraft,
    new_id: PaymentId,
) -> AppResult<(Vec<Payment>, Payment)> {
    validate_month(cell.month)?;
    let amount = parse_amount(&draft.amount)?;
    let mut record = Payment {
        id: new_id,
        member_id: cell.member_id.clone(),
        month: cell.month,
        year: cell.year,
        amount,
        payment_date: draft.payment_date,
        status: draft.status,
    };
    let next = match existing_id {
        Some(id) => {
            if !payments.iter().any(|payment| payment.id == id) {
                return Err(AppError::not_found(format!("Payment {id}")));
            }
            record.id = id.to_string();
            payments
                .iter()
                .map(|payment| {
                    if payment.id == id {
                        record.clone()
                    } else {
                        payment.clone()
                    }
                })
                .collect()
        }
        None => {
            let mut next = payments.to_vec();
            next.push(record.clone());
            next
        }
    };
    Ok((next, record))
}

/// Cells holding more than one payment, in first-seen order.
pub fn duplicate_cells(payments: &[Payment]) -> Vec<Cell> {
    let mut counts: HashMap<Cell, usize> = HashMap::new();
    let mut order = Vec::new();
    for payment in payments {
        let cell = payment.cell();
        counts
            .entry(cell.clone())
            .and_modify(|count| *count += 1)
            .or_insert_with(|| {
                order.push(cell);
                1
            });
    }
    order
        .into_iter()
        .filter(|cell| counts.get(cell).copied().unwrap_or(0) > 1)
        .collect()
}
