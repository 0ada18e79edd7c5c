use crate::auth::Credentials;
use crate::error::{AppError, AppResult};
use crate::matrix::{self, apply_edit, find_payment};
use crate::members::{self, apply_form, new_member, stamp_update, validate_form};
use crate::schemas::{Cell, Member, MemberForm, Payment, PaymentDraft, User};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Owns the member and payment collections.
///
/// Collections are copy-on-write: every mutation builds a new vector and
/// swaps it in, so snapshots handed out earlier never change underneath
/// their holders.
#[derive(Clone, Default)]
pub struct Registry {
    members: Arc<Vec<Member>>,
    payments: Arc<Vec<Payment>>,
}

impl Registry {
    pub fn new(members: Vec<Member>, payments: Vec<Payment>) -> Self {
        let mut registry = Registry {
            members: Arc::new(members),
            payments: Arc::default(),
        };
        let duplicates = registry.replace_payments(payments);
        if !duplicates.is_empty() {
            tracing::warn!(count = duplicates.len(), "loaded ledger holds duplicate cells");
        }
        registry
    }

    pub fn members(&self) -> Arc<Vec<Member>> {
        Arc::clone(&self.members)
    }

    pub fn payments(&self) -> Arc<Vec<Payment>> {
        Arc::clone(&self.payments)
    }

    pub fn member(&self, id: &str) -> Option<&Member> {
        self.members.iter().find(|member| member.id == id)
    }

    pub fn search_members(&self, term: &str) -> Vec<Member> {
        members::filter_members(&self.members, term)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn create_member(
        &mut self,
        form: MemberForm,
        operator: &User,
        now: DateTime<Utc>,
    ) -> AppResult<Member> {
        let mut member = new_member(validate_form(form)?, operator, now);
        while self.member(&member.id).is_some() {
            member.id = Uuid::new_v4().to_string();
        }
        let mut next = self.members.as_ref().clone();
        next.push(member.clone());
        self.members = Arc::new(next);
        tracing::info!(member = %member.id, operator = %operator.name, "member created");
        Ok(member)
    }

    pub fn update_member(
        &mut self,
        id: &str,
        form: MemberForm,
        operator: &User,
        now: DateTime<Utc>,
    ) -> AppResult<Member> {
        let form = validate_form(form)?;
        let current = self
            .member(id)
            .ok_or_else(|| AppError::not_found(format!("Member {id}")))?;
        let updated = apply_form(current, form, operator, now);
        self.replace_member(updated.clone());
        tracing::info!(member = %id, operator = %operator.name, "member updated");
        Ok(updated)
    }

    pub fn set_member_active(
        &mut self,
        id: &str,
        active: bool,
        operator: &User,
        now: DateTime<Utc>,
    ) -> AppResult<Member> {
        let mut updated = self
            .member(id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Member {id}")))?;
        updated.active = active;
        stamp_update(&mut updated, operator, now);
        self.replace_member(updated.clone());
        tracing::info!(member = %id, active, operator = %operator.name, "member status changed");
        Ok(updated)
    }

    /// Removes exactly one member once the operator re-entered their password.
    pub fn delete_member(
        &mut self,
        id: &str,
        operator: &User,
        password: &str,
        credentials: &Credentials,
    ) -> AppResult<Member> {
        credentials.verify_password(&operator.id, password)?;
        let removed = self
            .member(id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Member {id}")))?;
        let next = self
            .members
            .iter()
            .filter(|member| member.id != id)
            .cloned()
            .collect();
        self.members = Arc::new(next);
        tracing::info!(member = %id, operator = %operator.name, "member deleted");
        Ok(removed)
    }

    /// Creates or updates the payment of a cell. The lookup and the write happen
    /// under the same `&mut self`, so a cell never ends up with two records.
    pub fn save_payment(&mut self, cell: &Cell, draft: &PaymentDraft) -> AppResult<Payment> {
        if self.member(&cell.member_id).is_none() {
            return Err(AppError::not_found(format!("Member {}", cell.member_id)));
        }
        let existing_id = find_payment(&self.payments, cell).map(|payment| payment.id.clone());
        let mut new_id = Uuid::new_v4().to_string();
        while self.payments.iter().any(|payment| payment.id == new_id) {
            new_id = Uuid::new_v4().to_string();
        }
        let (next, saved) =
            apply_edit(&self.payments, cell, existing_id.as_deref(), draft, new_id)?;
        self.payments = Arc::new(next);
        tracing::info!(
            payment = %saved.id,
            member = %cell.member_id,
            month = cell.month,
            year = cell.year,
            created = existing_id.is_none(),
            "payment saved"
        );
        Ok(saved)
    }

    pub fn delete_payment(
        &mut self,
        id: &str,
        operator: &User,
        password: &str,
        credentials: &Credentials,
    ) -> AppResult<Payment> {
        credentials.verify_password(&operator.id, password)?;
        let removed = self
            .payments
            .iter()
            .find(|payment| payment.id == id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Payment {id}")))?;
        let next = self
            .payments
            .iter()
            .filter(|payment| payment.id != id)
            .cloned()
            .collect();
        self.payments = Arc::new(next);
        tracing::info!(payment = %id, operator = %operator.name, "payment deleted");
        Ok(removed)
    }

    /// Swaps in a whole ledger without checking cells. Returns the cells that
    /// now hold more than one payment.
    pub fn replace_payments(&mut self, payments: Vec<Payment>) -> Vec<Cell> {
        self.payments = Arc::new(payments);
        self.duplicate_cells()
    }

    pub fn duplicate_cells(&self) -> Vec<Cell> {
        matrix::duplicate_cells(&self.payments)
    }

    fn replace_member(&mut self, updated: Member) {
        let next = self
            .members
            .iter()
            .map(|member| {
                if member.id == updated.id {
                    updated.clone()
                } else {
                    member.clone()
                }
            })
            .collect();
        self.members = Arc::new(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tests::sample_credentials;
    use crate::error::WRONG_PASSWORD_MESSAGE;
    use crate::matrix::tests::{date, payment};
    use crate::members::tests::{form, operator};
    use crate::schemas::PaymentStatus;
    use std::collections::HashSet;

    fn admin() -> User {
        operator("u-admin", "Ana Admin")
    }

    fn registry_with(names: &[&str]) -> Registry {
        let mut registry = Registry::default();
        for (i, name) in names.iter().enumerate() {
            registry
                .create_member(form(name, &i.to_string()), &admin(), Utc::now())
                .unwrap();
        }
        registry
    }

    fn cell(member_id: &str, month: u8, year: i32) -> Cell {
        Cell {
            member_id: member_id.to_string(),
            month,
            year,
        }
    }

    fn draft(amount: &str, status: PaymentStatus) -> PaymentDraft {
        PaymentDraft {
            amount: amount.to_string(),
            payment_date: date(2024, 1, 5),
            status,
        }
    }

    #[test]
    fn created_members_have_unique_ids_and_are_active() {
        let registry = registry_with(&["Ana", "Bruno", "Carla", "Davi"]);
        let members = registry.members();
        let ids: HashSet<&str> = members.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids.len(), 4);
        assert!(members.iter().all(|m| m.active));
    }

    #[test]
    fn snapshots_are_not_affected_by_later_writes() {
        let mut registry = registry_with(&["Ana"]);
        let before = registry.members();
        registry
            .create_member(form("Bruno", "9"), &admin(), Utc::now())
            .unwrap();
        assert_eq!(before.len(), 1);
        assert_eq!(registry.members().len(), 2);
    }

    #[test]
    fn update_of_unknown_member_is_not_found() {
        let mut registry = registry_with(&["Ana"]);
        let result = registry.update_member("missing", form("X", "1"), &admin(), Utc::now());
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn deactivating_a_member_stamps_the_operator() {
        let mut registry = registry_with(&["Ana"]);
        let id = registry.members()[0].id.clone();
        let editor = operator("u-editor", "Edu Editor");
        let updated = registry
            .set_member_active(&id, false, &editor, Utc::now())
            .unwrap();
        assert!(!updated.active);
        assert_eq!(updated.updated_by_name.as_deref(), Some("Edu Editor"));
        assert_eq!(updated.created_by_name.as_deref(), Some("Ana Admin"));
    }

    #[test]
    fn member_delete_with_wrong_password_changes_nothing() {
        let credentials = sample_credentials();
        let mut registry = registry_with(&["Ana", "Bruno"]);
        let id = registry.members()[0].id.clone();

        let err = registry
            .delete_member(&id, &admin(), "wrong", &credentials)
            .unwrap_err();
        assert_eq!(err.to_string(), WRONG_PASSWORD_MESSAGE);
        assert_eq!(registry.members().len(), 2);

        let removed = registry
            .delete_member(&id, &admin(), "admin123", &credentials)
            .unwrap();
        assert_eq!(removed.id, id);
        let remaining = registry.members();
        assert_eq!(remaining.len(), 1);
        assert!(remaining.iter().all(|m| m.id != id));
    }

    #[test]
    fn saving_a_cell_twice_keeps_one_record() {
        let mut registry = registry_with(&["Ana"]);
        let member_id = registry.members()[0].id.clone();
        let target = cell(&member_id, 0, 2024);

        let first = registry
            .save_payment(&target, &draft("30.00", PaymentStatus::Pending))
            .unwrap();
        let second = registry
            .save_payment(&target, &draft("35.00", PaymentStatus::Paid))
            .unwrap();

        assert_eq!(first.id, second.id);
        let payments = registry.payments();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount, 35.0);
        assert_eq!(payments[0].status, PaymentStatus::Paid);
        assert!(registry.duplicate_cells().is_empty());
    }

    #[test]
    fn payments_need_a_known_member_and_a_valid_amount() {
        let mut registry = registry_with(&["Ana"]);
        let member_id = registry.members()[0].id.clone();
        assert!(matches!(
            registry.save_payment(&cell("ghost", 0, 2024), &draft("30", PaymentStatus::Paid)),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            registry.save_payment(&cell(&member_id, 0, 2024), &draft("x", PaymentStatus::Paid)),
            Err(AppError::Validation(_))
        ));
        assert!(registry.payments().is_empty());
    }

    #[test]
    fn payment_delete_is_password_gated() {
        let credentials = sample_credentials();
        let mut registry = registry_with(&["Ana"]);
        let member_id = registry.members()[0].id.clone();
        let saved = registry
            .save_payment(&cell(&member_id, 4, 2024), &draft("30", PaymentStatus::Paid))
            .unwrap();
        registry
            .save_payment(&cell(&member_id, 5, 2024), &draft("30", PaymentStatus::Paid))
            .unwrap();

        assert!(matches!(
            registry.delete_payment(&saved.id, &admin(), "nope", &credentials),
            Err(AppError::WrongPassword)
        ));
        assert_eq!(registry.payments().len(), 2);

        registry
            .delete_payment(&saved.id, &admin(), "admin123", &credentials)
            .unwrap();
        let payments = registry.payments();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].month, 5);
    }

    #[test]
    fn whole_ledger_replacement_reports_duplicates() {
        let mut registry = registry_with(&["Ana"]);
        let duplicates = registry.replace_payments(vec![
            payment("a", "m1", 0, 2024, 30.0, PaymentStatus::Paid),
            payment("b", "m1", 0, 2024, 30.0, PaymentStatus::Paid),
            payment("c", "m1", 1, 2024, 30.0, PaymentStatus::Paid),
        ]);
        assert_eq!(duplicates, vec![cell("m1", 0, 2024)]);
    }
}
