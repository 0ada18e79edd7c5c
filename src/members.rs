use crate::error::{AppError, AppResult};
use crate::schemas::{Address, Member, MemberForm, User};
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// Name matches case-insensitively, cpf matches the raw term.
pub fn matches_search(member: &Member, term: &str) -> bool {
    member.name.to_lowercase().contains(&term.to_lowercase()) || member.cpf.contains(term)
}

pub fn filter_members<'a>(members: &'a [Member], term: &str) -> Vec<&'a Member> {
    members
        .iter()
        .filter(|member| matches_search(member, term))
        .collect()
}

/// Fields checked by [`validate_form`]; complement is the only optional one.
const REQUIRED_FIELDS: [&str; 9] = [
    "name",
    "cpf",
    "email",
    "phone",
    "birthDate",
    "street",
    "number",
    "neighborhood",
    "zipCode",
];

pub struct ValidForm {
    pub name: String,
    pub cpf: String,
    pub email: String,
    pub phone: String,
    pub birth_date: NaiveDate,
    pub address: Address,
}

/// Only presence is checked. There is no cpf checksum or email format check.
pub fn validate_form(form: MemberForm) -> AppResult<ValidForm> {
    let values = [
        &form.name,
        &form.cpf,
        &form.email,
        &form.phone,
        &form.birth_date,
        &form.street,
        &form.number,
        &form.neighborhood,
        &form.zip_code,
    ];
    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .zip(values)
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| *field)
        .collect();
    if !missing.is_empty() {
        return Err(AppError::validation(format!(
            "required fields missing: {}",
            missing.join(", ")
        )));
    }
    let birth_date = NaiveDate::parse_from_str(form.birth_date.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::validation("birthDate must be a YYYY-MM-DD date"))?;
    let complement = Some(form.complement).filter(|c| !c.trim().is_empty());
    Ok(ValidForm {
        name: form.name,
        cpf: form.cpf,
        email: form.email,
        phone: form.phone,
        birth_date,
        address: Address {
            street: form.street,
            number: form.number,
            complement,
            neighborhood: form.neighborhood,
            zip_code: form.zip_code,
        },
    })
}

pub fn new_member(form: ValidForm, operator: &User, now: DateTime<Utc>) -> Member {
    Member {
        id: Uuid::new_v4().to_string(),
        name: form.name,
        cpf: form.cpf,
        email: form.email,
        phone: form.phone,
        address: form.address,
        join_date: now.date_naive(),
        birth_date: Some(form.birth_date),
        active: true,
        created_by_id: Some(operator.id.clone()),
        created_by_name: Some(operator.name.clone()),
        updated_by_id: Some(operator.id.clone()),
        updated_by_name: Some(operator.name.clone()),
        updated_at: Some(now),
    }
}

/// Merges the edited fields; creation audit, join date and active flag stay.
pub fn apply_form(member: &Member, form: ValidForm, operator: &User, now: DateTime<Utc>) -> Member {
    let mut updated = Member {
        name: form.name,
        cpf: form.cpf,
        email: form.email,
        phone: form.phone,
        birth_date: Some(form.birth_date),
        address: form.address,
        ..member.clone()
    };
    stamp_update(&mut updated, operator, now);
    updated
}

pub fn stamp_update(member: &mut Member, operator: &User, now: DateTime<Utc>) {
    member.updated_by_id = Some(operator.id.clone());
    member.updated_by_name = Some(operator.name.clone());
    member.updated_at = Some(now);
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::schemas::UserRole;
    use chrono::TimeZone;

    pub(crate) fn form(name: &str, cpf: &str) -> MemberForm {
        MemberForm {
            name: name.to_string(),
            cpf: cpf.to_string(),
            email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            phone: "84 98888-0000".to_string(),
            birth_date: "1980-02-29".to_string(),
            street: "Rua das Conchas".to_string(),
            number: "10".to_string(),
            ..MemberForm::default()
        }
    }

    pub(crate) fn operator(id: &str, name: &str) -> User {
        User {
            id: id.to_string(),
            username: id.to_string(),
            name: name.to_string(),
            role: UserRole::Editor,
        }
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn search_is_case_insensitive_on_name_and_raw_on_cpf() {
        let op = operator("u1", "Ana");
        let members: Vec<Member> = [("Maria Souza", "111.222"), ("João", "333.444")]
            .iter()
            .map(|(name, cpf)| new_member(validate_form(form(name, cpf)).unwrap(), &op, at(1)))
            .collect();

        let by_name: Vec<&str> = filter_members(&members, "SOUZA")
            .into_iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(by_name, vec!["Maria Souza"]);
        let by_cpf: Vec<&str> = filter_members(&members, "333")
            .into_iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(by_cpf, vec!["João"]);
        assert_eq!(filter_members(&members, "").len(), 2);
        assert!(filter_members(&members, "zzz").is_empty());
    }

    #[test]
    fn blank_required_fields_are_reported() {
        let mut incomplete = form("Maria", "1");
        incomplete.email = "  ".to_string();
        incomplete.zip_code = String::new();
        match validate_form(incomplete) {
            Err(AppError::Validation(msg)) => {
                assert!(msg.contains("email"));
                assert!(msg.contains("zipCode"));
            }
            other => panic!("unexpected {:?}", other.map(|f| f.name)),
        }
    }

    #[test]
    fn malformed_birth_date_is_rejected() {
        let mut bad = form("Maria", "1");
        bad.birth_date = "29/02/1980".to_string();
        assert!(matches!(validate_form(bad), Err(AppError::Validation(_))));
    }

    #[test]
    fn new_member_is_active_and_audited() {
        let op = operator("u1", "Ana");
        let member = new_member(validate_form(form("Maria", "1")).unwrap(), &op, at(5));
        assert!(member.active);
        assert_eq!(member.join_date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(member.created_by_name.as_deref(), Some("Ana"));
        assert_eq!(member.updated_by_id.as_deref(), Some("u1"));
        assert_eq!(member.address.complement, None);
    }

    #[test]
    fn update_keeps_creation_audit() {
        let creator = operator("u1", "Ana");
        let editor = operator("u2", "Bia");
        let member = new_member(validate_form(form("Maria", "1")).unwrap(), &creator, at(1));
        let mut edit = form("Maria Clara", "1");
        edit.complement = "Apto 202".to_string();
        let updated = apply_form(&member, validate_form(edit).unwrap(), &editor, at(9));

        assert_eq!(updated.id, member.id);
        assert_eq!(updated.name, "Maria Clara");
        assert_eq!(updated.address.complement.as_deref(), Some("Apto 202"));
        assert_eq!(updated.created_by_name.as_deref(), Some("Ana"));
        assert_eq!(updated.updated_by_name.as_deref(), Some("Bia"));
        assert_eq!(updated.updated_at, Some(at(9)));
        assert_eq!(updated.join_date, member.join_date);
    }
}
