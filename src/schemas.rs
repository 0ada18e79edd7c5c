use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub type MemberId = String;
pub type PaymentId = String;
pub type UserId = String;

pub const DEFAULT_NEIGHBORHOOD: &str = "Praia do Meio";
pub const DEFAULT_ZIP_CODE: &str = "59010-000";

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complement: Option<String>,
    pub neighborhood: String,
    pub zip_code: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub cpf: String,
    pub email: String,
    pub phone: String,
    pub address: Address,
    pub join_date: NaiveDate,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Paid,
    Pending,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    pub member_id: MemberId,
    /// Zero based, January is 0.
    pub month: u8,
    pub year: i32,
    pub amount: f64,
    pub payment_date: NaiveDate,
    pub status: PaymentStatus,
}

impl Payment {
    pub fn cell(&self) -> Cell {
        Cell {
            member_id: self.member_id.clone(),
            month: self.month,
            year: self.year,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.status == PaymentStatus::Paid
    }
}

/// A slot of the payment matrix. Holds at most one payment.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub member_id: MemberId,
    pub month: u8,
    pub year: i32,
}

impl Cell {
    pub fn matches(&self, payment: &Payment) -> bool {
        payment.member_id == self.member_id
            && payment.month == self.month
            && payment.year == self.year
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Editor,
    Viewer,
}

/// The acting operator. Credentials live in `auth::Credentials`, never here.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub name: String,
    pub role: UserRole,
}

/// Editable member fields as submitted by the registry form.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberForm {
    pub name: String,
    pub cpf: String,
    pub email: String,
    pub phone: String,
    pub birth_date: String,
    pub street: String,
    pub number: String,
    #[serde(default)]
    pub complement: String,
    pub neighborhood: String,
    pub zip_code: String,
}

impl Default for MemberForm {
    fn default() -> Self {
        MemberForm {
            name: String::new(),
            cpf: String::new(),
            email: String::new(),
            phone: String::new(),
            birth_date: String::new(),
            street: String::new(),
            number: String::new(),
            complement: String::new(),
            neighborhood: DEFAULT_NEIGHBORHOOD.to_string(),
            zip_code: DEFAULT_ZIP_CODE.to_string(),
        }
    }
}

impl From<&Member> for MemberForm {
    fn from(member: &Member) -> Self {
        MemberForm {
            name: member.name.clone(),
            cpf: member.cpf.clone(),
            email: member.email.clone(),
            phone: member.phone.clone(),
            birth_date: member
                .birth_date
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            street: member.address.street.clone(),
            number: member.address.number.clone(),
            complement: member.address.complement.clone().unwrap_or_default(),
            neighborhood: member.address.neighborhood.clone(),
            zip_code: member.address.zip_code.clone(),
        }
    }
}

/// Editable payment fields. The cell coordinates never come from here.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDraft {
    pub amount: String,
    pub payment_date: NaiveDate,
    pub status: PaymentStatus,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct PasswordConfirmation {
    pub password: String,
}
