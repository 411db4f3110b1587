use chrono::{DateTime, Utc};
use diesel::deserialize::{self, FromSql};
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use diesel::{AsChangeset, Insertable, Queryable, Selectable};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use uuid::Uuid;

use crate::schema::transactions;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            _ => Err(()),
        }
    }
}

impl ToSql<Text, Pg> for TransactionType {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for TransactionType {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"income" => Ok(TransactionType::Income),
            b"expense" => Ok(TransactionType::Expense),
            _ => Err("Unrecognized transaction type".into()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Transaction {
    pub id: Uuid,
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub category: String,
    pub description: String,
    pub date: DateTime<Utc>,
    #[serde(rename = "createdAt")]
    pub created_timestamp: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub modified_timestamp: DateTime<Utc>,
}

impl Transaction {
    pub fn new(id: Uuid, user_id: Uuid, fields: &TransactionFields, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            transaction_type: fields.transaction_type,
            amount: fields.amount,
            category: fields.category.clone(),
            description: fields.description.clone(),
            date: fields.date,
            created_timestamp: now,
            modified_timestamp: now,
        }
    }

    pub fn is_income(&self) -> bool {
        self.transaction_type == TransactionType::Income
    }

    pub fn is_expense(&self) -> bool {
        self.transaction_type == TransactionType::Expense
    }

    pub fn apply_patch(&mut self, patch: &TransactionPatch, now: DateTime<Utc>) {
        if let Some(transaction_type) = patch.transaction_type {
            self.transaction_type = transaction_type;
        }

        if let Some(amount) = patch.amount {
            self.amount = amount;
        }

        if let Some(category) = &patch.category {
            self.category.clone_from(category);
        }

        if let Some(description) = &patch.description {
            self.description.clone_from(description);
        }

        if let Some(date) = patch.date {
            self.date = date;
        }

        self.modified_timestamp = now;
    }
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name = transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewTransaction<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub category: &'a str,
    pub description: &'a str,
    pub date: DateTime<Utc>,
    pub created_timestamp: DateTime<Utc>,
    pub modified_timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, AsChangeset)]
#[diesel(table_name = transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TransactionChangeset<'a> {
    pub transaction_type: Option<TransactionType>,
    pub amount: Option<Decimal>,
    pub category: Option<&'a str>,
    pub description: Option<&'a str>,
    pub date: Option<DateTime<Utc>>,
    pub modified_timestamp: DateTime<Utc>,
}

impl<'a> TransactionChangeset<'a> {
    pub fn from_patch(patch: &'a TransactionPatch, now: DateTime<Utc>) -> Self {
        Self {
            transaction_type: patch.transaction_type,
            amount: patch.amount,
            category: patch.category.as_deref(),
            description: patch.description.as_deref(),
            date: patch.date,
            modified_timestamp: now,
        }
    }
}

/// Complete, validated contents of a new transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct TransactionFields {
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub category: String,
    pub description: String,
    pub date: DateTime<Utc>,
}

/// Validated partial update. `None` leaves the stored value untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransactionPatch {
    pub transaction_type: Option<TransactionType>,
    pub amount: Option<Decimal>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
}
