use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;
use std::str::FromStr;

use crate::models::category::{CategoryFields, CategoryPatch, DEFAULT_COLOR, DEFAULT_ICON};
use crate::models::transaction::{TransactionFields, TransactionPatch, TransactionType};
use crate::query::TransactionFilter;
use crate::validators::{self, ValidationError};

/// Query value that disables the `type` and `category` filters.
pub const ALL_SENTINEL: &str = "all";

pub const DEFAULT_TREND_MONTHS: u32 = 6;
pub const MAX_TREND_MONTHS: u32 = 120;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CredentialPair {
    pub email: String,
    pub password: String,
}

impl CredentialPair {
    pub fn validate_email_address(&self) -> validators::Validity {
        validators::validate_email_address(&self.email)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl InputUser {
    pub fn validate_email_address(&self) -> validators::Validity {
        validators::validate_email_address(&self.email)
    }
}

/// Body of a transaction create or update. Every field is optional on the wire so that
/// missing fields surface as validation errors naming the field.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct InputTransaction {
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub amount: Option<Decimal>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
}

impl InputTransaction {
    /// Validates a complete transaction. A missing `date` defaults to `now`.
    pub fn to_fields(&self, now: DateTime<Utc>) -> Result<TransactionFields, ValidationError> {
        let transaction_type = match &self.transaction_type {
            Some(t) => parse_transaction_type("type", t)?,
            None => return Err(ValidationError::MissingField("type")),
        };

        let amount = match self.amount {
            Some(a) => validators::validate_amount(a)?,
            None => return Err(ValidationError::MissingField("amount")),
        };

        let category = match &self.category {
            Some(c) => validators::normalize_category_id("category", c)?,
            None => return Err(ValidationError::MissingField("category")),
        };

        let description = match &self.description {
            Some(d) => validators::validate_description(d)?,
            None => return Err(ValidationError::MissingField("description")),
        };

        let date = match &self.date {
            Some(d) => validators::parse_client_date("date", d)?.start(),
            None => now,
        };

        Ok(TransactionFields {
            transaction_type,
            amount,
            category,
            description,
            date,
        })
    }

    /// Validates the fields that are present with the same rules as `to_fields`.
    pub fn to_patch(&self) -> Result<TransactionPatch, ValidationError> {
        Ok(TransactionPatch {
            transaction_type: self
                .transaction_type
                .as_deref()
                .map(|t| parse_transaction_type("type", t))
                .transpose()?,
            amount: self.amount.map(validators::validate_amount).transpose()?,
            category: self
                .category
                .as_deref()
                .map(|c| validators::normalize_category_id("category", c))
                .transpose()?,
            description: self
                .description
                .as_deref()
                .map(validators::validate_description)
                .transpose()?,
            date: self
                .date
                .as_deref()
                .map(|d| validators::parse_client_date("date", d).map(|d| d.start()))
                .transpose()?,
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct InputTransactionQuery {
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
}

impl InputTransactionQuery {
    pub fn to_filter(&self) -> Result<TransactionFilter, ValidationError> {
        let mut filter = TransactionFilter::new();

        if let Some(transaction_type) = non_wildcard(self.transaction_type.as_deref()) {
            filter = filter.with_type(parse_transaction_type("type", transaction_type)?);
        }

        if let Some(category) = non_wildcard(self.category.as_deref()) {
            filter = filter.with_category(category);
        }

        if let Some(search) = &self.search {
            filter = filter.with_search_term(search.trim());
        }

        if let Some(start_date) = non_empty(self.start_date.as_deref()) {
            let start_date = validators::parse_client_date("startDate", start_date)?;
            filter = filter.with_start(start_date.start());
        }

        if let Some(end_date) = non_empty(self.end_date.as_deref()) {
            let end_date = validators::parse_client_date("endDate", end_date)?;
            filter = filter.with_end(end_date.end());
        }

        Ok(filter)
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct InputTrendQuery {
    pub months: Option<u32>,
}

impl InputTrendQuery {
    pub fn months(&self) -> Result<u32, ValidationError> {
        match self.months {
            None => Ok(DEFAULT_TREND_MONTHS),
            Some(m) if (1..=MAX_TREND_MONTHS).contains(&m) => Ok(m),
            Some(_) => Err(ValidationError::InvalidField(
                "months",
                Cow::Owned(format!("must be between 1 and {MAX_TREND_MONTHS}")),
            )),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct InputCategory {
    pub id: Option<String>,
    pub label: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub budget: Option<Decimal>,
}

impl InputCategory {
    /// A missing `id` is derived from the label.
    pub fn to_fields(&self) -> Result<CategoryFields, ValidationError> {
        let label = match &self.label {
            Some(l) => validators::validate_label(l)?,
            None => return Err(ValidationError::MissingField("label")),
        };

        let id = match non_empty(self.id.as_deref()) {
            Some(id) => validators::normalize_category_id("id", id)?,
            None => validators::normalize_category_id("id", &slugify(&label))?,
        };

        Ok(CategoryFields {
            id,
            label,
            icon: non_empty(self.icon.as_deref())
                .unwrap_or(DEFAULT_ICON)
                .to_string(),
            color: non_empty(self.color.as_deref())
                .unwrap_or(DEFAULT_COLOR)
                .to_string(),
            budget: self.budget.map(validators::validate_budget).transpose()?,
        })
    }
}

/// Partial category update. An explicit `"budget": null` clears the budget, while an absent
/// `budget` leaves it as it is.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct InputCategoryPatch {
    pub label: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub budget: Option<Option<Decimal>>,
}

impl InputCategoryPatch {
    pub fn to_patch(&self) -> Result<CategoryPatch, ValidationError> {
        let budget = match self.budget {
            None => None,
            Some(None) => Some(None),
            Some(Some(b)) => Some(Some(validators::validate_budget(b)?)),
        };

        Ok(CategoryPatch {
            label: non_empty(self.label.as_deref())
                .map(validators::validate_label)
                .transpose()?,
            icon: non_empty(self.icon.as_deref()).map(String::from),
            color: non_empty(self.color.as_deref()).map(String::from),
            budget,
        })
    }
}

fn parse_transaction_type(
    field: &'static str,
    transaction_type: &str,
) -> Result<TransactionType, ValidationError> {
    TransactionType::from_str(transaction_type.trim()).map_err(|_| {
        ValidationError::InvalidField(field, Cow::Borrowed("must be 'income' or 'expense'"))
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn non_wildcard(value: Option<&str>) -> Option<&str> {
    non_empty(value).filter(|v| !v.eq_ignore_ascii_case(ALL_SENTINEL))
}

fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());

    for c in label.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }

    String::from(slug.trim_matches('-'))
}

fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
