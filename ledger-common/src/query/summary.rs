use chrono::Datelike;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::models::category::Category;
use crate::models::transaction::{Transaction, TransactionType};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub label: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_income: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_expenses: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    pub category_breakdown: Vec<CategoryTotal>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MonthlyTotal {
    /// `YYYY-MM`
    pub month: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub income: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub expenses: Decimal,
}

/// Income and expense totals plus the per-category expense breakdown, largest first.
/// Categories missing from `categories` are labelled with their raw identifier.
pub fn summarize(transactions: &[Transaction], categories: &[Category]) -> Summary {
    let mut total_income = Decimal::ZERO;
    let mut total_expenses = Decimal::ZERO;
    let mut expenses_by_category: HashMap<&str, Decimal> = HashMap::new();

    for transaction in transactions {
        if transaction.is_income() {
            total_income = total_income.saturating_add(transaction.amount);
            continue;
        }

        total_expenses = total_expenses.saturating_add(transaction.amount);

        let category_total = expenses_by_category
            .entry(transaction.category.as_str())
            .or_insert(Decimal::ZERO);
        *category_total = category_total.saturating_add(transaction.amount);
    }

    let labels: HashMap<&str, &str> = categories
        .iter()
        .map(|c| (c.id.as_str(), c.label.as_str()))
        .collect();

    let mut category_breakdown: Vec<CategoryTotal> = expenses_by_category
        .into_iter()
        .map(|(category, total)| CategoryTotal {
            category: String::from(category),
            label: String::from(labels.get(category).copied().unwrap_or(category)),
            total,
        })
        .collect();

    category_breakdown.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.category.cmp(&b.category))
    });

    Summary {
        total_income,
        total_expenses,
        balance: total_income.saturating_sub(total_expenses),
        category_breakdown,
    }
}

/// Income and expense totals per UTC calendar month, oldest first, keeping only the most
/// recent `months` months that have any transactions.
pub fn monthly_totals(transactions: &[Transaction], months: usize) -> Vec<MonthlyTotal> {
    let mut by_month: BTreeMap<(i32, u32), (Decimal, Decimal)> = BTreeMap::new();

    for transaction in transactions {
        let key = (transaction.date.year(), transaction.date.month());
        let (income, expenses) = by_month
            .entry(key)
            .or_insert((Decimal::ZERO, Decimal::ZERO));

        match transaction.transaction_type {
            TransactionType::Income => *income = income.saturating_add(transaction.amount),
            TransactionType::Expense => *expenses = expenses.saturating_add(transaction.amount),
        }
    }

    let skip = by_month.len().saturating_sub(months);

    by_month
        .into_iter()
        .skip(skip)
        .map(|((year, month), (income, expenses))| MonthlyTotal {
            month: format!("{year:04}-{month:02}"),
            income,
            expenses,
        })
        .collect()
}
