use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

use crate::models::category::Category;
use crate::models::transaction::Transaction;

const WARNING_PERCENTAGE: Decimal = Decimal::from_parts(80, 0, 0, false, 0);
const EXCEEDED_PERCENTAGE: Decimal = Decimal::ONE_HUNDRED;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetState {
    Ok,
    Warning,
    Exceeded,
}

impl BudgetState {
    pub fn from_percentage(percentage: Decimal) -> Self {
        if percentage >= EXCEEDED_PERCENTAGE {
            BudgetState::Exceeded
        } else if percentage >= WARNING_PERCENTAGE {
            BudgetState::Warning
        } else {
            BudgetState::Ok
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BudgetStatus {
    pub category: String,
    pub label: String,
    pub icon: String,
    pub color: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub budget: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub spent: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub remaining: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub percentage: Decimal,
    pub status: BudgetState,
}

/// A UTC calendar month, `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MonthWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl MonthWindow {
    pub fn containing(instant: DateTime<Utc>) -> Self {
        let day = instant.date_naive();
        let first = NaiveDate::from_ymd_opt(day.year(), day.month(), 1).unwrap_or(day);
        let next = first
            .checked_add_months(Months::new(1))
            .unwrap_or(NaiveDate::MAX);

        Self {
            start: first.and_time(NaiveTime::MIN).and_utc(),
            end: next.and_time(NaiveTime::MIN).and_utc(),
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }
}

/// Compares this month's expenses against every category that declares a positive budget.
/// Highest percentage first.
pub fn evaluate_budgets(
    transactions: &[Transaction],
    categories: &[Category],
    window: MonthWindow,
) -> Vec<BudgetStatus> {
    let mut spent_by_category: HashMap<&str, Decimal> = HashMap::new();

    for transaction in transactions
        .iter()
        .filter(|t| t.is_expense() && window.contains(t.date))
    {
        let spent = spent_by_category
            .entry(transaction.category.as_str())
            .or_insert(Decimal::ZERO);
        *spent = spent.saturating_add(transaction.amount);
    }

    let mut statuses: Vec<BudgetStatus> = categories
        .iter()
        .filter_map(|category| {
            let budget = category.budget.filter(|b| *b > Decimal::ZERO)?;
            let spent = spent_by_category
                .get(category.id.as_str())
                .copied()
                .unwrap_or(Decimal::ZERO);

            let percentage = spent
                .checked_mul(Decimal::ONE_HUNDRED)
                .and_then(|s| s.checked_div(budget))
                .unwrap_or(Decimal::MAX);

            Some(BudgetStatus {
                category: category.id.clone(),
                label: category.label.clone(),
                icon: category.icon.clone(),
                color: category.color.clone(),
                budget,
                spent,
                remaining: budget.saturating_sub(spent),
                percentage,
                status: BudgetState::from_percentage(percentage),
            })
        })
        .collect();

    statuses.sort_by(|a, b| {
        b.percentage
            .cmp(&a.percentage)
            .then_with(|| a.category.cmp(&b.category))
    });

    statuses
}
