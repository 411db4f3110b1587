//! Pure computations over a snapshot of one user's transactions. Nothing in here performs
//! I/O or fails; inputs are expected to have been validated on the way into the store.

pub mod budget;
pub mod filter;
pub mod summary;

pub use budget::{evaluate_budgets, BudgetState, BudgetStatus, MonthWindow};
pub use filter::{sort_for_display, TransactionFilter};
pub use summary::{monthly_totals, summarize, CategoryTotal, MonthlyTotal, Summary};

#[cfg(test)]
pub(crate) mod test_utils {
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use crate::models::transaction::{Transaction, TransactionFields, TransactionType};

    pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    pub fn transaction(
        transaction_type: TransactionType,
        amount: Decimal,
        category: &str,
        date: DateTime<Utc>,
    ) -> Transaction {
        let fields = TransactionFields {
            transaction_type,
            amount,
            category: String::from(category),
            description: format!("{transaction_type} in {category}"),
            date,
        };

        Transaction::new(Uuid::now_v7(), Uuid::nil(), &fields, Utc::now())
    }

    pub fn expense(amount: Decimal, category: &str, date: DateTime<Utc>) -> Transaction {
        transaction(TransactionType::Expense, amount, category, date)
    }

    pub fn income(amount: Decimal, category: &str, date: DateTime<Utc>) -> Transaction {
        transaction(TransactionType::Income, amount, category, date)
    }
}
