use chrono::{DateTime, Utc};
use std::cmp::Ordering;

use crate::models::transaction::{Transaction, TransactionType};

/// Criteria for narrowing a user's transactions. Every `None` field is a wildcard.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    pub transaction_type: Option<TransactionType>,
    pub category: Option<String>,
    search_term: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TransactionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, transaction_type: TransactionType) -> Self {
        self.transaction_type = Some(transaction_type);
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_lowercase());
        self
    }

    /// An empty search term is a wildcard.
    pub fn with_search_term(mut self, search_term: &str) -> Self {
        self.search_term = if search_term.is_empty() {
            None
        } else {
            Some(search_term.to_lowercase())
        };
        self
    }

    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search_term.as_deref()
    }

    pub fn matches(&self, transaction: &Transaction) -> bool {
        if let Some(transaction_type) = self.transaction_type {
            if transaction.transaction_type != transaction_type {
                return false;
            }
        }

        if let Some(category) = &self.category {
            if &transaction.category != category {
                return false;
            }
        }

        if let Some(search_term) = &self.search_term {
            if !transaction
                .description
                .to_lowercase()
                .contains(search_term.as_str())
            {
                return false;
            }
        }

        if let Some(start) = self.start {
            if transaction.date < start {
                return false;
            }
        }

        if let Some(end) = self.end {
            if transaction.date > end {
                return false;
            }
        }

        true
    }

    /// Keeps the matching transactions and puts them in display order.
    pub fn apply(&self, transactions: Vec<Transaction>) -> Vec<Transaction> {
        let mut matching: Vec<Transaction> = transactions
            .into_iter()
            .filter(|t| self.matches(t))
            .collect();

        sort_for_display(&mut matching);
        matching
    }
}

/// Most recent first. Transactions sharing a date keep the order they were recorded in.
pub fn sort_for_display(transactions: &mut [Transaction]) {
    transactions.sort_by(display_order);
}

fn display_order(a: &Transaction, b: &Transaction) -> Ordering {
    b.date
        .cmp(&a.date)
        .then_with(|| a.created_timestamp.cmp(&b.created_timestamp))
        .then_with(|| a.id.cmp(&b.id))
}
