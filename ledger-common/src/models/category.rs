use chrono::{DateTime, Utc};
use diesel::{AsChangeset, Insertable, Queryable, Selectable};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::schema::categories;

pub const DEFAULT_ICON: &str = "Tag";
pub const DEFAULT_COLOR: &str = "#6366f1";

pub struct DefaultCategory {
    pub id: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
}

pub const DEFAULT_CATEGORIES: [DefaultCategory; 8] = [
    DefaultCategory {
        id: "food",
        label: "Food & Dining",
        icon: "Utensils",
        color: "#f97316",
    },
    DefaultCategory {
        id: "transport",
        label: "Transport",
        icon: "Car",
        color: "#3b82f6",
    },
    DefaultCategory {
        id: "shopping",
        label: "Shopping",
        icon: "ShoppingBag",
        color: "#ec4899",
    },
    DefaultCategory {
        id: "entertainment",
        label: "Entertainment",
        icon: "Clapperboard",
        color: "#8b5cf6",
    },
    DefaultCategory {
        id: "bills",
        label: "Bills & Utilities",
        icon: "Receipt",
        color: "#ef4444",
    },
    DefaultCategory {
        id: "health",
        label: "Health",
        icon: "Heart",
        color: "#22c55e",
    },
    DefaultCategory {
        id: "income",
        label: "Income",
        icon: "Wallet",
        color: "#22c55e",
    },
    DefaultCategory {
        id: "other",
        label: "Other",
        icon: "Package",
        color: "#64748b",
    },
];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Category {
    #[serde(skip_serializing, default)]
    pub row_id: Uuid,
    #[serde(rename = "userId")]
    pub user_id: Option<Uuid>,
    pub id: String,
    pub label: String,
    pub icon: String,
    pub color: String,
    #[serde(rename = "isDefault")]
    pub is_default: bool,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub budget: Option<Decimal>,
    #[serde(rename = "createdAt")]
    pub created_timestamp: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub modified_timestamp: DateTime<Utc>,
}

impl Category {
    pub fn from_default(default: &DefaultCategory, now: DateTime<Utc>) -> Self {
        Self {
            row_id: Uuid::now_v7(),
            user_id: None,
            id: String::from(default.id),
            label: String::from(default.label),
            icon: String::from(default.icon),
            color: String::from(default.color),
            is_default: true,
            budget: None,
            created_timestamp: now,
            modified_timestamp: now,
        }
    }

    pub fn new_owned(user_id: Uuid, fields: &CategoryFields, now: DateTime<Utc>) -> Self {
        Self {
            row_id: Uuid::now_v7(),
            user_id: Some(user_id),
            id: fields.id.clone(),
            label: fields.label.clone(),
            icon: fields.icon.clone(),
            color: fields.color.clone(),
            is_default: false,
            budget: fields.budget,
            created_timestamp: now,
            modified_timestamp: now,
        }
    }

    /// An owner-scoped copy of a global category with `patch` applied on top.
    pub fn override_for(&self, user_id: Uuid, patch: &CategoryPatch, now: DateTime<Utc>) -> Self {
        let mut overridden = Self {
            row_id: Uuid::now_v7(),
            user_id: Some(user_id),
            id: self.id.clone(),
            label: self.label.clone(),
            icon: self.icon.clone(),
            color: self.color.clone(),
            is_default: self.is_default,
            budget: self.budget,
            created_timestamp: now,
            modified_timestamp: now,
        };

        overridden.apply_patch(patch, now);
        overridden
    }

    pub fn apply_patch(&mut self, patch: &CategoryPatch, now: DateTime<Utc>) {
        if let Some(label) = &patch.label {
            self.label.clone_from(label);
        }

        if let Some(icon) = &patch.icon {
            self.icon.clone_from(icon);
        }

        if let Some(color) = &patch.color {
            self.color.clone_from(color);
        }

        if let Some(budget) = patch.budget {
            self.budget = budget;
        }

        self.modified_timestamp = now;
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == Some(user_id)
    }

    pub fn as_new(&self) -> NewCategory<'_> {
        NewCategory {
            row_id: self.row_id,
            user_id: self.user_id,
            id: &self.id,
            label: &self.label,
            icon: &self.icon,
            color: &self.color,
            is_default: self.is_default,
            budget: self.budget,
            created_timestamp: self.created_timestamp,
            modified_timestamp: self.modified_timestamp,
        }
    }
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name = categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewCategory<'a> {
    pub row_id: Uuid,
    pub user_id: Option<Uuid>,
    pub id: &'a str,
    pub label: &'a str,
    pub icon: &'a str,
    pub color: &'a str,
    pub is_default: bool,
    pub budget: Option<Decimal>,
    pub created_timestamp: DateTime<Utc>,
    pub modified_timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, AsChangeset)]
#[diesel(table_name = categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CategoryChangeset<'a> {
    pub label: Option<&'a str>,
    pub icon: Option<&'a str>,
    pub color: Option<&'a str>,
    pub budget: Option<Option<Decimal>>,
    pub modified_timestamp: DateTime<Utc>,
}

impl<'a> CategoryChangeset<'a> {
    pub fn from_patch(patch: &'a CategoryPatch, now: DateTime<Utc>) -> Self {
        Self {
            label: patch.label.as_deref(),
            icon: patch.icon.as_deref(),
            color: patch.color.as_deref(),
            budget: patch.budget,
            modified_timestamp: now,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CategoryFields {
    pub id: String,
    pub label: String,
    pub icon: String,
    pub color: String,
    pub budget: Option<Decimal>,
}

/// `budget: Some(None)` clears the budget; `None` leaves it untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CategoryPatch {
    pub label: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub budget: Option<Option<Decimal>>,
}

/// Collapses the raw rows visible to a user into one category per id. A row owned by the
/// user shadows a global row with the same id. Sorted defaults first, then by label.
pub fn resolve_visible(rows: Vec<Category>, user_id: Uuid) -> Vec<Category> {
    let mut by_id: HashMap<String, Category> = HashMap::with_capacity(rows.len());

    for row in rows {
        if row.user_id.is_some() && !row.is_owned_by(user_id) {
            continue;
        }

        match by_id.get(&row.id) {
            Some(existing) if existing.is_owned_by(user_id) => (),
            _ => {
                by_id.insert(row.id.clone(), row);
            }
        }
    }

    let mut visible: Vec<Category> = by_id.into_values().collect();
    visible.sort_by(|a, b| {
        b.is_default
            .cmp(&a.is_default)
            .then_with(|| a.label.cmp(&b.label))
            .then_with(|| a.id.cmp(&b.id))
    });

    visible
}

#[cfg(test)]
mod tests {
    use super::*;

    use rust_decimal_macros::dec;

    fn globals(now: DateTime<Utc>) -> Vec<Category> {
        DEFAULT_CATEGORIES
            .iter()
            .map(|d| Category::from_default(d, now))
            .collect()
    }

    #[test]
    fn test_resolve_visible_orders_defaults_by_label() {
        let now = Utc::now();
        let user_id = Uuid::now_v7();

        let custom = Category::new_owned(
            user_id,
            &CategoryFields {
                id: String::from("pets"),
                label: String::from("Animals"),
                icon: String::from(DEFAULT_ICON),
                color: String::from(DEFAULT_COLOR),
                budget: None,
            },
            now,
        );

        let mut rows = globals(now);
        rows.push(custom);

        let visible = resolve_visible(rows, user_id);
        let labels: Vec<&str> = visible.iter().map(|c| c.label.as_str()).collect();

        assert_eq!(
            labels,
            vec![
                "Bills & Utilities",
                "Entertainment",
                "Food & Dining",
                "Health",
                "Income",
                "Other",
                "Shopping",
                "Transport",
                "Animals",
            ]
        );
    }

    #[test]
    fn test_resolve_visible_owned_row_shadows_global() {
        let now = Utc::now();
        let user_id = Uuid::now_v7();
        let other_user_id = Uuid::now_v7();

        let rows = globals(now);
        let food = rows.iter().find(|c| c.id == "food").unwrap().clone();

        let patch = CategoryPatch {
            budget: Some(Some(dec!(100))),
            ..Default::default()
        };

        let mine = food.override_for(user_id, &patch, now);
        let theirs = food.override_for(
            other_user_id,
            &CategoryPatch {
                budget: Some(Some(dec!(5))),
                ..Default::default()
            },
            now,
        );

        let mut all_rows = rows;
        all_rows.push(theirs);
        all_rows.push(mine);

        let visible = resolve_visible(all_rows, user_id);
        let food = visible.iter().find(|c| c.id == "food").unwrap();

        assert_eq!(visible.len(), DEFAULT_CATEGORIES.len());
        assert_eq!(food.user_id, Some(user_id));
        assert_eq!(food.budget, Some(dec!(100)));
        assert!(food.is_default);
        assert_eq!(food.label, "Food & Dining");
    }

    #[test]
    fn test_apply_patch_clears_budget() {
        let now = Utc::now();
        let mut category = Category::from_default(&DEFAULT_CATEGORIES[0], now);
        category.budget = Some(dec!(250));

        category.apply_patch(
            &CategoryPatch {
                budget: Some(None),
                ..Default::default()
            },
            now,
        );
        assert_eq!(category.budget, None);

        category.apply_patch(
            &CategoryPatch {
                label: Some(String::from("Groceries")),
                ..Default::default()
            },
            now,
        );
        assert_eq!(category.label, "Groceries");
        assert_eq!(category.icon, "Utensils");
        assert_eq!(category.budget, None);
    }
}
