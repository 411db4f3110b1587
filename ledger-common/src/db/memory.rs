use chrono::{DateTime, Utc};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::db::{CategoryStore, DaoError, TransactionStore, UserStore};
use crate::models::category::{Category, CategoryPatch, DEFAULT_CATEGORIES};
use crate::models::transaction::{Transaction, TransactionFields, TransactionPatch};
use crate::models::user::User;

#[derive(Default)]
struct Tables {
    transactions: Vec<Transaction>,
    categories: Vec<Category>,
    users: Vec<User>,
}

/// Process-local store with the same ownership and uniqueness rules as the PostgreSQL
/// schema. Contents are lost when the process exits.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TransactionStore for MemoryStore {
    fn create_transaction(
        &self,
        user_id: Uuid,
        fields: &TransactionFields,
        now: DateTime<Utc>,
    ) -> Result<Transaction, DaoError> {
        let transaction = Transaction::new(Uuid::now_v7(), user_id, fields, now);
        self.write().transactions.push(transaction.clone());
        Ok(transaction)
    }

    fn get_transactions(&self, user_id: Uuid) -> Result<Vec<Transaction>, DaoError> {
        Ok(self
            .read()
            .transactions
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    fn get_transaction(
        &self,
        user_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<Transaction, DaoError> {
        self.read()
            .transactions
            .iter()
            .find(|t| t.id == transaction_id && t.user_id == user_id)
            .cloned()
            .ok_or_else(DaoError::not_found)
    }

    fn update_transaction(
        &self,
        user_id: Uuid,
        transaction_id: Uuid,
        patch: &TransactionPatch,
        now: DateTime<Utc>,
    ) -> Result<Transaction, DaoError> {
        let mut tables = self.write();
        let transaction = tables
            .transactions
            .iter_mut()
            .find(|t| t.id == transaction_id && t.user_id == user_id)
            .ok_or_else(DaoError::not_found)?;

        transaction.apply_patch(patch, now);
        Ok(transaction.clone())
    }

    fn delete_transaction(&self, user_id: Uuid, transaction_id: Uuid) -> Result<(), DaoError> {
        let mut tables = self.write();
        let position = tables
            .transactions
            .iter()
            .position(|t| t.id == transaction_id && t.user_id == user_id)
            .ok_or_else(DaoError::not_found)?;

        tables.transactions.remove(position);
        Ok(())
    }
}

impl CategoryStore for MemoryStore {
    fn seed_default_categories(&self, now: DateTime<Utc>) -> Result<bool, DaoError> {
        let mut tables = self.write();

        if !tables.categories.is_empty() {
            return Ok(false);
        }

        tables.categories.extend(
            DEFAULT_CATEGORIES
                .iter()
                .map(|d| Category::from_default(d, now)),
        );

        Ok(true)
    }

    fn get_category_rows(&self, user_id: Uuid) -> Result<Vec<Category>, DaoError> {
        Ok(self
            .read()
            .categories
            .iter()
            .filter(|c| c.user_id.is_none() || c.user_id == Some(user_id))
            .cloned()
            .collect())
    }

    fn insert_category(&self, category: &Category) -> Result<(), DaoError> {
        let mut tables = self.write();

        if tables
            .categories
            .iter()
            .any(|c| c.user_id == category.user_id && c.id == category.id)
        {
            return Err(DaoError::unique_violation(
                "duplicate key value violates unique constraint on (user_id, id)",
            ));
        }

        tables.categories.push(category.clone());
        Ok(())
    }

    fn update_owned_category(
        &self,
        user_id: Uuid,
        category_id: &str,
        patch: &CategoryPatch,
        now: DateTime<Utc>,
    ) -> Result<Category, DaoError> {
        let mut tables = self.write();
        let category = tables
            .categories
            .iter_mut()
            .find(|c| c.id == category_id && c.user_id == Some(user_id))
            .ok_or_else(DaoError::not_found)?;

        category.apply_patch(patch, now);
        Ok(category.clone())
    }

    fn delete_owned_category(&self, user_id: Uuid, category_id: &str) -> Result<(), DaoError> {
        let mut tables = self.write();
        let position = tables
            .categories
            .iter()
            .position(|c| c.id == category_id && c.user_id == Some(user_id))
            .ok_or_else(DaoError::not_found)?;

        tables.categories.remove(position);
        Ok(())
    }
}

impl UserStore for MemoryStore {
    fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<User, DaoError> {
        let email = email.to_lowercase();
        let mut tables = self.write();

        if tables.users.iter().any(|u| u.email == email) {
            return Err(DaoError::unique_violation(
                "duplicate key value violates unique constraint on (email)",
            ));
        }

        let user = User {
            id: Uuid::now_v7(),
            name: String::from(name),
            email,
            password_hash: String::from(password_hash),
            created_timestamp: now,
        };

        tables.users.push(user.clone());
        Ok(user)
    }

    fn get_user(&self, user_id: Uuid) -> Result<User, DaoError> {
        self.read()
            .users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or_else(DaoError::not_found)
    }

    fn get_user_by_email(&self, email: &str) -> Result<User, DaoError> {
        let email = email.to_lowercase();

        self.read()
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(DaoError::not_found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rust_decimal_macros::dec;

    use crate::models::transaction::TransactionType;

    fn fields() -> TransactionFields {
        TransactionFields {
            transaction_type: TransactionType::Expense,
            amount: dec!(50),
            category: String::from("food"),
            description: String::from("Groceries"),
            date: Utc::now(),
        }
    }

    #[test]
    fn test_foreign_transaction_is_not_found() {
        let store = MemoryStore::new();
        let owner = Uuid::now_v7();
        let intruder = Uuid::now_v7();

        let owned = store.create_transaction(owner, &fields(), Utc::now()).unwrap();
        let intruders_own = store
            .create_transaction(intruder, &fields(), Utc::now())
            .unwrap();

        assert!(store
            .delete_transaction(intruder, owned.id)
            .unwrap_err()
            .is_not_found());
        assert!(store
            .update_transaction(intruder, owned.id, &TransactionPatch::default(), Utc::now())
            .unwrap_err()
            .is_not_found());

        assert_eq!(store.get_transactions(owner).unwrap(), vec![owned]);
        assert_eq!(store.get_transactions(intruder).unwrap(), vec![intruders_own]);
    }

    #[test]
    fn test_seed_only_when_empty() {
        let store = MemoryStore::new();

        assert!(store.seed_default_categories(Utc::now()).unwrap());
        assert!(!store.seed_default_categories(Utc::now()).unwrap());

        let rows = store.get_category_rows(Uuid::now_v7()).unwrap();
        assert_eq!(rows.len(), DEFAULT_CATEGORIES.len());
        assert!(rows.iter().all(|c| c.is_default && c.user_id.is_none()));
    }

    #[test]
    fn test_category_uniqueness_is_per_owner() {
        let store = MemoryStore::new();
        store.seed_default_categories(Utc::now()).unwrap();

        let user_id = Uuid::now_v7();
        let global_food = store
            .get_category_rows(user_id)
            .unwrap()
            .into_iter()
            .find(|c| c.id == "food")
            .unwrap();

        let patch = CategoryPatch::default();
        store
            .insert_category(&global_food.override_for(user_id, &patch, Utc::now()))
            .unwrap();

        let duplicate =
            store.insert_category(&global_food.override_for(user_id, &patch, Utc::now()));
        assert!(duplicate.unwrap_err().is_unique_violation());

        let other_user_id = Uuid::now_v7();
        store
            .insert_category(&global_food.override_for(other_user_id, &patch, Utc::now()))
            .unwrap();

        assert_eq!(
            store.get_category_rows(user_id).unwrap().len(),
            DEFAULT_CATEGORIES.len() + 1
        );
    }

    #[test]
    fn test_user_email_is_case_insensitive() {
        let store = MemoryStore::new();

        let user = store
            .create_user("Ada", "Ada@Example.com", "hash", Utc::now())
            .unwrap();
        assert_eq!(user.email, "ada@example.com");

        assert_eq!(
            store.get_user_by_email("ADA@example.COM").unwrap().id,
            user.id
        );
        assert!(store
            .create_user("Ada again", "ada@example.com", "hash", Utc::now())
            .unwrap_err()
            .is_unique_violation());
    }
}
