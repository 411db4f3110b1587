use chrono::{DateTime, Utc};
use diesel::{dsl, ExpressionMethods, QueryDsl, RunQueryDsl, SelectableHelper};
use uuid::Uuid;

use crate::db::{DaoError, PgStore, TransactionStore};
use crate::models::transaction::{
    NewTransaction, Transaction, TransactionChangeset, TransactionFields, TransactionPatch,
};

use crate::schema::transactions as transaction_fields;
use crate::schema::transactions::dsl::transactions;

impl TransactionStore for PgStore {
    fn create_transaction(
        &self,
        user_id: Uuid,
        fields: &TransactionFields,
        now: DateTime<Utc>,
    ) -> Result<Transaction, DaoError> {
        let new_transaction = NewTransaction {
            id: Uuid::now_v7(),
            user_id,
            transaction_type: fields.transaction_type,
            amount: fields.amount,
            category: &fields.category,
            description: &fields.description,
            date: fields.date,
            created_timestamp: now,
            modified_timestamp: now,
        };

        let transaction = dsl::insert_into(transactions)
            .values(&new_transaction)
            .returning(Transaction::as_returning())
            .get_result(&mut self.conn()?)?;

        Ok(transaction)
    }

    fn get_transactions(&self, user_id: Uuid) -> Result<Vec<Transaction>, DaoError> {
        let loaded = transactions
            .select(Transaction::as_select())
            .filter(transaction_fields::user_id.eq(user_id))
            .order((
                transaction_fields::date.desc(),
                transaction_fields::created_timestamp.asc(),
                transaction_fields::id.asc(),
            ))
            .load(&mut self.conn()?)?;

        Ok(loaded)
    }

    fn get_transaction(
        &self,
        user_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<Transaction, DaoError> {
        let transaction = transactions
            .select(Transaction::as_select())
            .filter(transaction_fields::id.eq(transaction_id))
            .filter(transaction_fields::user_id.eq(user_id))
            .first(&mut self.conn()?)?;

        Ok(transaction)
    }

    fn update_transaction(
        &self,
        user_id: Uuid,
        transaction_id: Uuid,
        patch: &TransactionPatch,
        now: DateTime<Utc>,
    ) -> Result<Transaction, DaoError> {
        let changeset = TransactionChangeset::from_patch(patch, now);

        let transaction = dsl::update(
            transactions
                .filter(transaction_fields::id.eq(transaction_id))
                .filter(transaction_fields::user_id.eq(user_id)),
        )
        .set(&changeset)
        .returning(Transaction::as_returning())
        .get_result(&mut self.conn()?)?;

        Ok(transaction)
    }

    fn delete_transaction(&self, user_id: Uuid, transaction_id: Uuid) -> Result<(), DaoError> {
        let affected_row_count = diesel::delete(
            transactions
                .filter(transaction_fields::id.eq(transaction_id))
                .filter(transaction_fields::user_id.eq(user_id)),
        )
        .execute(&mut self.conn()?)?;

        if affected_row_count == 0 {
            return Err(DaoError::not_found());
        }

        Ok(())
    }
}
