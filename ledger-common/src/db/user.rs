use chrono::{DateTime, Utc};
use diesel::{dsl, ExpressionMethods, QueryDsl, RunQueryDsl, SelectableHelper};
use uuid::Uuid;

use crate::db::{DaoError, PgStore, UserStore};
use crate::models::user::{NewUser, User};

use crate::schema::users as user_fields;
use crate::schema::users::dsl::users;

impl UserStore for PgStore {
    fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<User, DaoError> {
        let email_lowercase = email.to_lowercase();

        let new_user = NewUser {
            id: Uuid::now_v7(),
            name,
            email: &email_lowercase,
            password_hash,
            created_timestamp: now,
        };

        let user = dsl::insert_into(users)
            .values(&new_user)
            .returning(User::as_returning())
            .get_result(&mut self.conn()?)?;

        Ok(user)
    }

    fn get_user(&self, user_id: Uuid) -> Result<User, DaoError> {
        let user = users
            .select(User::as_select())
            .find(user_id)
            .first(&mut self.conn()?)?;

        Ok(user)
    }

    fn get_user_by_email(&self, email: &str) -> Result<User, DaoError> {
        let user = users
            .select(User::as_select())
            .filter(user_fields::email.eq(email.to_lowercase()))
            .first(&mut self.conn()?)?;

        Ok(user)
    }
}
