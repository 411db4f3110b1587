use chrono::{DateTime, Utc};
use diesel::{
    dsl, BoolExpressionMethods, Connection, ExpressionMethods, QueryDsl, RunQueryDsl,
    SelectableHelper,
};
use uuid::Uuid;

use crate::db::{CategoryStore, DaoError, PgStore};
use crate::models::category::{
    Category, CategoryChangeset, CategoryPatch, NewCategory, DEFAULT_CATEGORIES,
};

use crate::schema::categories as category_fields;
use crate::schema::categories::dsl::categories;

impl CategoryStore for PgStore {
    fn seed_default_categories(&self, now: DateTime<Utc>) -> Result<bool, DaoError> {
        let defaults: Vec<Category> = DEFAULT_CATEGORIES
            .iter()
            .map(|d| Category::from_default(d, now))
            .collect();
        let new_categories: Vec<NewCategory> = defaults.iter().map(Category::as_new).collect();

        let mut conn = self.conn()?;

        let seeded = conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let count: i64 = categories.count().get_result(conn)?;

            if count > 0 {
                return Ok(false);
            }

            dsl::insert_into(categories)
                .values(&new_categories)
                .execute(conn)?;

            Ok(true)
        });

        match seeded {
            Ok(seeded) => Ok(seeded),
            // Another process seeded the table first
            Err(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            )) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn get_category_rows(&self, user_id: Uuid) -> Result<Vec<Category>, DaoError> {
        let rows = categories
            .select(Category::as_select())
            .filter(
                category_fields::user_id
                    .is_null()
                    .or(category_fields::user_id.eq(user_id)),
            )
            .load(&mut self.conn()?)?;

        Ok(rows)
    }

    fn insert_category(&self, category: &Category) -> Result<(), DaoError> {
        dsl::insert_into(categories)
            .values(&category.as_new())
            .execute(&mut self.conn()?)?;

        Ok(())
    }

    fn update_owned_category(
        &self,
        user_id: Uuid,
        category_id: &str,
        patch: &CategoryPatch,
        now: DateTime<Utc>,
    ) -> Result<Category, DaoError> {
        let changeset = CategoryChangeset::from_patch(patch, now);

        let category = dsl::update(
            categories
                .filter(category_fields::id.eq(category_id))
                .filter(category_fields::user_id.eq(user_id)),
        )
        .set(&changeset)
        .returning(Category::as_returning())
        .get_result(&mut self.conn()?)?;

        Ok(category)
    }

    fn delete_owned_category(&self, user_id: Uuid, category_id: &str) -> Result<(), DaoError> {
        let affected_row_count = diesel::delete(
            categories
                .filter(category_fields::id.eq(category_id))
                .filter(category_fields::user_id.eq(user_id)),
        )
        .execute(&mut self.conn()?)?;

        if affected_row_count == 0 {
            return Err(DaoError::not_found());
        }

        Ok(())
    }
}
