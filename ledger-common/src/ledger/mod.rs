//! Operations behind the HTTP surface. Every function takes the store it works against and
//! the id of the authenticated owner; records belonging to anyone else are reported as
//! missing.

use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::fmt;
use uuid::Uuid;

use crate::db::{CategoryStore, DaoError, TransactionStore, UserStore};
use crate::models::category::{resolve_visible, Category};
use crate::models::transaction::Transaction;
use crate::models::user::User;
use crate::query::{self, BudgetStatus, MonthWindow, MonthlyTotal, Summary, TransactionFilter};
use crate::request_io::{InputCategory, InputCategoryPatch, InputTransaction, InputUser};
use crate::validators::{self, ValidationError, Validity};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
    User,
    Transaction,
    Category,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::User => write!(f, "User"),
            Resource::Transaction => write!(f, "Transaction"),
            Resource::Category => write!(f, "Category"),
        }
    }
}

#[derive(Debug)]
pub enum LedgerError {
    Validation(ValidationError),
    NotFound(Resource),
    Conflict(Cow<'static, str>),
    Store(DaoError),
}

impl std::error::Error for LedgerError {}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::Validation(e) => write!(f, "LedgerError: {e}"),
            LedgerError::NotFound(resource) => write!(f, "LedgerError: {resource} not found"),
            LedgerError::Conflict(msg) => write!(f, "LedgerError: Conflict: {msg}"),
            LedgerError::Store(e) => write!(f, "LedgerError: {e}"),
        }
    }
}

impl From<ValidationError> for LedgerError {
    fn from(error: ValidationError) -> Self {
        LedgerError::Validation(error)
    }
}

impl From<DaoError> for LedgerError {
    fn from(error: DaoError) -> Self {
        LedgerError::Store(error)
    }
}

fn or_not_found(resource: Resource) -> impl FnOnce(DaoError) -> LedgerError {
    move |e| {
        if e.is_not_found() {
            LedgerError::NotFound(resource)
        } else {
            LedgerError::Store(e)
        }
    }
}

pub fn list_transactions<S>(
    store: &S,
    owner: Uuid,
    filter: &TransactionFilter,
) -> Result<Vec<Transaction>, LedgerError>
where
    S: TransactionStore + ?Sized,
{
    Ok(filter.apply(store.get_transactions(owner)?))
}

pub fn get_transaction<S>(
    store: &S,
    owner: Uuid,
    transaction_id: Uuid,
) -> Result<Transaction, LedgerError>
where
    S: TransactionStore + ?Sized,
{
    store
        .get_transaction(owner, transaction_id)
        .map_err(or_not_found(Resource::Transaction))
}

/// Validates `input` in full before anything is written.
pub fn create_transaction<S>(
    store: &S,
    owner: Uuid,
    input: &InputTransaction,
    now: DateTime<Utc>,
) -> Result<Transaction, LedgerError>
where
    S: TransactionStore + ?Sized,
{
    let fields = input.to_fields(now)?;
    Ok(store.create_transaction(owner, &fields, now)?)
}

/// Applies the fields present in `input`; absent fields keep their stored values.
pub fn update_transaction<S>(
    store: &S,
    owner: Uuid,
    transaction_id: Uuid,
    input: &InputTransaction,
    now: DateTime<Utc>,
) -> Result<Transaction, LedgerError>
where
    S: TransactionStore + ?Sized,
{
    let patch = input.to_patch()?;

    store
        .update_transaction(owner, transaction_id, &patch, now)
        .map_err(or_not_found(Resource::Transaction))
}

pub fn delete_transaction<S>(store: &S, owner: Uuid, transaction_id: Uuid) -> Result<(), LedgerError>
where
    S: TransactionStore + ?Sized,
{
    store
        .delete_transaction(owner, transaction_id)
        .map_err(or_not_found(Resource::Transaction))
}

pub fn compute_summary<S>(store: &S, owner: Uuid) -> Result<Summary, LedgerError>
where
    S: TransactionStore + CategoryStore + ?Sized,
{
    let transactions = store.get_transactions(owner)?;
    let categories = list_categories(store, owner)?;

    Ok(query::summarize(&transactions, &categories))
}

pub fn monthly_trend<S>(store: &S, owner: Uuid, months: u32) -> Result<Vec<MonthlyTotal>, LedgerError>
where
    S: TransactionStore + ?Sized,
{
    let transactions = store.get_transactions(owner)?;
    Ok(query::monthly_totals(&transactions, months as usize))
}

/// Budget standing for the UTC calendar month containing `now`.
pub fn evaluate_budgets<S>(
    store: &S,
    owner: Uuid,
    now: DateTime<Utc>,
) -> Result<Vec<BudgetStatus>, LedgerError>
where
    S: TransactionStore + CategoryStore + ?Sized,
{
    let transactions = store.get_transactions(owner)?;
    let categories = list_categories(store, owner)?;

    Ok(query::evaluate_budgets(
        &transactions,
        &categories,
        MonthWindow::containing(now),
    ))
}

pub fn list_categories<S>(store: &S, owner: Uuid) -> Result<Vec<Category>, LedgerError>
where
    S: CategoryStore + ?Sized,
{
    Ok(resolve_visible(store.get_category_rows(owner)?, owner))
}

pub fn get_category<S>(store: &S, owner: Uuid, category_id: &str) -> Result<Category, LedgerError>
where
    S: CategoryStore + ?Sized,
{
    let category_id = validators::normalize_category_id("id", category_id)?;

    list_categories(store, owner)?
        .into_iter()
        .find(|c| c.id == category_id)
        .ok_or(LedgerError::NotFound(Resource::Category))
}

/// Creates a category owned by `owner`. An id already visible to the owner, including the
/// id of a default category, is a conflict.
pub fn create_category<S>(
    store: &S,
    owner: Uuid,
    input: &InputCategory,
    now: DateTime<Utc>,
) -> Result<Category, LedgerError>
where
    S: CategoryStore + ?Sized,
{
    let fields = input.to_fields()?;

    if list_categories(store, owner)?
        .iter()
        .any(|c| c.id == fields.id)
    {
        return Err(category_conflict(&fields.id));
    }

    let category = Category::new_owned(owner, &fields, now);

    match store.insert_category(&category) {
        Ok(()) => Ok(category),
        Err(e) if e.is_unique_violation() => Err(category_conflict(&fields.id)),
        Err(e) => Err(e.into()),
    }
}

/// Updates one of the owner's categories. Updating a default category stores an override
/// owned by `owner`, leaving the default untouched for everyone else.
pub fn update_category<S>(
    store: &S,
    owner: Uuid,
    category_id: &str,
    input: &InputCategoryPatch,
    now: DateTime<Utc>,
) -> Result<Category, LedgerError>
where
    S: CategoryStore + ?Sized,
{
    let category_id = validators::normalize_category_id("id", category_id)?;
    let patch = input.to_patch()?;

    match store.update_owned_category(owner, &category_id, &patch, now) {
        Ok(category) => return Ok(category),
        Err(e) if e.is_not_found() => (),
        Err(e) => return Err(e.into()),
    }

    let global = store
        .get_category_rows(owner)?
        .into_iter()
        .find(|c| c.id == category_id && c.user_id.is_none())
        .ok_or(LedgerError::NotFound(Resource::Category))?;

    let overridden = global.override_for(owner, &patch, now);

    match store.insert_category(&overridden) {
        Ok(()) => Ok(overridden),
        // A concurrent request created the override first
        Err(e) if e.is_unique_violation() => store
            .update_owned_category(owner, &category_id, &patch, now)
            .map_err(or_not_found(Resource::Category)),
        Err(e) => Err(e.into()),
    }
}

/// Deletes one of the owner's categories. Removing an override reverts to the default;
/// defaults themselves cannot be deleted. Transactions are left as they are.
pub fn delete_category<S>(store: &S, owner: Uuid, category_id: &str) -> Result<(), LedgerError>
where
    S: CategoryStore + ?Sized,
{
    let category_id = validators::normalize_category_id("id", category_id)?;

    store
        .delete_owned_category(owner, &category_id)
        .map_err(or_not_found(Resource::Category))
}

/// `password_hash` must already be computed; `input.password` is not read.
pub fn register_user<S>(
    store: &S,
    input: &InputUser,
    password_hash: &str,
    now: DateTime<Utc>,
) -> Result<User, LedgerError>
where
    S: UserStore + ?Sized,
{
    let name = validators::validate_name(&input.name)?;
    let email = input.email.trim();

    if let Validity::Invalid(msg) = validators::validate_email_address(email) {
        return Err(ValidationError::InvalidField("email", msg).into());
    }

    match store.create_user(&name, email, password_hash, now) {
        Ok(user) => Ok(user),
        Err(e) if e.is_unique_violation() => Err(LedgerError::Conflict(Cow::Borrowed(
            "A user with this email address already exists",
        ))),
        Err(e) => Err(e.into()),
    }
}

pub fn find_user_by_email<S>(store: &S, email: &str) -> Result<User, LedgerError>
where
    S: UserStore + ?Sized,
{
    store
        .get_user_by_email(email.trim())
        .map_err(or_not_found(Resource::User))
}

pub fn get_user<S>(store: &S, user_id: Uuid) -> Result<User, LedgerError>
where
    S: UserStore + ?Sized,
{
    store.get_user(user_id).map_err(or_not_found(Resource::User))
}

fn category_conflict(category_id: &str) -> LedgerError {
    LedgerError::Conflict(Cow::Owned(format!(
        "A category with id '{category_id}' already exists"
    )))
}
