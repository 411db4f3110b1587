use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use std::borrow::Cow;
use std::fmt;

pub const MAX_CATEGORY_ID_LENGTH: usize = 50;
pub const MAX_CATEGORY_LABEL_LENGTH: usize = 50;
pub const MAX_DESCRIPTION_LENGTH: usize = 200;
pub const MAX_NAME_LENGTH: usize = 100;
pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_PASSWORD_LENGTH: usize = 512;

/// Upper bound on a single transaction amount or category budget.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

#[derive(Debug)]
pub enum Validity {
    Valid,
    Invalid(Cow<'static, str>),
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        match &self {
            Validity::Valid => true,
            Validity::Invalid(_) => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationError {
    MissingField(&'static str),
    InvalidField(&'static str, Cow<'static, str>),
}

impl std::error::Error for ValidationError {}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingField(field) => write!(f, "Missing required field '{field}'"),
            ValidationError::InvalidField(field, msg) => write!(f, "Invalid '{field}': {msg}"),
        }
    }
}

pub fn validate_email_address(email: &str) -> Validity {
    if email.chars().count() > 320 {
        return Validity::Invalid(Cow::Borrowed("Email address is too long."));
    }

    for c in email.chars() {
        if c == ' ' || !c.is_ascii() {
            return Validity::Invalid(Cow::Borrowed(
                "Email address cannot contain a space or non-ASCII characters.",
            ));
        }
    }

    if email.contains("@.") {
        return Validity::Invalid(Cow::Borrowed(
            "Domain name in email address cannot begin with a period.",
        ));
    }

    let email = match email.split_once('@') {
        Some(s) => s,
        None => {
            return Validity::Invalid(Cow::Borrowed(
                "Email address must contain an at symbol (@).",
            ))
        }
    };

    if email.0.is_empty() || email.1.len() < 3 {
        return Validity::Invalid(Cow::Borrowed("Email username or domain name is to short."));
    }

    if email.1.contains('@') || !email.1.contains('.') {
        return Validity::Invalid(Cow::Borrowed(
            "Email address must have only one at symbol (@) and the domain must contain a period.",
        ));
    }

    if email.1.ends_with('.') {
        return Validity::Invalid(Cow::Borrowed("Email address cannot end with a period."));
    }

    Validity::Valid
}

pub fn validate_amount(amount: Decimal) -> Result<Decimal, ValidationError> {
    if amount < Decimal::new(1, 2) {
        return Err(ValidationError::InvalidField(
            "amount",
            Cow::Borrowed("must be at least 0.01"),
        ));
    }

    if amount > MAX_AMOUNT {
        return Err(ValidationError::InvalidField(
            "amount",
            Cow::Owned(format!("cannot be greater than {MAX_AMOUNT}")),
        ));
    }

    Ok(amount.normalize())
}

/// Trims and lowercases a category identifier.
pub fn normalize_category_id(
    field: &'static str,
    category_id: &str,
) -> Result<String, ValidationError> {
    let category_id = category_id.trim().to_lowercase();

    if category_id.is_empty() {
        return Err(ValidationError::MissingField(field));
    }

    if category_id.chars().count() > MAX_CATEGORY_ID_LENGTH {
        return Err(ValidationError::InvalidField(
            field,
            Cow::Owned(format!(
                "cannot be longer than {MAX_CATEGORY_ID_LENGTH} characters"
            )),
        ));
    }

    Ok(category_id)
}

pub fn validate_description(description: &str) -> Result<String, ValidationError> {
    let description = description.trim();

    if description.is_empty() {
        return Err(ValidationError::MissingField("description"));
    }

    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(ValidationError::InvalidField(
            "description",
            Cow::Owned(format!(
                "cannot be longer than {MAX_DESCRIPTION_LENGTH} characters"
            )),
        ));
    }

    Ok(String::from(description))
}

pub fn validate_label(label: &str) -> Result<String, ValidationError> {
    let label = label.trim();

    if label.is_empty() {
        return Err(ValidationError::MissingField("label"));
    }

    if label.chars().count() > MAX_CATEGORY_LABEL_LENGTH {
        return Err(ValidationError::InvalidField(
            "label",
            Cow::Owned(format!(
                "cannot be longer than {MAX_CATEGORY_LABEL_LENGTH} characters"
            )),
        ));
    }

    Ok(String::from(label))
}

pub fn validate_budget(budget: Decimal) -> Result<Decimal, ValidationError> {
    if budget.is_sign_negative() && !budget.is_zero() {
        return Err(ValidationError::InvalidField(
            "budget",
            Cow::Borrowed("cannot be negative"),
        ));
    }

    if budget > MAX_AMOUNT {
        return Err(ValidationError::InvalidField(
            "budget",
            Cow::Owned(format!("cannot be greater than {MAX_AMOUNT}")),
        ));
    }

    Ok(budget.normalize())
}

pub fn validate_name(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::MissingField("name"));
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::InvalidField(
            "name",
            Cow::Owned(format!("cannot be longer than {MAX_NAME_LENGTH} characters")),
        ));
    }

    Ok(String::from(name))
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::MissingField("password"));
    }

    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::InvalidField(
            "password",
            Cow::Owned(format!(
                "must be at least {MIN_PASSWORD_LENGTH} characters"
            )),
        ));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::InvalidField(
            "password",
            Cow::Owned(format!("cannot be longer than {MAX_PASSWORD_LENGTH} bytes")),
        ));
    }

    Ok(())
}

/// A calendar day, or a full instant, as supplied by a client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientDate {
    Day(NaiveDate),
    Instant(DateTime<Utc>),
}

impl ClientDate {
    /// The first instant covered by the value, in UTC.
    pub fn start(&self) -> DateTime<Utc> {
        match self {
            ClientDate::Day(day) => day.and_time(NaiveTime::MIN).and_utc(),
            ClientDate::Instant(instant) => *instant,
        }
    }

    /// The last instant covered by the value, in UTC.
    pub fn end(&self) -> DateTime<Utc> {
        match self {
            ClientDate::Day(day) => match day.and_hms_nano_opt(23, 59, 59, 999_999_999) {
                Some(end) => end.and_utc(),
                None => self.start(),
            },
            ClientDate::Instant(instant) => *instant,
        }
    }
}

/// Accepts RFC 3339 timestamps, `YYYY-MM-DDTHH:MM[:SS]` (read as UTC) and `YYYY-MM-DD`.
pub fn parse_client_date(field: &'static str, date: &str) -> Result<ClientDate, ValidationError> {
    let date = date.trim();

    if date.is_empty() {
        return Err(ValidationError::MissingField(field));
    }

    if let Ok(instant) = DateTime::parse_from_rfc3339(date) {
        return Ok(ClientDate::Instant(instant.with_timezone(&Utc)));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(date, format) {
            return Ok(ClientDate::Instant(naive.and_utc()));
        }
    }

    if let Ok(day) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        return Ok(ClientDate::Day(day));
    }

    Err(ValidationError::InvalidField(
        field,
        Cow::Borrowed("must be an RFC 3339 timestamp or a YYYY-MM-DD date"),
    ))
}
