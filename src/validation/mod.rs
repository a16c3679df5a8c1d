use bigdecimal::BigDecimal;
use std::fmt;

pub const EMAIL_MAX_LEN: usize = 254;
pub const PHONE_NUMBER_MAX_LEN: usize = 32;
pub const NUMBER_TYPE_MAX_LEN: usize = 40;
pub const API_URL_MAX_LEN: usize = 512;
pub const UID_MAX_LEN: usize = 128;
pub const AMOUNT_MAX: i64 = 1_000_000;
pub const UPLOAD_BATCH_MAX: usize = 1_000;
pub const BULK_BUY_MAX: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub fn sanitize_string(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.len() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

/// Lowercased, trimmed form of the address. Email uniqueness keys off this.
pub fn normalize_email(value: &str) -> String {
    sanitize_string(value).to_lowercase()
}

pub fn validate_email(field: &'static str, value: &str) -> ValidationResult {
    let value = normalize_email(value);
    validate_required(field, &value)?;
    validate_max_len(field, &value, EMAIL_MAX_LEN)?;

    if value.chars().any(|ch| ch.is_whitespace()) {
        return Err(ValidationError::new(field, "must not contain whitespace"));
    }

    let mut parts = value.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();

    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(ValidationError::new(field, "must be a valid email address"));
    }

    Ok(())
}

pub fn validate_phone_number(field: &'static str, value: &str) -> ValidationResult {
    let value = sanitize_string(value);
    validate_required(field, &value)?;
    validate_max_len(field, &value, PHONE_NUMBER_MAX_LEN)?;

    if !value
        .chars()
        .all(|ch| ch.is_ascii_digit() || matches!(ch, '+' | '-' | '(' | ')' | ' '))
    {
        return Err(ValidationError::new(
            field,
            "must contain only digits, spaces and + - ( )",
        ));
    }

    if !value.chars().any(|ch| ch.is_ascii_digit()) {
        return Err(ValidationError::new(
            field,
            "must contain at least one digit",
        ));
    }

    Ok(())
}

pub fn validate_uid(field: &'static str, value: &str) -> ValidationResult {
    validate_required(field, value)?;
    validate_max_len(field, value, UID_MAX_LEN)?;

    if value.chars().any(|ch| ch.is_whitespace() || ch.is_control()) {
        return Err(ValidationError::new(field, "must not contain whitespace"));
    }

    Ok(())
}

pub fn validate_positive_amount(field: &'static str, amount: &BigDecimal) -> ValidationResult {
    if amount <= &BigDecimal::from(0) {
        return Err(ValidationError::new(field, "must be greater than zero"));
    }

    if amount > &BigDecimal::from(AMOUNT_MAX) {
        return Err(ValidationError::new(
            field,
            format!("must be at most {}", AMOUNT_MAX),
        ));
    }

    Ok(())
}

pub fn validate_non_negative_amount(field: &'static str, amount: &BigDecimal) -> ValidationResult {
    if amount < &BigDecimal::from(0) {
        return Err(ValidationError::new(field, "must not be negative"));
    }

    if amount > &BigDecimal::from(AMOUNT_MAX) {
        return Err(ValidationError::new(
            field,
            format!("must be at most {}", AMOUNT_MAX),
        ));
    }

    Ok(())
}
