//! # Validation Module
//!
//! Input validation for the referral pipelines. These checks run before any
//! business rule or storage access; business-rule refusals (rate matrix,
//! bonus eligibility, already-sent) live in [`crate::policy`] instead.

use crate::error::{ValidationError, ValidationResult};

/// Validates a transaction id.
///
/// ## Rules
/// - Must not be empty or whitespace
///
/// The id format itself is opaque to this core; storage decides whether it
/// resolves to anything.
pub fn validate_transaction_id(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "transactionId".to_string(),
        });
    }

    Ok(())
}

/// Validates a referral code.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 64 characters
pub fn validate_referral_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "referralCode".to_string(),
        });
    }

    if code.len() > 64 {
        return Err(ValidationError::TooLong {
            field: "referralCode".to_string(),
            max: 64,
        });
    }

    Ok(())
}

/// Validates that an email address is usable as a notification destination.
///
/// ## Rules
/// - Must not be empty
/// - Must contain `@` with text on both sides
///
/// Deliberately loose; deliverability is the transport's problem, this only
/// rejects records that cannot possibly be notified.
///
/// ## Example
/// ```rust
/// use referral_core::validation::validate_email;
///
/// assert!(validate_email("anna@example.com").is_ok());
/// assert!(validate_email("").is_err());
/// assert!(validate_email("no-at-sign").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "not an email address".to_string(),
        }),
    }
}

/// Validates a price in cents.
///
/// Zero is allowed; a fully discounted price is still a price.
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::Negative {
            field: "price".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
