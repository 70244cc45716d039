//! # Validation Module
//!
//! Input validation for back-office forms.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Dashboard form (TypeScript)    - empty / length checks        │
//! │  Layer 2: API handler (serde)            - types                        │
//! │  Layer 3: THIS MODULE                    - business input rules         │
//! │  Layer 4: Repository transaction         - stock, funds, invariants     │
//! │  Layer 5: SQLite                         - NOT NULL, UNIQUE, FK, CHECK  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tradedesk_core::validation::{validate_sku, validate_quantity};
//!
//! assert!(validate_sku("RICE-25KG").is_ok());
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::{MAX_AMOUNT_CENTS, MAX_INTEREST_BPS, MAX_LINE_ITEMS, MAX_LINE_QUANTITY, MAX_LOAN_TERM_MONTHS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only alphanumeric characters, hyphens, underscores
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates an agency code. Same character rules as a SKU, at most 20 chars.
pub fn validate_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();
    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }
    if code.len() > 20 {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: 20,
        });
    }
    if !code.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }
    Ok(())
}

/// Validates a required display name (agency, customer, product, ...).
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "expected name@domain".to_string(),
        }),
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates an amount that may be zero (prices, paid amounts).
///
/// ## Rules
/// - Must not be negative
/// - Must not exceed MAX_AMOUNT_CENTS
pub fn validate_non_negative(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    validate_ceiling(field, 0, cents)
}

/// Validates an amount that must be strictly positive (deposits, incomes, loans).
pub fn validate_positive(field: &str, cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    validate_ceiling(field, 1, cents)
}

fn validate_ceiling(field: &str, min: i64, cents: i64) -> ValidationResult<()> {
    if cents > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min,
            max: MAX_AMOUNT_CENTS,
        });
    }
    Ok(())
}

pub fn validate_interest_rate(bps: u32) -> ValidationResult<()> {
    if bps > MAX_INTEREST_BPS {
        return Err(ValidationError::OutOfRange {
            field: "interest_rate_bps".to_string(),
            min: 0,
            max: MAX_INTEREST_BPS as i64,
        });
    }
    Ok(())
}

pub fn validate_line_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }
    if count > MAX_LINE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_LINE_ITEMS as i64,
        });
    }
    Ok(())
}

pub fn validate_loan_term(months: u32) -> CoreResult<()> {
    if months == 0 || months > MAX_LOAN_TERM_MONTHS {
        return Err(CoreError::InvalidLoanTerm {
            months,
            max: MAX_LOAN_TERM_MONTHS,
        });
    }
    Ok(())
}

// =============================================================================
// Settlement
// =============================================================================

/// Splits a total into `(paid, remaining)` so that `paid + remaining = total`.
///
/// ## Rules
/// - total and paid must not be negative
/// - paid may not exceed total (overpayment is not credited)
///
/// ```rust
/// use tradedesk_core::validation::settle;
///
/// assert_eq!(settle(1000, 400).unwrap(), (400, 600));
/// assert!(settle(1000, 1200).is_err());
/// ```
pub fn settle(total_cents: i64, paid_cents: i64) -> CoreResult<(i64, i64)> {
    if total_cents < 0 || paid_cents < 0 || paid_cents > total_cents {
        return Err(CoreError::InvalidAmounts {
            total_cents,
            paid_cents,
            remaining_cents: total_cents.saturating_sub(paid_cents),
        });
    }
    Ok((paid_cents, total_cents - paid_cents))
}

/// `quantity × unit price` of one invoice line.
///
/// Fails with `InvalidAmounts` when the product does not fit in i64.
pub fn line_total(quantity: i64, unit_price_cents: i64) -> CoreResult<i64> {
    quantity
        .checked_mul(unit_price_cents)
        .ok_or(CoreError::InvalidAmounts {
            total_cents: quantity.saturating_mul(unit_price_cents),
            paid_cents: 0,
            remaining_cents: 0,
        })
}

/// Sums line totals into an invoice total, failing on overflow.
///
/// ```rust
/// use tradedesk_core::validation::invoice_total;
///
/// assert_eq!(invoice_total([1200, 300]).unwrap(), 1500);
/// assert!(invoice_total([i64::MAX, 1]).is_err());
/// ```
pub fn invoice_total(line_totals: impl IntoIterator<Item = i64>) -> CoreResult<i64> {
    line_totals.into_iter().try_fold(0i64, |acc, line| {
        acc.checked_add(line).ok_or(CoreError::InvalidAmounts {
            total_cents: acc.saturating_add(line),
            paid_cents: 0,
            remaining_cents: 0,
        })
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
