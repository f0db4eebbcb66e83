//! # Validation Module
//!
//! Input validation utilities for Vendra. These run at the request boundary,
//! before business logic and before any transaction is opened.

use crate::error::ValidationError;
use crate::money::RateBps;
use crate::{MAX_BILL_ITEMS, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line-item quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a discount or tax percentage, expressed in basis points.
///
/// Negative values cannot be represented (u32); anything above 100% is
/// rejected here, before the finalize transaction opens.
pub fn validate_rate_bps(field: &str, bps: u32) -> ValidationResult<()> {
    if bps > RateBps::MAX_BPS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: RateBps::MAX_BPS as i64,
        });
    }

    Ok(())
}

/// Validates a payment amount in cents. Zero-total bills still settle
/// through the processor, so zero is allowed; negatives are not.
pub fn validate_amount_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "amount".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a bill's unique line count before an append.
pub fn validate_bill_size(current_items: usize) -> ValidationResult<()> {
    if current_items >= MAX_BILL_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "bill items".to_string(),
            min: 0,
            max: MAX_BILL_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name (organization, store, product).
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a UUID string format.
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_rate_bps() {
        assert!(validate_rate_bps("discount", 0).is_ok());
        assert!(validate_rate_bps("discount", 10_000).is_ok());
        assert!(validate_rate_bps("discount", 10_001).is_err());
    }

    #[test]
    fn test_validate_amount_cents() {
        assert!(validate_amount_cents(0).is_ok());
        assert!(validate_amount_cents(37_800).is_ok());
        assert!(validate_amount_cents(-1).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("name", "Corner Shop").is_ok());
        assert!(validate_name("name", "").is_err());
        assert!(validate_name("name", "   ").is_err());
        assert!(validate_name("name", &"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("id", "").is_err());
        assert!(validate_uuid("id", "not-a-uuid").is_err());
    }

    #[test]
    fn test_validate_bill_size() {
        assert!(validate_bill_size(0).is_ok());
        assert!(validate_bill_size(99).is_ok());
        assert!(validate_bill_size(100).is_err());
    }
}
