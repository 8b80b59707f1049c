//! Domain value errors

use thiserror::Error;

/// Errors raised while constructing domain values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// Amount does not fit in the fixed-point representation
    #[error("amount overflows the supported range")]
    AmountOverflow,

    /// Amount is not a decimal number
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Amount carries more precision than micro-units
    #[error("amount has more than {0} decimal places")]
    AmountTooPrecise(u32),

    /// Billing period end is not after its start
    #[error("period end must be after period start")]
    EmptyPeriod,

    /// Timestamp is outside the representable range
    #[error("timestamp out of range: {0}")]
    TimestampOutOfRange(i64),

    /// Unknown invoice status string
    #[error("unknown invoice status: {0}")]
    UnknownStatus(String),
}
