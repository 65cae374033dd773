use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

/// An investment as the estimator sees it. Owned by the backend; read-only here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvestmentPosition {
    pub principal: Decimal,
    pub investment_date: NaiveDate,
    pub annual_rate_percent: Decimal,
    pub lock_in_term_days: u32,
}

/// One band of the early-withdrawal penalty schedule.
///
/// A stage covers elapsed percentages above the previous stage's
/// `upper_percent` up to and including its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PenaltyStage {
    pub stage: u8,
    pub upper_percent: u32,
    pub penalty_percent: Decimal,
}

/// Advisory pre-maturity withdrawal quote.
///
/// Preview only: the backend decides what is actually paid. Amounts are kept at
/// full precision; round with [`crate::core::round_amount`] when displaying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalQuote {
    pub as_of_date: NaiveDate,
    pub elapsed_days: u32,
    pub elapsed_percent: Decimal,
    pub principal: Decimal,
    pub accrued_gain: Decimal,
    pub stage_achieved: u8,
    pub penalty_percent: Decimal,
    pub penalty_amount: Decimal,
    pub net_payout: Decimal,
}

impl WithdrawalQuote {
    pub fn is_penalty_free(&self) -> bool {
        self.penalty_percent.is_zero()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidPositionError {
    #[error("principal must be > 0, got {0}")]
    NonPositivePrincipal(Decimal),
    #[error("lock-in term must be > 0 days")]
    ZeroLockInTerm,
    #[error("annual rate must be >= 0, got {0}")]
    NegativeRate(Decimal),
    #[error("principal {0} is too large to estimate")]
    AmountOutOfRange(Decimal),
    #[error("investment date {investment_date} is after {as_of_date}")]
    FutureInvestmentDate {
        investment_date: NaiveDate,
        as_of_date: NaiveDate,
    },
}
