//! Checks the dashboard forms run before anything is sent to the backend.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use thiserror::Error;

use super::schema::{InvestmentMode, InvestmentPlan, PlanStatus, WithdrawalFrequency};

/// Largest amount a single withdraw-funds request may ask for.
pub const MAX_FUNDS_WITHDRAWAL: Decimal = dec!(100000);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Amount must be greater than zero.")]
    NonPositiveAmount,
    #[error("SIP investments are coming soon.")]
    SipUnavailable,
    #[error("This investment plan is not active.")]
    PlanInactive,
    #[error("Amount must be at least ₹{minimum}.")]
    BelowMinimum { minimum: Decimal },
    #[error("Reference number is required.")]
    MissingReference,
    #[error("Amount cannot exceed ₹{maximum} per withdrawal.")]
    AboveWithdrawalLimit { maximum: Decimal },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    Upi,
    Neft,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeInvestmentRequest {
    investment_plan_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    invested_amount: Decimal,
    investment_mode: InvestmentMode,
    withdrawal_frequency: WithdrawalFrequency,
}

impl SubscribeInvestmentRequest {
    /// Builds a lump-sum subscription to `plan`, refusing what the backend would.
    pub fn for_plan(
        plan: &InvestmentPlan,
        amount: Decimal,
        withdrawal_frequency: WithdrawalFrequency,
    ) -> Result<Self, ValidationError> {
        if amount <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveAmount);
        }
        if plan.plan_type == InvestmentMode::Sip {
            return Err(ValidationError::SipUnavailable);
        }
        if plan.status != PlanStatus::Active {
            return Err(ValidationError::PlanInactive);
        }
        if amount < plan.min_investment {
            return Err(ValidationError::BelowMinimum {
                minimum: plan.min_investment,
            });
        }

        Ok(Self {
            investment_plan_id: plan.id.to_string(),
            invested_amount: amount,
            investment_mode: InvestmentMode::Lumpsum,
            withdrawal_frequency,
        })
    }

    pub fn invested_amount(&self) -> Decimal {
        self.invested_amount
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFundsRequest {
    payment_method: PaymentMethod,
    #[serde(with = "rust_decimal::serde::float")]
    amount: Decimal,
    reference_number: String,
    comments: String,
}

impl AddFundsRequest {
    pub fn new(
        payment_method: PaymentMethod,
        amount: Decimal,
        reference_number: &str,
        comments: Option<&str>,
    ) -> Result<Self, ValidationError> {
        if amount <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveAmount);
        }
        let reference_number = reference_number.trim();
        if reference_number.is_empty() {
            return Err(ValidationError::MissingReference);
        }
        Ok(Self {
            payment_method,
            amount,
            reference_number: reference_number.to_string(),
            comments: comments.unwrap_or_default().trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WithdrawFundsRequest {
    #[serde(with = "rust_decimal::serde::float")]
    amount: Decimal,
}

impl WithdrawFundsRequest {
    pub fn new(amount: Decimal) -> Result<Self, ValidationError> {
        if amount <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveAmount);
        }
        if amount > MAX_FUNDS_WITHDRAWAL {
            return Err(ValidationError::AboveWithdrawalLimit {
                maximum: MAX_FUNDS_WITHDRAWAL,
            });
        }
        Ok(Self { amount })
    }
}
