//! Wire shapes of the investor backend (`/api/v1/investor/*`) and its
//! portfolio totals (`/api/investments/*`).
//!
//! Every endpoint decodes into an explicit struct here; nothing downstream
//! sees raw JSON. Positions handed to the estimator are built only through
//! [`InvestmentRecord::to_position`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::BackendError;
use crate::core::{
    InvestmentPosition, parse_backend_date, parse_percent, parse_term_days, whole_days_between,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvestmentMode {
    Lumpsum,
    Sip,
    #[serde(other)]
    Unknown,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    Active,
    #[serde(other)]
    Inactive,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WithdrawalFrequency {
    #[default]
    Quarterly,
    Annual,
    Maturity,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentPlan {
    pub id: u64,
    pub name: String,
    pub min_investment: Decimal,
    pub expected_return: String,
    pub investment_term: String,
    #[serde(rename = "type")]
    pub plan_type: InvestmentMode,
    pub status: PlanStatus,
}

impl InvestmentPlan {
    pub fn annual_rate_percent(&self) -> Result<Decimal, BackendError> {
        parse_percent(&self.expected_return).ok_or_else(|| BackendError::Schema {
            field: "expectedReturn",
            detail: format!("plan {}: {:?}", self.id, self.expected_return),
        })
    }

    pub fn term_days(&self) -> Result<u32, BackendError> {
        parse_term_days(&self.investment_term).ok_or_else(|| BackendError::Schema {
            field: "investmentTerm",
            detail: format!("plan {}: {:?}", self.id, self.investment_term),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentRecord {
    pub id: u64,
    pub investment_plan_id: u64,
    pub invested_amount: Decimal,
    pub investment_date: String,
    pub investment_mode: InvestmentMode,
    pub withdrawal_frequency: Option<WithdrawalFrequency>,
    #[serde(default)]
    pub maturity_date: Option<String>,
}

impl InvestmentRecord {
    /// Builds the estimator's view of this investment under `plan`.
    ///
    /// The lock-in term comes from the maturity date when the backend sends
    /// one, otherwise from the plan's term label. A maturity date that does
    /// not parse, or does not fall after the investment date, is rejected.
    pub fn to_position(&self, plan: &InvestmentPlan) -> Result<InvestmentPosition, BackendError> {
        if plan.id != self.investment_plan_id {
            return Err(BackendError::Schema {
                field: "investmentPlanId",
                detail: format!(
                    "investment {} references plan {}, got plan {}",
                    self.id, self.investment_plan_id, plan.id
                ),
            });
        }

        let investment_date =
            parse_backend_date(&self.investment_date).ok_or_else(|| BackendError::Schema {
                field: "investmentDate",
                detail: format!("investment {}: {:?}", self.id, self.investment_date),
            })?;

        let lock_in_term_days = match self.maturity_date.as_deref() {
            Some(raw) => {
                let maturity = parse_backend_date(raw).ok_or_else(|| BackendError::Schema {
                    field: "maturityDate",
                    detail: format!("investment {}: {raw:?}", self.id),
                })?;
                u32::try_from(whole_days_between(investment_date, maturity))
                    .ok()
                    .filter(|days| *days > 0)
                    .ok_or_else(|| BackendError::Schema {
                        field: "maturityDate",
                        detail: format!(
                            "investment {}: matures {maturity}, invested {investment_date}",
                            self.id
                        ),
                    })?
            }
            None => plan.term_days()?,
        };

        Ok(InvestmentPosition {
            principal: self.invested_amount.normalize(),
            investment_date,
            annual_rate_percent: plan.annual_rate_percent()?,
            lock_in_term_days,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: String,
    pub date: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: Decimal,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub ref_no: Option<String>,
    #[serde(default)]
    pub balance: Option<Decimal>,
    #[serde(default)]
    pub remark: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlansEnvelope {
    pub investment_plans: Vec<InvestmentPlan>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InvestmentsEnvelope {
    pub investments: Vec<InvestmentRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum TransactionsEnvelope {
    Bare(Vec<TransactionRecord>),
    Wrapped { transactions: Vec<TransactionRecord> },
}

impl TransactionsEnvelope {
    pub fn into_records(self) -> Vec<TransactionRecord> {
        match self {
            TransactionsEnvelope::Bare(records) => records,
            TransactionsEnvelope::Wrapped { transactions } => transactions,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeInvestmentResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub investment: Option<InvestmentRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

/// `totalCurrentValue`: null or absent when the investor holds nothing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TotalCurrentValueResponse {
    #[serde(default)]
    pub total_current_value: Option<Decimal>,
}

impl TotalCurrentValueResponse {
    pub fn current_value(&self) -> Decimal {
        self.total_current_value.unwrap_or(Decimal::ZERO)
    }
}

/// `totalInvestment`: an aggregate whose `_sum` is null over zero rows.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TotalInvestmentResponse {
    #[serde(default)]
    pub total_investment: Option<InvestmentAggregate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InvestmentAggregate {
    #[serde(rename = "_sum", default)]
    pub sum: Option<InvestedSum>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InvestedSum {
    #[serde(default)]
    pub invested_amount: Option<Decimal>,
}

impl TotalInvestmentResponse {
    pub fn invested_amount(&self) -> Decimal {
        self.total_investment
            .as_ref()
            .and_then(|aggregate| aggregate.sum.as_ref())
            .and_then(|sum| sum.invested_amount)
            .unwrap_or(Decimal::ZERO)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PreMaturityResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub payout_amount: Option<Decimal>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PreMaturityRequest {
    pub investment_id: u64,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
