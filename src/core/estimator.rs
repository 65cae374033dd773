use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::dates::whole_days_between;
use super::types::{InvalidPositionError, InvestmentPosition, PenaltyStage, WithdrawalQuote};

/// Interest is annualized over a fixed 365-day year, leap years included.
pub const DAYS_PER_YEAR: u32 = 365;

const HUNDRED: Decimal = dec!(100);

pub static PENALTY_STAGES: [PenaltyStage; 4] = [
    PenaltyStage {
        stage: 1,
        upper_percent: 25,
        penalty_percent: dec!(5.0),
    },
    PenaltyStage {
        stage: 2,
        upper_percent: 50,
        penalty_percent: dec!(3.5),
    },
    PenaltyStage {
        stage: 3,
        upper_percent: 75,
        penalty_percent: dec!(2.5),
    },
    PenaltyStage {
        stage: 4,
        upper_percent: 100,
        penalty_percent: dec!(0.0),
    },
];

/// Quotes an early withdrawal of `position` as of today's local date.
pub fn estimate_today(
    position: &InvestmentPosition,
) -> Result<WithdrawalQuote, InvalidPositionError> {
    estimate(position, Local::now().date_naive())
}

/// Quotes an early withdrawal of `position` as of `as_of_date`.
///
/// Pure: no I/O and no hidden state, so the same inputs always give the same
/// quote.
pub fn estimate(
    position: &InvestmentPosition,
    as_of_date: NaiveDate,
) -> Result<WithdrawalQuote, InvalidPositionError> {
    validate_position(position)?;

    let elapsed = whole_days_between(position.investment_date, as_of_date);
    if elapsed < 0 {
        return Err(InvalidPositionError::FutureInvestmentDate {
            investment_date: position.investment_date,
            as_of_date,
        });
    }
    // Date ranges supported by chrono keep this well inside u32.
    let elapsed_days = u32::try_from(elapsed).unwrap_or(u32::MAX);

    let term = Decimal::from(position.lock_in_term_days);
    let days = Decimal::from(elapsed_days);

    let stage = stage_for_elapsed(elapsed_days, position.lock_in_term_days);
    let (accrued_gain, penalty_amount, net_payout) =
        payout_amounts(position, days, stage.penalty_percent)
            .ok_or(InvalidPositionError::AmountOutOfRange(position.principal))?;
    let elapsed_percent = days
        .checked_mul(HUNDRED)
        .and_then(|scaled| scaled.checked_div(term))
        .ok_or(InvalidPositionError::AmountOutOfRange(position.principal))?;

    Ok(WithdrawalQuote {
        as_of_date,
        elapsed_days,
        elapsed_percent,
        principal: position.principal,
        accrued_gain,
        stage_achieved: stage.stage,
        penalty_percent: stage.penalty_percent,
        penalty_amount,
        net_payout,
    })
}

/// Looks up the penalty stage for `elapsed_days` of a `term_days` lock-in.
///
/// Zero elapsed days fall into stage 1; anything beyond the term is stage 4.
/// Band edges are compared exactly in integers.
pub fn stage_for_elapsed(elapsed_days: u32, term_days: u32) -> PenaltyStage {
    let elapsed_scaled = u64::from(elapsed_days) * 100;
    PENALTY_STAGES
        .iter()
        .copied()
        .find(|stage| elapsed_scaled <= u64::from(stage.upper_percent) * u64::from(term_days))
        .unwrap_or(PENALTY_STAGES[PENALTY_STAGES.len() - 1])
}

/// Gain, penalty and net payout, or `None` if any step leaves the range of
/// `Decimal`.
fn payout_amounts(
    position: &InvestmentPosition,
    days: Decimal,
    penalty_percent: Decimal,
) -> Option<(Decimal, Decimal, Decimal)> {
    // Multiply before dividing so the only inexact step is the final division.
    let accrued_gain = position
        .principal
        .checked_mul(position.annual_rate_percent)?
        .checked_mul(days)?
        .checked_div(HUNDRED * Decimal::from(DAYS_PER_YEAR))?;
    let penalty_amount = accrued_gain
        .checked_mul(penalty_percent)?
        .checked_div(HUNDRED)?;
    let net_payout = position
        .principal
        .checked_add(accrued_gain)?
        .checked_sub(penalty_amount)?;
    Some((accrued_gain, penalty_amount, net_payout))
}

fn validate_position(position: &InvestmentPosition) -> Result<(), InvalidPositionError> {
    if position.principal <= Decimal::ZERO {
        return Err(InvalidPositionError::NonPositivePrincipal(
            position.principal,
        ));
    }
    if position.lock_in_term_days == 0 {
        return Err(InvalidPositionError::ZeroLockInTerm);
    }
    if position.annual_rate_percent < Decimal::ZERO {
        return Err(InvalidPositionError::NegativeRate(
            position.annual_rate_percent,
        ));
    }
    Ok(())
}
