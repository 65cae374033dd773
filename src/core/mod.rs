mod dates;
mod estimator;
mod money;
mod types;

pub use dates::{parse_backend_date, parse_term_days, whole_days_between};
pub use estimator::{DAYS_PER_YEAR, PENALTY_STAGES, estimate, estimate_today, stage_for_elapsed};
pub use money::{format_inr, parse_percent, round_amount};
pub use types::{InvalidPositionError, InvestmentPosition, PenaltyStage, WithdrawalQuote};
