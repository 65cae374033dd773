//! Confirm/cancel orchestration around a pre-maturity withdrawal.
//!
//! The quote shown to the user is a preview; confirming sends only the
//! investment id and the backend decides the payout. At most one commit is in
//! flight per flow, and every commit outcome discards the quote.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{info, warn};

use crate::backend::{BackendError, CommitReceipt, InvestorClient};
use crate::core::{InvalidPositionError, InvestmentPosition, WithdrawalQuote, estimate};

/// The single commit path for pre-maturity withdrawals.
pub trait WithdrawalCommitter {
    fn commit_withdrawal(
        &self,
        investment_id: u64,
    ) -> impl Future<Output = Result<CommitReceipt, BackendError>> + Send;
}

impl WithdrawalCommitter for InvestorClient {
    async fn commit_withdrawal(&self, investment_id: u64) -> Result<CommitReceipt, BackendError> {
        self.withdraw_pre_maturity(investment_id).await
    }
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("unable to estimate withdrawal: {0}")]
    Estimate(#[from] InvalidPositionError),
    #[error("no withdrawal quote to confirm")]
    NothingToConfirm,
    #[error("a withdrawal is already being submitted")]
    SubmissionInFlight,
    #[error("withdrawal failed: {0}")]
    Commit(#[from] BackendError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FlowState {
    Idle,
    Quoted {
        investment_id: u64,
        quote: WithdrawalQuote,
    },
    Submitting {
        investment_id: u64,
    },
}

pub struct WithdrawalFlow<C> {
    committer: C,
    state: Mutex<FlowState>,
}

impl<C: WithdrawalCommitter> WithdrawalFlow<C> {
    pub fn new(committer: C) -> Self {
        Self {
            committer,
            state: Mutex::new(FlowState::Idle),
        }
    }

    /// Quotes `position` and keeps the quote for a later confirm, replacing
    /// any earlier one. An invalid position clears the pending quote.
    pub fn request_estimate(
        &self,
        investment_id: u64,
        position: &InvestmentPosition,
        as_of_date: NaiveDate,
    ) -> Result<WithdrawalQuote, FlowError> {
        let mut state = self.lock_state();
        if matches!(*state, FlowState::Submitting { .. }) {
            return Err(FlowError::SubmissionInFlight);
        }

        match estimate(position, as_of_date) {
            Ok(quote) => {
                *state = FlowState::Quoted {
                    investment_id,
                    quote: quote.clone(),
                };
                Ok(quote)
            }
            Err(err) => {
                *state = FlowState::Idle;
                Err(err.into())
            }
        }
    }

    /// Drops the pending quote without contacting the backend.
    ///
    /// Returns whether a quote was discarded. An in-flight commit is not
    /// cancellable and is left alone.
    pub fn cancel(&self) -> bool {
        let mut state = self.lock_state();
        if matches!(*state, FlowState::Quoted { .. }) {
            *state = FlowState::Idle;
            true
        } else {
            false
        }
    }

    /// Commits the pending quote's withdrawal through the backend.
    ///
    /// Further calls while the request is outstanding fail fast with
    /// [`FlowError::SubmissionInFlight`] and never reach the backend.
    pub async fn confirm(&self) -> Result<CommitReceipt, FlowError> {
        let (investment_id, quote) = {
            let mut state = self.lock_state();
            match std::mem::replace(&mut *state, FlowState::Idle) {
                FlowState::Quoted {
                    investment_id,
                    quote,
                } => {
                    *state = FlowState::Submitting { investment_id };
                    (investment_id, quote)
                }
                in_flight @ FlowState::Submitting { .. } => {
                    *state = in_flight;
                    return Err(FlowError::SubmissionInFlight);
                }
                FlowState::Idle => return Err(FlowError::NothingToConfirm),
            }
        };

        info!(
            investment_id,
            stage = quote.stage_achieved,
            "submitting pre-maturity withdrawal"
        );
        let mut submission = SubmissionGuard {
            state: &self.state,
            investment_id,
            settled: false,
        };
        let outcome = self.committer.commit_withdrawal(investment_id).await;
        submission.settled = true;
        drop(submission);

        match outcome {
            Ok(receipt) => {
                info!(investment_id, message = %receipt.message, "withdrawal accepted");
                Ok(receipt)
            }
            Err(err) => {
                warn!(investment_id, error = %err, "withdrawal rejected");
                Err(err.into())
            }
        }
    }

    pub fn pending_quote(&self) -> Option<WithdrawalQuote> {
        match &*self.lock_state() {
            FlowState::Quoted { quote, .. } => Some(quote.clone()),
            _ => None,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(*self.lock_state(), FlowState::Submitting { .. })
    }

    fn lock_state(&self) -> MutexGuard<'_, FlowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Returns the flow to idle when a submission ends, including when the
/// `confirm` future is dropped before the backend answers.
struct SubmissionGuard<'a> {
    state: &'a Mutex<FlowState>,
    investment_id: u64,
    settled: bool,
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!(
                investment_id = self.investment_id,
                "withdrawal submission abandoned before the backend answered"
            );
        }
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = FlowState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Session;
    use crate::backend::mock::spawn_backend;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    #[derive(Clone, Default)]
    struct GatedCommitter {
        calls: Arc<AtomicUsize>,
        gate: Arc<Notify>,
        reject: bool,
    }

    impl WithdrawalCommitter for GatedCommitter {
        async fn commit_withdrawal(
            &self,
            investment_id: u64,
        ) -> Result<CommitReceipt, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            if self.reject {
                return Err(BackendError::Status {
                    status: 409,
                    message: "already withdrawn".to_string(),
                });
            }
            Ok(CommitReceipt {
                investment_id,
                message: "ok".to_string(),
                payout_amount: Some(dec!(103000)),
            })
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn position() -> InvestmentPosition {
        InvestmentPosition {
            principal: dec!(100000),
            investment_date: date(2023, 1, 1),
            annual_rate_percent: dec!(12),
            lock_in_term_days: 365,
        }
    }

    #[tokio::test]
    async fn confirm_without_quote_is_refused() {
        let committer = GatedCommitter::default();
        let flow = WithdrawalFlow::new(committer.clone());
        assert!(matches!(
            flow.confirm().await,
            Err(FlowError::NothingToConfirm)
        ));
        assert_eq!(committer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancel_discards_quote_without_backend_call() {
        let committer = GatedCommitter::default();
        let flow = WithdrawalFlow::new(committer.clone());

        let quote = flow
            .request_estimate(42, &position(), date(2023, 4, 11))
            .expect("quote");
        assert_eq!(flow.pending_quote(), Some(quote));

        assert!(flow.cancel());
        assert!(!flow.cancel());
        assert_eq!(flow.pending_quote(), None);
        assert!(matches!(
            flow.confirm().await,
            Err(FlowError::NothingToConfirm)
        ));
        assert_eq!(committer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn second_confirm_while_in_flight_is_suppressed() {
        let committer = GatedCommitter::default();
        let flow = WithdrawalFlow::new(committer.clone());
        flow.request_estimate(42, &position(), date(2023, 4, 11))
            .expect("quote");

        let (first, second) = tokio::join!(flow.confirm(), async {
            assert!(flow.is_in_flight());
            assert!(matches!(
                flow.request_estimate(42, &position(), date(2023, 4, 11)),
                Err(FlowError::SubmissionInFlight)
            ));
            assert!(!flow.cancel());
            let second = flow.confirm().await;
            committer.gate.notify_one();
            second
        });

        let receipt = first.expect("first confirm succeeds");
        assert_eq!(receipt.investment_id, 42);
        assert!(matches!(second, Err(FlowError::SubmissionInFlight)));
        assert_eq!(committer.calls.load(Ordering::SeqCst), 1);
        assert!(!flow.is_in_flight());
        assert_eq!(flow.pending_quote(), None);
    }

    #[tokio::test]
    async fn dropped_confirm_releases_the_flow() {
        let committer = GatedCommitter::default();
        let flow = WithdrawalFlow::new(committer.clone());
        flow.request_estimate(42, &position(), date(2023, 4, 11))
            .expect("quote");

        let abandoned = tokio::select! {
            biased;
            _ = flow.confirm() => false,
            _ = async {} => true,
        };
        assert!(abandoned);
        assert_eq!(committer.calls.load(Ordering::SeqCst), 1);
        assert!(!flow.is_in_flight());
        assert_eq!(flow.pending_quote(), None);

        flow.request_estimate(42, &position(), date(2023, 4, 12))
            .expect("fresh quote after abandoned submission");
        committer.gate.notify_one();
        let receipt = flow.confirm().await.expect("second submission");
        assert_eq!(receipt.investment_id, 42);
        assert_eq!(committer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_commit_discards_quote_and_requires_fresh_estimate() {
        let committer = GatedCommitter {
            reject: true,
            ..GatedCommitter::default()
        };
        committer.gate.notify_one();
        let flow = WithdrawalFlow::new(committer.clone());
        flow.request_estimate(42, &position(), date(2023, 4, 11))
            .expect("quote");

        let err = flow.confirm().await.expect_err("backend rejects");
        assert!(matches!(err, FlowError::Commit(BackendError::Status { status: 409, .. })));
        assert_eq!(flow.pending_quote(), None);
        assert!(matches!(
            flow.confirm().await,
            Err(FlowError::NothingToConfirm)
        ));
        assert_eq!(committer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalid_position_clears_pending_quote() {
        let flow = WithdrawalFlow::new(GatedCommitter::default());
        flow.request_estimate(42, &position(), date(2023, 4, 11))
            .expect("quote");

        let err = flow
            .request_estimate(42, &position(), date(2022, 1, 1))
            .expect_err("future-dated");
        assert!(err.to_string().starts_with("unable to estimate withdrawal"));
        assert_eq!(flow.pending_quote(), None);
    }

    #[tokio::test]
    async fn investor_client_commits_through_the_flow() {
        let (base_url, recorded) = spawn_backend().await;
        let client = InvestorClient::new(base_url, Session::anonymous());
        let (_, position) = client.position_for(42).await.expect("position");

        let flow = WithdrawalFlow::new(client);
        let quote = flow
            .request_estimate(42, &position, date(2023, 4, 11))
            .expect("quote");
        assert_eq!(quote.stage_achieved, 2);

        let receipt = flow.confirm().await.expect("committed");
        assert_eq!(receipt.payout_amount, Some(dec!(103000.50)));

        let commits: Vec<_> = recorded
            .paths()
            .into_iter()
            .filter(|path| path == "withdrawPreMaturity")
            .collect();
        assert_eq!(commits.len(), 1);
    }
}
