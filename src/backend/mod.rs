//! Typed client for the investor backend.
//!
//! The backend owns balances, positions and the decision to pay out; this
//! module only moves validated requests and responses across HTTP.

mod schema;
mod validation;

use reqwest::{RequestBuilder, Response, header};
use rust_decimal::Decimal;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::debug;

use crate::core::InvestmentPosition;

pub use schema::{
    InvestmentMode, InvestmentPlan, InvestmentRecord, MessageResponse, PlanStatus,
    SubscribeInvestmentResponse, TransactionRecord, WithdrawalFrequency,
};
pub use validation::{
    AddFundsRequest, MAX_FUNDS_WITHDRAWAL, PaymentMethod, SubscribeInvestmentRequest,
    ValidationError, WithdrawFundsRequest,
};

use schema::{
    ErrorBody, InvestmentsEnvelope, PlansEnvelope, PreMaturityRequest, PreMaturityResponse,
    TotalCurrentValueResponse, TotalInvestmentResponse, TransactionsEnvelope,
};

const INVESTOR_API_PREFIX: &str = "/api/v1/investor";
const PORTFOLIO_API_PREFIX: &str = "/api/investments";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("http {status}: {message}")]
    Status { status: u16, message: String },
    #[error("could not decode {endpoint} response: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid {field} in backend response: {detail}")]
    Schema { field: &'static str, detail: String },
    #[error("investment {0} not found")]
    UnknownInvestment(u64),
    #[error("plan {plan_id} of investment {investment_id} not found")]
    UnknownPlan { investment_id: u64, plan_id: u64 },
}

/// Caller identity forwarded to the backend. Authentication itself happens
/// elsewhere; this only carries the session cookie it produced.
#[derive(Debug, Clone, Default)]
pub struct Session {
    cookie: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_cookie(cookie: impl Into<String>) -> Self {
        let cookie = cookie.into();
        Self {
            cookie: (!cookie.trim().is_empty()).then_some(cookie),
        }
    }

    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }
}

/// Backend acknowledgement of a pre-maturity withdrawal.
///
/// `payout_amount` is whatever the backend reports; it is the only payout
/// figure that may be shown as final.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    pub investment_id: u64,
    pub message: String,
    pub payout_amount: Option<Decimal>,
}

/// Portfolio totals as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortfolioSummary {
    pub total_invested: Decimal,
    pub current_value: Decimal,
}

impl PortfolioSummary {
    pub fn profit_loss(&self) -> Decimal {
        self.current_value.saturating_sub(self.total_invested)
    }
}

pub struct InvestorClient {
    base_url: String,
    session: Session,
    http: reqwest::Client,
}

impl InvestorClient {
    pub fn new(base_url: impl Into<String>, session: Session) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn investment_plans(&self) -> Result<Vec<InvestmentPlan>, BackendError> {
        let envelope: PlansEnvelope = self
            .get_json(INVESTOR_API_PREFIX, "getInvestmentPlans")
            .await?;
        Ok(envelope.investment_plans)
    }

    pub async fn investments(&self) -> Result<Vec<InvestmentRecord>, BackendError> {
        let envelope: InvestmentsEnvelope = self
            .get_json(INVESTOR_API_PREFIX, "getInvestments")
            .await?;
        Ok(envelope.investments)
    }

    pub async fn transactions(&self) -> Result<Vec<TransactionRecord>, BackendError> {
        let envelope: TransactionsEnvelope = self
            .get_json(INVESTOR_API_PREFIX, "getTransactions")
            .await?;
        Ok(envelope.into_records())
    }

    /// Fetches invested and current totals together.
    pub async fn portfolio_summary(&self) -> Result<PortfolioSummary, BackendError> {
        let (current, invested) = tokio::try_join!(
            self.get_json::<TotalCurrentValueResponse>(PORTFOLIO_API_PREFIX, "totalCurrentValue"),
            self.get_json::<TotalInvestmentResponse>(PORTFOLIO_API_PREFIX, "totalInvestment"),
        )?;
        Ok(PortfolioSummary {
            total_invested: invested.invested_amount(),
            current_value: current.current_value(),
        })
    }

    /// Fetches one investment together with its estimator position.
    pub async fn position_for(
        &self,
        investment_id: u64,
    ) -> Result<(InvestmentRecord, InvestmentPosition), BackendError> {
        let investments = self.investments().await?;
        let record = investments
            .into_iter()
            .find(|inv| inv.id == investment_id)
            .ok_or(BackendError::UnknownInvestment(investment_id))?;

        let plans = self.investment_plans().await?;
        let plan = plans
            .iter()
            .find(|plan| plan.id == record.investment_plan_id)
            .ok_or(BackendError::UnknownPlan {
                investment_id,
                plan_id: record.investment_plan_id,
            })?;

        let position = record.to_position(plan)?;
        Ok((record, position))
    }

    pub async fn subscribe_investment(
        &self,
        request: &SubscribeInvestmentRequest,
    ) -> Result<SubscribeInvestmentResponse, BackendError> {
        self.post_json("subscribeInvestment", request).await
    }

    pub async fn withdraw_pre_maturity(
        &self,
        investment_id: u64,
    ) -> Result<CommitReceipt, BackendError> {
        let response: PreMaturityResponse = self
            .post_json("withdrawPreMaturity", &PreMaturityRequest { investment_id })
            .await?;
        Ok(CommitReceipt {
            investment_id,
            message: response.message,
            payout_amount: response.payout_amount,
        })
    }

    pub async fn add_funds(
        &self,
        request: &AddFundsRequest,
    ) -> Result<MessageResponse, BackendError> {
        self.post_json("addFunds", request).await
    }

    pub async fn withdraw_funds(
        &self,
        request: &WithdrawFundsRequest,
    ) -> Result<MessageResponse, BackendError> {
        self.post_json("withdrawFunds", request).await
    }

    fn endpoint(&self, prefix: &str, name: &str) -> String {
        format!("{}{prefix}/{name}", self.base_url)
    }

    fn with_session(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.header(header::ACCEPT, "application/json");
        match self.session.cookie() {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        prefix: &str,
        name: &'static str,
    ) -> Result<T, BackendError> {
        debug!(endpoint = name, "GET backend endpoint");
        let response = self
            .with_session(self.http.get(self.endpoint(prefix, name)))
            .send()
            .await?;
        decode_response(name, response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        name: &'static str,
        body: &B,
    ) -> Result<T, BackendError> {
        debug!(endpoint = name, "POST investor endpoint");
        let response = self
            .with_session(
                self.http
                    .post(self.endpoint(INVESTOR_API_PREFIX, name))
                    .json(body),
            )
            .send()
            .await?;
        decode_response(name, response).await
    }
}

async fn decode_response<T: DeserializeOwned>(
    endpoint: &'static str,
    response: Response,
) -> Result<T, BackendError> {
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        return Err(BackendError::Status {
            status: status.as_u16(),
            message: error_message(&body, status.canonical_reason()),
        });
    }

    serde_json::from_slice(&body).map_err(|source| BackendError::Decode { endpoint, source })
}

fn error_message(body: &[u8], fallback: Option<&str>) -> String {
    let parsed = serde_json::from_slice::<ErrorBody>(body).unwrap_or_default();
    parsed
        .message
        .or(parsed.error)
        .filter(|msg| !msg.trim().is_empty())
        .or_else(|| {
            let text = String::from_utf8_lossy(body).trim().to_string();
            (!text.is_empty()).then_some(text)
        })
        .unwrap_or_else(|| fallback.unwrap_or("request failed").to_string())
}

#[cfg(test)]
pub(crate) mod mock {
    //! In-process stand-in for the investor backend.

    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    use axum::{
        Router,
        extract::{Json, State},
        http::{HeaderMap, StatusCode, header},
        response::IntoResponse,
        routing::{get, post},
    };
    use serde_json::{Value, json};
    use tokio::net::TcpListener;

    #[derive(Clone, Default)]
    pub struct Recorded {
        pub requests: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
    }

    impl Recorded {
        fn push(&self, path: &str, headers: &HeaderMap, body: Value) {
            let cookie = headers
                .get(header::COOKIE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            self.requests
                .lock()
                .expect("lock")
                .push((path.to_string(), cookie, body));
        }

        pub fn paths(&self) -> Vec<String> {
            self.requests
                .lock()
                .expect("lock")
                .iter()
                .map(|(path, _, _)| path.clone())
                .collect()
        }
    }

    pub async fn spawn_backend() -> (String, Recorded) {
        let recorded = Recorded::default();
        let app = Router::new()
            .route("/api/v1/investor/getInvestmentPlans", get(plans))
            .route("/api/v1/investor/getInvestments", get(investments))
            .route("/api/v1/investor/getTransactions", get(transactions))
            .route("/api/v1/investor/withdrawPreMaturity", post(pre_maturity))
            .route("/api/v1/investor/subscribeInvestment", post(subscribe))
            .route("/api/v1/investor/addFunds", post(add_funds))
            .route("/api/v1/investor/withdrawFunds", post(withdraw_funds))
            .route("/api/investments/totalCurrentValue", get(total_current_value))
            .route("/api/investments/totalInvestment", get(total_investment))
            .with_state(recorded.clone());

        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("bind mock backend");
        let addr = listener.local_addr().expect("mock addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("http://{addr}"), recorded)
    }

    async fn plans(State(rec): State<Recorded>, headers: HeaderMap) -> impl IntoResponse {
        rec.push("getInvestmentPlans", &headers, Value::Null);
        Json(json!({
            "investmentPlans": [
                {
                    "id": 7,
                    "name": "Growth Fixed 12",
                    "minInvestment": 50000,
                    "expectedReturn": "12%",
                    "investmentTerm": "1 Year",
                    "type": "LUMPSUM",
                    "status": "ACTIVE"
                }
            ]
        }))
    }

    async fn investments(State(rec): State<Recorded>, headers: HeaderMap) -> impl IntoResponse {
        rec.push("getInvestments", &headers, Value::Null);
        Json(json!({
            "investments": [
                {
                    "id": 42,
                    "investmentPlanId": 7,
                    "investedAmount": 100000,
                    "investmentDate": "2023-01-01T00:00:00.000Z",
                    "investmentMode": "LUMPSUM",
                    "withdrawalFrequency": "QUARTERLY",
                    "maturityDate": "2024-01-01T00:00:00.000Z"
                },
                {
                    "id": 43,
                    "investmentPlanId": 99,
                    "investedAmount": 5000,
                    "investmentDate": "2023-01-01",
                    "investmentMode": "LUMPSUM",
                    "withdrawalFrequency": "MATURITY",
                    "maturityDate": null
                }
            ]
        }))
    }

    async fn total_current_value(
        State(rec): State<Recorded>,
        headers: HeaderMap,
    ) -> impl IntoResponse {
        rec.push("totalCurrentValue", &headers, Value::Null);
        Json(json!({ "totalCurrentValue": "112500.75" }))
    }

    async fn total_investment(State(rec): State<Recorded>, headers: HeaderMap) -> impl IntoResponse {
        rec.push("totalInvestment", &headers, Value::Null);
        Json(json!({ "totalInvestment": { "_sum": { "investedAmount": 105000 } } }))
    }

    async fn transactions(State(rec): State<Recorded>, headers: HeaderMap) -> impl IntoResponse {
        rec.push("getTransactions", &headers, Value::Null);
        Json(json!([
            {
                "id": "TID1001",
                "date": "2024-03-15 14:30:22",
                "type": "Deposit",
                "amount": 10000,
                "method": "UPI",
                "refNo": "UPI123456",
                "balance": 10000,
                "remark": "Fund added"
            }
        ]))
    }

    async fn pre_maturity(
        State(rec): State<Recorded>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> impl IntoResponse {
        rec.push("withdrawPreMaturity", &headers, body.clone());
        if body["investmentId"] == 42 {
            (
                StatusCode::OK,
                Json(json!({ "message": "Withdrawal processed", "payoutAmount": "103000.50" })),
            )
        } else {
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "message": "Investment already withdrawn" })),
            )
        }
    }

    async fn subscribe(
        State(rec): State<Recorded>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> impl IntoResponse {
        rec.push("subscribeInvestment", &headers, body);
        Json(json!({ "message": "Investment subscribed successfully" }))
    }

    async fn add_funds(
        State(rec): State<Recorded>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> impl IntoResponse {
        rec.push("addFunds", &headers, body);
        (StatusCode::CREATED, Json(json!({ "message": "Funds added" })))
    }

    async fn withdraw_funds(
        State(rec): State<Recorded>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> impl IntoResponse {
        rec.push("withdrawFunds", &headers, body);
        (StatusCode::BAD_REQUEST, "Insufficient balance")
    }
}
