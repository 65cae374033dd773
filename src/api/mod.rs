use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::core::{
    InvestmentPosition, PENALTY_STAGES, PenaltyStage, WithdrawalQuote, estimate, format_inr,
    round_amount,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EstimatePayload {
    #[serde(alias = "investedAmount")]
    principal: Option<Decimal>,
    #[serde(alias = "annualRate")]
    annual_rate_percent: Option<Decimal>,
    #[serde(alias = "termDays")]
    lock_in_term_days: Option<u32>,
    investment_date: Option<NaiveDate>,
    as_of_date: Option<NaiveDate>,
}

#[derive(Debug)]
struct EstimateRequest {
    position: InvestmentPosition,
    as_of_date: NaiveDate,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EstimateResponse {
    preview_only: bool,
    as_of_date: NaiveDate,
    elapsed_days: u32,
    elapsed_percent: Decimal,
    stage_achieved: u8,
    penalty_percent: Decimal,
    principal: Decimal,
    accrued_gain: Decimal,
    penalty_amount: Decimal,
    net_payout: Decimal,
    net_payout_display: String,
    penalty_schedule: &'static [PenaltyStage],
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub fn router() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/withdrawal/estimate",
            get(estimate_get_handler).post(estimate_post_handler),
        )
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "withdrawal preview API listening");

    axum::serve(listener, router()).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn estimate_get_handler(Query(payload): Query<EstimatePayload>) -> Response {
    estimate_handler_impl(payload, Local::now().date_naive())
}

async fn estimate_post_handler(Json(payload): Json<EstimatePayload>) -> Response {
    estimate_handler_impl(payload, Local::now().date_naive())
}

fn estimate_handler_impl(payload: EstimatePayload, today: NaiveDate) -> Response {
    let request = match estimate_request_from_payload(payload, today) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    match estimate(&request.position, request.as_of_date) {
        Ok(quote) => {
            debug!(
                stage = quote.stage_achieved,
                elapsed_days = quote.elapsed_days,
                "withdrawal preview computed"
            );
            json_response(StatusCode::OK, build_estimate_response(&quote))
        }
        Err(err) => error_response(
            StatusCode::BAD_REQUEST,
            &format!("Unable to estimate withdrawal: {err}"),
        ),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn estimate_request_from_json(json: &str, today: NaiveDate) -> Result<EstimateRequest, String> {
    let payload = serde_json::from_str::<EstimatePayload>(json)
        .map_err(|e| format!("Invalid estimate JSON payload: {e}"))?;
    estimate_request_from_payload(payload, today)
}

fn estimate_request_from_payload(
    payload: EstimatePayload,
    today: NaiveDate,
) -> Result<EstimateRequest, String> {
    let Some(principal) = payload.principal else {
        return Err("principal is required".to_string());
    };
    let Some(annual_rate_percent) = payload.annual_rate_percent else {
        return Err("annualRatePercent is required".to_string());
    };
    let Some(lock_in_term_days) = payload.lock_in_term_days else {
        return Err("lockInTermDays is required".to_string());
    };
    let Some(investment_date) = payload.investment_date else {
        return Err("investmentDate is required".to_string());
    };

    Ok(EstimateRequest {
        position: InvestmentPosition {
            principal,
            investment_date,
            annual_rate_percent,
            lock_in_term_days,
        },
        as_of_date: payload.as_of_date.unwrap_or(today),
    })
}

fn build_estimate_response(quote: &WithdrawalQuote) -> EstimateResponse {
    EstimateResponse {
        preview_only: true,
        as_of_date: quote.as_of_date,
        elapsed_days: quote.elapsed_days,
        elapsed_percent: round_amount(quote.elapsed_percent),
        stage_achieved: quote.stage_achieved,
        penalty_percent: quote.penalty_percent,
        principal: round_amount(quote.principal),
        accrued_gain: round_amount(quote.accrued_gain),
        penalty_amount: round_amount(quote.penalty_amount),
        net_payout: round_amount(quote.net_payout),
        net_payout_display: format_inr(quote.net_payout),
        penalty_schedule: &PENALTY_STAGES,
    }
}
