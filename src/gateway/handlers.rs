//! Wallet HTTP handlers
//!
//! Malformed input is rejected here with 400 before the engine is called.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};

use crate::wallet::{CallContext, LedgerStore, OperationKind, WalletError, WalletId};

use super::state::AppState;
use super::types::{
    ApiError, ApiResponse, ApiResult, BalanceData, HealthData, OperateRequest, ok,
};

/// Deposit or withdraw
///
/// POST /api/v1/wallet
pub async fn operate<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    body: Result<Json<OperateRequest>, JsonRejection>,
) -> ApiResult<BalanceData> {
    let Json(req) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    if req.amount <= 0 {
        return Err(ApiError::bad_request("amount must be a positive integer"));
    }
    let kind: OperationKind = req.operation_type.parse().map_err(ApiError::from)?;

    // Client disconnect drops this future, which abandons the attempt too
    let ctx = CallContext::with_timeout(state.request_timeout);
    match state
        .engine
        .apply(&ctx, req.wallet_id, kind, req.amount)
        .await
    {
        Ok(balance) => ok(BalanceData {
            wallet_id: req.wallet_id,
            balance,
        }),
        Err(e) => {
            log_failure(req.wallet_id, Some(kind), &e);
            Err(e.into())
        }
    }
}

/// Current balance
///
/// GET /api/v1/wallets/{id}
pub async fn get_balance<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> ApiResult<BalanceData> {
    let wallet_id: WalletId = id
        .parse()
        .map_err(|_| ApiError::bad_request("invalid uuid"))?;

    match state.engine.balance(wallet_id).await {
        Ok(balance) => ok(BalanceData { wallet_id, balance }),
        Err(e) => {
            log_failure(wallet_id, None, &e);
            Err(e.into())
        }
    }
}

/// Health check
///
/// GET /api/v1/health
///
/// - Healthy: 200 OK + {code: 0, data: {timestamp_ms}}
/// - Unhealthy: 503 + {code: 5001, msg: "unavailable"}
pub async fn health_check<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<(StatusCode, Json<ApiResponse<HealthData>>), ApiError> {
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    if let Err(e) = state.engine.store().ping().await {
        tracing::error!(error = %e, "[HEALTH] store ping failed");
        return Err(ApiError::service_unavailable("unavailable"));
    }

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(HealthData {
            timestamp_ms: now_ms,
        })),
    ))
}

fn log_failure(wallet_id: WalletId, op: Option<OperationKind>, e: &WalletError) {
    let op = op.map(|k| k.as_str()).unwrap_or("BALANCE");
    if e.http_status() >= 500 {
        tracing::error!(wallet_id = %wallet_id, op, code = e.code(), error = %e, "wallet request failed");
    } else {
        tracing::warn!(wallet_id = %wallet_id, op, code = e.code(), error = %e, "wallet request rejected");
    }
}
