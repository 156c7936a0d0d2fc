//! API request/response types and error codes
//!
//! - `ApiResponse<T>`: unified response wrapper
//! - `ApiError`: error half of every handler result
//! - `error_codes`: stable numeric codes

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::wallet::{WalletError, WalletId};

// ============================================================================
// Unified API Response Format
// ============================================================================

/// Unified API response wrapper
///
/// - code: 0 = success, non-zero = error code
/// - msg: short message description
/// - data: payload on success, absent on error
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: error_codes::SUCCESS,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    pub fn error(code: i32, msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

// ============================================================================
// Request / Response DTOs
// ============================================================================

/// POST /api/v1/wallet body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperateRequest {
    pub wallet_id: WalletId,
    pub operation_type: String,
    pub amount: i64,
}

/// Wallet balance payload
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BalanceData {
    pub wallet_id: WalletId,
    pub balance: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthData {
    pub timestamp_ms: u64,
}

// ============================================================================
// Errors
// ============================================================================

/// Standard API error codes
pub mod error_codes {
    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const INSUFFICIENT_FUNDS: i32 = 1002;
    pub const UNKNOWN_OPERATION: i32 = 1003;

    // Resource errors (4xxx)
    pub const WALLET_NOT_FOUND: i32 = 4001;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const SERVICE_UNAVAILABLE: i32 = 5001;
    pub const DEADLINE_EXCEEDED: i32 = 5004;
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub msg: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: i32, msg: impl Into<String>) -> Self {
        Self {
            status,
            code,
            msg: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error_codes::INVALID_PARAMETER, msg)
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            error_codes::SERVICE_UNAVAILABLE,
            msg,
        )
    }
}

impl From<WalletError> for ApiError {
    fn from(e: WalletError) -> Self {
        let code = match &e {
            WalletError::NotFound(_) => error_codes::WALLET_NOT_FOUND,
            WalletError::InsufficientFunds { .. } => error_codes::INSUFFICIENT_FUNDS,
            WalletError::UnknownOperation(_) => error_codes::UNKNOWN_OPERATION,
            WalletError::InvalidArgument(_) => error_codes::INVALID_PARAMETER,
            WalletError::Canceled | WalletError::DeadlineExceeded => {
                error_codes::DEADLINE_EXCEEDED
            }
            WalletError::Conflict(_) | WalletError::StoreUnavailable(_) => {
                error_codes::INTERNAL_ERROR
            }
        };
        let status =
            StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, code, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ApiResponse::<()>::error(self.code, self.msg)),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operate_request_wire_names() {
        let req: OperateRequest = serde_json::from_str(
            r#"{"walletId":"11111111-1111-1111-1111-111111111111","operationType":"DEPOSIT","amount":1}"#,
        )
        .unwrap();
        assert_eq!(req.operation_type, "DEPOSIT");
        assert_eq!(req.amount, 1);
    }

    #[test]
    fn test_rejects_fractional_amount() {
        let res: Result<OperateRequest, _> = serde_json::from_str(
            r#"{"walletId":"11111111-1111-1111-1111-111111111111","operationType":"DEPOSIT","amount":1.5}"#,
        );
        assert!(res.is_err());
    }

    #[test]
    fn test_error_envelope_omits_data() {
        let json = serde_json::to_string(&ApiResponse::<()>::error(4001, "nope")).unwrap();
        assert_eq!(json, r#"{"code":4001,"msg":"nope"}"#);
    }

    #[test]
    fn test_wallet_error_mapping() {
        let err = ApiError::from(WalletError::NotFound(WalletId::random()));
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.code, error_codes::WALLET_NOT_FOUND);

        let err = ApiError::from(WalletError::InsufficientFunds {
            balance: 0,
            requested: 1,
        });
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err = ApiError::from(WalletError::Conflict("x".into()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);

        let err = ApiError::from(WalletError::DeadlineExceeded);
        assert_eq!(err.status, StatusCode::GATEWAY_TIMEOUT);
    }
}
