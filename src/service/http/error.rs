//! MeteoError → HTTP 响应

use super::models::ErrorBody;
use crate::MeteoError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

impl ResponseError for MeteoError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(MeteoError::status_code(self))
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        let status = ResponseError::status_code(self);
        if status.is_server_error() {
            log::error!("Request failed: {}", self);
        } else if self.is_caller_error() {
            log::debug!("Rejected request: {}", self);
        }
        // 401 只返回原因本身，例如 "Invalid username or password"
        let message = match self {
            MeteoError::Unauthorized(reason) => reason.clone(),
            other => other.to_string(),
        };
        HttpResponse::build(status).json(ErrorBody::new(message))
    }
}

/// actix 自带提取器（Json/Query/Path）的解析失败统一为 400 `{"error"}`
pub fn bad_request(message: String) -> actix_web::Error {
    MeteoError::InvalidParameter(message).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn test_error_response_body() {
        let resp = MeteoError::UnknownGranularity("hourly".into()).error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Unknown granularity: hourly");

        let resp = MeteoError::Unauthorized("Missing Authorization Header".into()).error_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Missing Authorization Header");
    }
}
