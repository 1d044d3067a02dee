//! 请求提取器

use super::handlers::AppState;
use crate::user::Identity;
use crate::MeteoError;
use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};
use std::future::{ready, Ready};

/// 已通过访问控制的调用方
///
/// 作为处理器的第一个参数：授权失败时直接返回 401，处理器主体不会执行。
#[derive(Debug, Clone)]
pub struct Authenticated(pub Identity);

impl FromRequest for Authenticated {
    type Error = MeteoError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let state = match req.app_data::<web::Data<AppState>>() {
            Some(state) => state,
            None => {
                return ready(Err(MeteoError::InternalError(
                    "application state not configured".to_string(),
                )))
            }
        };

        let header = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        ready(state.gate.authorize(header).map(Authenticated))
    }
}
