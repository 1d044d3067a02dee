//! 用户认证 HTTP API
//!
//! 登录签发 token；注册需要有效的注册码。

use actix_web::{web, HttpResponse};

use super::handlers::AppState;
use super::models::{LoginResponse, RegisterResponse};
use crate::user::{UserLoginRequest, UserRegisterRequest};
use crate::MeteoError;

/// 用户登录
pub async fn login(
    req: web::Json<UserLoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, MeteoError> {
    let users = state.user_mgr.clone();
    // bcrypt 校验较慢，放到阻塞线程池
    let token = web::block(move || users.login(req.into_inner()))
        .await
        .map_err(|e| MeteoError::InternalError(e.to_string()))??;
    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token: token,
    }))
}

/// 用户注册
pub async fn register(
    req: web::Json<UserRegisterRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, MeteoError> {
    let users = state.user_mgr.clone();
    let (_, token) = web::block(move || users.register(req.into_inner()))
        .await
        .map_err(|e| MeteoError::InternalError(e.to_string()))??;
    Ok(HttpResponse::Created().json(RegisterResponse {
        message: "User successfully registered".to_string(),
        access_token: token,
    }))
}
