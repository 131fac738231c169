/// 관리자 세션
/// 설정된 비밀번호와 그대로 비교하고, 성공하면 세션 토큰을 쿠키로 발급한다.
// region:    --- Imports
use crate::error::AppError;
use crate::state::AppState;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use std::collections::HashSet;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

// endregion: --- Imports

pub const SESSION_COOKIE: &str = "admin_session";

// region:    --- Session Store
/// 메모리 세션 저장소
pub struct AdminSessions {
    password: String,
    tokens: RwLock<HashSet<String>>,
}

impl AdminSessions {
    pub fn new(password: String) -> Self {
        Self {
            password,
            tokens: RwLock::new(HashSet::new()),
        }
    }

    /// 로그인: 비밀번호가 같으면 새 토큰 발급
    pub async fn login(&self, password: &str) -> Option<String> {
        if password != self.password {
            warn!("{:<12} --> 관리자 로그인 실패", "Auth");
            return None;
        }
        let token = Uuid::new_v4().to_string();
        self.tokens.write().await.insert(token.clone());
        info!("{:<12} --> 관리자 로그인", "Auth");
        Some(token)
    }

    pub async fn logout(&self, token: &str) {
        self.tokens.write().await.remove(token);
        info!("{:<12} --> 관리자 로그아웃", "Auth");
    }

    pub async fn is_valid(&self, token: &str) -> bool {
        self.tokens.read().await.contains(token)
    }
}

/// 로그인 응답 쿠키
pub fn session_cookie(token: &str) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/",
        SESSION_COOKIE, token
    )
}

/// 로그아웃 응답 쿠키 (즉시 만료)
pub fn expired_session_cookie() -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", SESSION_COOKIE)
}

/// Cookie 헤더에서 세션 토큰 추출
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token.to_string())
        .filter(|token| !token.is_empty())
}

// endregion: --- Session Store

// region:    --- Extractor
/// 관리자 세션이 있어야 통과하는 추출기
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub token: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or(AppError::Unauthorized)?;
        if state.sessions.is_valid(&token).await {
            Ok(AdminSession { token })
        } else {
            Err(AppError::Unauthorized)
        }
    }
}

// endregion: --- Extractor

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[tokio::test]
    async fn login_requires_exact_password() {
        let sessions = AdminSessions::new("geheim".to_string());
        assert!(sessions.login("Geheim").await.is_none());
        assert!(sessions.login("geheim ").await.is_none());

        let token = sessions.login("geheim").await.unwrap();
        assert!(sessions.is_valid(&token).await);

        sessions.logout(&token).await;
        assert!(!sessions.is_valid(&token).await);
    }

    #[test]
    fn token_is_read_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; admin_session=abc-123; other=1"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc-123"));

        let mut empty = HeaderMap::new();
        empty.insert(COOKIE, HeaderValue::from_static("admin_session="));
        assert_eq!(session_token(&empty), None);
    }
}
// endregion: --- Tests
