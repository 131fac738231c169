// region:    --- Imports
use crate::auth::{expired_session_cookie, session_cookie, AdminSession};
use crate::bidding::commands::handle_place_bid;
use crate::bidding::model::PlaceBidCommand;
use crate::catalog::commands;
use crate::catalog::model::{NewProduct, ProductChanges, UploadedFile};
use crate::error::AppError;
use crate::import::import_archive;
use crate::notification;
use crate::query;
use crate::state::AppState;
use axum::extract::{Multipart, Path, State};
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect};
use axum::Json;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

// endregion: --- Imports

const IMAGES_FIELD: &str = "images";
const ARCHIVE_FIELD: &str = "zipfile";

// region:    --- Command Handlers

/// 입찰 요청 처리
pub async fn handle_bid(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
    Json(cmd): Json<PlaceBidCommand>,
) -> Result<impl IntoResponse, AppError> {
    info!("{:<12} --> 입찰 요청 처리 시작: {:?}", "Handler", cmd);

    let bid = handle_place_bid(
        &state.db_manager,
        Arc::clone(&state.notifier),
        product_id,
        cmd,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "입찰이 성공적으로 처리되었습니다.",
            "current_price": bid.amount,
            "bid": bid
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
}

/// 관리자 로그인
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let token = state
        .sessions
        .login(&req.password)
        .await
        .ok_or(AppError::Unauthorized)?;
    Ok((
        [(SET_COOKIE, session_cookie(&token))],
        Json(serde_json::json!({ "message": "로그인되었습니다." })),
    ))
}

/// 관리자 로그아웃
pub async fn handle_logout(
    State(state): State<AppState>,
    session: AdminSession,
) -> impl IntoResponse {
    state.sessions.logout(&session.token).await;
    (
        [(SET_COOKIE, expired_session_cookie())],
        Json(serde_json::json!({ "message": "로그아웃되었습니다." })),
    )
}

/// 상품 등록 (multipart)
pub async fn handle_create_product(
    State(state): State<AppState>,
    _session: AdminSession,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut form = read_form(multipart).await?;
    let cmd = NewProduct {
        title: form.take("title").unwrap_or_default(),
        description: form.take("description"),
        starting_price: form.take("price_start").unwrap_or_default(),
        images: form.files,
    };

    let product = commands::create_product(&state.db_manager, &state.images, cmd).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// 상품 수정 (multipart, 보내지 않은 필드는 유지)
pub async fn handle_update_product(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(product_id): Path<i64>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut form = read_form(multipart).await?;
    let is_sold = match form.take("is_sold") {
        Some(value) => Some(parse_flag(&value)?),
        None => None,
    };
    let changes = ProductChanges {
        title: form.take("title"),
        description: form.take("description"),
        starting_price: form.take("price_start"),
        is_sold,
        images: form.files,
    };

    let updated =
        commands::update_product(&state.db_manager, &state.images, product_id, changes).await?;
    Ok(Json(updated))
}

/// 상품 삭제
pub async fn handle_delete_product(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(product_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    commands::delete_product(&state.db_manager, &state.images, product_id).await?;
    Ok(Json(serde_json::json!({
        "message": "상품이 삭제되었습니다.",
        "product_id": product_id
    })))
}

/// 판매 완료 처리
pub async fn handle_mark_sold(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(product_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    commands::mark_sold(&state.db_manager, product_id).await?;
    Ok(Json(serde_json::json!({
        "message": "판매 완료로 변경되었습니다.",
        "product_id": product_id
    })))
}

/// 이미지 삭제
pub async fn handle_delete_image(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(image_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let product_id = commands::delete_image(&state.db_manager, &state.images, image_id).await?;
    Ok(Json(serde_json::json!({
        "message": "이미지가 삭제되었습니다.",
        "product_id": product_id
    })))
}

/// zip 일괄 등록
pub async fn handle_bulk_import(
    State(state): State<AppState>,
    _session: AdminSession,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut archive = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(ARCHIVE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        archive = Some((file_name, bytes));
    }

    let Some((file_name, bytes)) = archive.filter(|(name, _)| !name.is_empty()) else {
        return Err(AppError::validation(".zip 파일을 선택하세요."));
    };
    if !file_name.to_lowercase().ends_with(".zip") {
        return Err(AppError::validation(".zip 파일만 지원합니다."));
    }

    let report = import_archive(&state.db_manager, &state.images, bytes.to_vec()).await?;
    Ok(Json(report))
}

/// 테스트 메일
pub async fn handle_test_email(
    State(state): State<AppState>,
    _session: AdminSession,
) -> impl IntoResponse {
    let report =
        notification::test_email(state.notifier.as_ref(), &state.config.missing_mail_keys).await;
    Json(report)
}

// endregion: --- Command Handlers

// region:    --- Query Handlers

/// 상품 목록 조회
pub async fn handle_get_products(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    info!("{:<12} --> 상품 목록 조회", "HandlerQuery");
    let products = query::handlers::list_products(&state.db_manager, &state.images).await?;
    Ok(Json(products))
}

/// 상품 상세 조회
pub async fn handle_get_product(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    info!("{:<12} --> 상품 조회 id: {}", "HandlerQuery", product_id);
    let detail =
        query::handlers::get_product_detail(&state.db_manager, &state.images, product_id).await?;
    Ok(Json(detail))
}

/// 최고 입찰가 조회
pub async fn handle_get_highest_bid(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    info!(
        "{:<12} --> 최고 입찰가 조회 id: {}",
        "HandlerQuery", product_id
    );
    let highest_bid = query::handlers::get_highest_bid(&state.db_manager, product_id).await?;
    Ok(Json(serde_json::json!({
        "product_id": product_id,
        "highest_bid": highest_bid
    })))
}

/// 입찰 이력 조회
pub async fn handle_get_bid_history(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    info!("{:<12} --> 입찰 이력 조회 id: {}", "HandlerQuery", product_id);
    query::handlers::get_product(&state.db_manager, product_id).await?;
    let history = query::handlers::get_bid_history(&state.db_manager, product_id).await?;
    Ok(Json(history))
}

/// 이미지 주소로 이동
pub async fn handle_get_image(
    State(state): State<AppState>,
    Path(image_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let image = query::handlers::get_image(&state.db_manager, image_id).await?;
    let view = query::handlers::image_view(&state.images, image);
    Ok(Redirect::temporary(&view.url))
}

/// 관리자 상품 목록
pub async fn handle_get_admin_products(
    State(state): State<AppState>,
    _session: AdminSession,
) -> Result<impl IntoResponse, AppError> {
    info!("{:<12} --> 관리자 상품 목록 조회", "HandlerQuery");
    let products =
        query::handlers::list_products_with_bids(&state.db_manager, &state.images).await?;
    Ok(Json(products))
}

// endregion: --- Query Handlers

// region:    --- Form Parsing
/// multipart 입력 (텍스트 필드 + 이미지 파일)
#[derive(Debug, Default)]
struct ProductForm {
    fields: HashMap<String, String>,
    files: Vec<UploadedFile>,
}

impl ProductForm {
    fn take(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }
}

async fn read_form(mut multipart: Multipart) -> Result<ProductForm, AppError> {
    let mut form = ProductForm::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == IMAGES_FIELD {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.map_err(multipart_error)?;
            if !file_name.is_empty() {
                form.files.push(UploadedFile { file_name, bytes });
            }
        } else {
            let value = field.text().await.map_err(multipart_error)?;
            form.fields.insert(name, value);
        }
    }
    Ok(form)
}

/// 체크박스 값 해석
fn parse_flag(value: &str) -> Result<bool, AppError> {
    match value.trim().to_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" | "" => Ok(false),
        other => Err(AppError::validation(format!(
            "판매 상태 값이 올바르지 않습니다: {}",
            other
        ))),
    }
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::validation(e.body_text())
}

// endregion: --- Form Parsing

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkbox_values_are_understood() {
        assert!(parse_flag("on").unwrap());
        assert!(parse_flag("TRUE").unwrap());
        assert!(!parse_flag("0").unwrap());
        assert!(!parse_flag("").unwrap());
        assert!(parse_flag("maybe").is_err());
    }
}
// endregion: --- Tests
