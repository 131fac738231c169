use crate::catalog::price::Price;
use crate::bidding::model::Bid;
use axum::body::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;

// 상품 모델
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub starting_price: Price,
    pub is_sold: bool,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

// 상품 이미지 모델
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductImage {
    pub id: i64,
    pub product_id: i64,
    pub filename: String,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
}

// 목록 조회용 상품 요약
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductSummaryRow {
    #[sqlx(flatten)]
    pub product: Product,
    pub highest_bid: Option<Price>,
    pub image_count: i64,
}

/// 표시용 이미지 (저장 참조 + 실제 주소)
#[derive(Debug, Clone, Serialize)]
pub struct ImageView {
    pub id: i64,
    pub filename: String,
    pub sort_order: i64,
    pub url: String,
}

/// 목록 화면 항목
#[derive(Debug, Clone, Serialize)]
pub struct ProductSummary {
    #[serde(flatten)]
    pub product: Product,
    pub cover_url: String,
    pub highest_bid: Option<Price>,
    pub current_price: Price,
    pub image_count: i64,
}

/// 상세 화면
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub cover_url: String,
    pub current_price: Price,
    pub bids: Vec<Bid>,
    pub images: Vec<ImageView>,
}

/// 관리자 목록 항목
#[derive(Debug, Clone, Serialize)]
pub struct AdminProductView {
    #[serde(flatten)]
    pub product: Product,
    pub cover_url: String,
    pub bids: Vec<Bid>,
}

/// 업로드된 파일
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Bytes,
}

/// 상품 등록 명령 (입력 원문 그대로)
#[derive(Debug, Clone, Default)]
pub struct NewProduct {
    pub title: String,
    pub description: Option<String>,
    pub starting_price: String,
    pub images: Vec<UploadedFile>,
}

/// 상품 수정 명령 (None 이면 기존 값 유지)
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub starting_price: Option<String>,
    pub is_sold: Option<bool>,
    pub images: Vec<UploadedFile>,
}

/// 상품 수정 결과
#[derive(Debug, Clone, Serialize)]
pub struct UpdatedProduct {
    pub product: Product,
    pub images_added: usize,
    pub images_skipped: usize,
}
