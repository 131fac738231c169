// region:    --- Imports
use super::queries;
use crate::bidding::model::Bid;
use crate::catalog::model::{
    AdminProductView, ImageView, Product, ProductDetail, ProductImage, ProductSummary,
    ProductSummaryRow,
};
use crate::catalog::price::Price;
use crate::database::DatabaseManager;
use crate::error::AppError;
use crate::storage::{ImageRef, ImageStore};
use sqlx::Error as SqlxError;
use sqlx::Row;
use tracing::info;

// endregion: --- Imports

// region:    --- Query Handlers

/// 상품 조회 (없으면 None)
pub async fn find_product(
    db_manager: &DatabaseManager,
    product_id: i64,
) -> Result<Option<Product>, SqlxError> {
    info!("{:<12} --> 상품 조회 id: {}", "Query", product_id);
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, Product>(queries::GET_PRODUCT)
                    .bind(product_id)
                    .fetch_optional(&mut **tx)
                    .await
            })
        })
        .await
}

/// 상품 조회 (없으면 NotFound)
pub async fn get_product(db_manager: &DatabaseManager, product_id: i64) -> Result<Product, AppError> {
    find_product(db_manager, product_id)
        .await?
        .ok_or(AppError::NotFound("상품을 찾을 수 없습니다."))
}

/// 제목으로 상품 조회
pub async fn find_product_by_title(
    db_manager: &DatabaseManager,
    title: &str,
) -> Result<Option<Product>, SqlxError> {
    info!("{:<12} --> 제목으로 상품 조회: {}", "Query", title);
    let title = title.to_string();
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, Product>(queries::GET_PRODUCT_BY_TITLE)
                    .bind(title)
                    .fetch_optional(&mut **tx)
                    .await
            })
        })
        .await
}

/// 최고 입찰가 조회 (입찰이 없으면 시작가, 상품이 없으면 None)
pub async fn find_highest_bid(
    db_manager: &DatabaseManager,
    product_id: i64,
) -> Result<Option<Price>, SqlxError> {
    info!("{:<12} --> 최고 입찰가 조회 id: {}", "Query", product_id);
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                let result = sqlx::query(queries::GET_HIGHEST_BID)
                    .bind(product_id)
                    .fetch_optional(&mut **tx)
                    .await?;

                match result {
                    Some(row) => Ok(Some(row.try_get::<Price, _>("highest_bid")?)),
                    None => Ok(None),
                }
            })
        })
        .await
}

/// 최고 입찰가 조회 (상품이 없으면 NotFound)
pub async fn get_highest_bid(db_manager: &DatabaseManager, product_id: i64) -> Result<Price, AppError> {
    find_highest_bid(db_manager, product_id)
        .await?
        .ok_or(AppError::NotFound("상품을 찾을 수 없습니다."))
}

/// 입찰 이력 조회
pub async fn get_bid_history(
    db_manager: &DatabaseManager,
    product_id: i64,
) -> Result<Vec<Bid>, SqlxError> {
    info!("{:<12} --> 입찰 이력 조회 id: {}", "Query", product_id);
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, Bid>(queries::GET_BID_HISTORY)
                    .bind(product_id)
                    .fetch_all(&mut **tx)
                    .await
            })
        })
        .await
}

/// 상품 이미지 조회 (정렬 순서대로)
pub async fn get_product_images(
    db_manager: &DatabaseManager,
    product_id: i64,
) -> Result<Vec<ProductImage>, SqlxError> {
    info!("{:<12} --> 상품 이미지 조회 id: {}", "Query", product_id);
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, ProductImage>(queries::GET_PRODUCT_IMAGES)
                    .bind(product_id)
                    .fetch_all(&mut **tx)
                    .await
            })
        })
        .await
}

/// 이미지 조회 (없으면 NotFound)
pub async fn get_image(db_manager: &DatabaseManager, image_id: i64) -> Result<ProductImage, AppError> {
    info!("{:<12} --> 이미지 조회 id: {}", "Query", image_id);
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, ProductImage>(queries::GET_IMAGE)
                    .bind(image_id)
                    .fetch_optional(&mut **tx)
                    .await
            })
        })
        .await?
        .ok_or(AppError::NotFound("이미지를 찾을 수 없습니다."))
}

/// 상품 목록 조회 (미판매 먼저, 최신순)
pub async fn list_products(
    db_manager: &DatabaseManager,
    images: &ImageStore,
) -> Result<Vec<ProductSummary>, SqlxError> {
    info!("{:<12} --> 상품 목록 조회", "Query");
    let rows = db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, ProductSummaryRow>(queries::GET_PRODUCT_SUMMARIES)
                    .fetch_all(&mut **tx)
                    .await
            })
        })
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let current_price = row
                .highest_bid
                .map_or(row.product.starting_price, |bid| {
                    bid.max(row.product.starting_price)
                });
            ProductSummary {
                cover_url: images.resolve_optional(row.product.cover_image.as_deref()),
                product: row.product,
                highest_bid: row.highest_bid,
                current_price,
                image_count: row.image_count,
            }
        })
        .collect())
}

/// 상품 상세 조회 (입찰 이력 + 이미지)
pub async fn get_product_detail(
    db_manager: &DatabaseManager,
    images: &ImageStore,
    product_id: i64,
) -> Result<ProductDetail, AppError> {
    let product = get_product(db_manager, product_id).await?;
    let bids = get_bid_history(db_manager, product_id).await?;
    let product_images = get_product_images(db_manager, product_id).await?;

    let current_price = bids
        .first()
        .map_or(product.starting_price, |bid| bid.amount.max(product.starting_price));

    Ok(ProductDetail {
        cover_url: images.resolve_optional(product.cover_image.as_deref()),
        current_price,
        bids,
        images: product_images
            .into_iter()
            .map(|image| image_view(images, image))
            .collect(),
        product,
    })
}

/// 관리자 상품 목록 (입찰 포함)
pub async fn list_products_with_bids(
    db_manager: &DatabaseManager,
    images: &ImageStore,
) -> Result<Vec<AdminProductView>, SqlxError> {
    info!("{:<12} --> 관리자 상품 목록 조회", "Query");
    let products = db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, Product>(queries::GET_ALL_PRODUCTS)
                    .fetch_all(&mut **tx)
                    .await
            })
        })
        .await?;

    let mut views = Vec::with_capacity(products.len());
    for product in products {
        let bids = get_bid_history(db_manager, product.id).await?;
        views.push(AdminProductView {
            cover_url: images.resolve_optional(product.cover_image.as_deref()),
            product,
            bids,
        });
    }
    Ok(views)
}

/// 표시용 이미지 변환
pub fn image_view(images: &ImageStore, image: ProductImage) -> ImageView {
    let url = images.resolve(&ImageRef::parse(&image.filename));
    ImageView {
        id: image.id,
        filename: image.filename,
        sort_order: image.sort_order,
        url,
    }
}

// endregion: --- Query Handlers
