/// 상품 관리 커맨드 처리
/// 1. 상품 등록
/// 2. 상품 수정 (+ 이미지 추가)
/// 3. 이미지 삭제
/// 4. 상품 삭제
/// 5. 판매 완료 처리
// region:    --- Imports
use crate::catalog::model::{NewProduct, Product, ProductChanges, UpdatedProduct, UploadedFile};
use crate::catalog::price::Price;
use crate::database::DatabaseManager;
use crate::error::AppError;
use crate::query::{handlers, queries};
use crate::storage::{is_allowed_image, ImageRef, ImageStore};
use chrono::Utc;
use sqlx::{Sqlite, Transaction};
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Statements
const INSERT_PRODUCT: &str = r#"
    INSERT INTO products (title, description, starting_price, is_sold, created_at)
    VALUES ($1, $2, $3, 0, $4)
    RETURNING id
"#;

/// 다음 정렬 순서를 같은 문장 안에서 계산해 넣는다
const APPEND_IMAGE: &str = r#"
    INSERT INTO product_images (product_id, filename, sort_order, created_at)
    SELECT $1, $2, COALESCE(MAX(sort_order), -1) + 1, $3
    FROM product_images
    WHERE product_id = $1
"#;

const REFRESH_COVER: &str = r#"
    UPDATE products
    SET cover_image = (
        SELECT filename FROM product_images
        WHERE product_id = $1
        ORDER BY sort_order ASC, id ASC
        LIMIT 1
    )
    WHERE id = $1
"#;

const UPDATE_PRODUCT: &str = r#"
    UPDATE products SET
        title = COALESCE($1, title),
        description = CASE WHEN $2 THEN $3 ELSE description END,
        starting_price = COALESCE($4, starting_price),
        is_sold = COALESCE($5, is_sold)
    WHERE id = $6
"#;

const DELETE_IMAGE: &str =
    "DELETE FROM product_images WHERE id = $1 RETURNING product_id, filename";
const DELETE_PRODUCT_BIDS: &str = "DELETE FROM bids WHERE product_id = $1";
const DELETE_PRODUCT_IMAGES: &str =
    "DELETE FROM product_images WHERE product_id = $1 RETURNING filename";
const DELETE_PRODUCT: &str = "DELETE FROM products WHERE id = $1";
const MARK_SOLD: &str = "UPDATE products SET is_sold = 1 WHERE id = $1";

// endregion: --- Statements

// region:    --- Commands

/// 1. 상품 등록
/// 이미지 확장자가 하나라도 허용되지 않으면 아무것도 저장하지 않고 거부한다.
pub async fn create_product(
    db_manager: &DatabaseManager,
    images: &ImageStore,
    cmd: NewProduct,
) -> Result<Product, AppError> {
    info!("{:<12} --> 상품 등록 요청: {}", "Command", cmd.title);

    let title = cmd.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::validation("제목은 필수입니다."));
    }
    let starting_price = Price::parse_positive(&cmd.starting_price)
        .ok_or_else(|| AppError::validation("시작가가 올바르지 않습니다."))?;

    let files: Vec<&UploadedFile> = cmd
        .images
        .iter()
        .filter(|file| !file.file_name.trim().is_empty())
        .collect();
    if files.is_empty() {
        return Err(AppError::validation("최소 1개의 이미지가 필요합니다."));
    }
    if let Some(invalid) = files.iter().find(|file| !is_allowed_image(&file.file_name)) {
        return Err(AppError::validation(format!(
            "허용되지 않는 파일 형식입니다: {}",
            invalid.file_name
        )));
    }

    let mut stored = Vec::with_capacity(files.len());
    for file in files {
        if let Some(image) = store_image(images, &file.file_name, &file.bytes).await {
            stored.push(image);
        }
    }
    if stored.is_empty() {
        return Err(AppError::validation("저장할 수 있는 이미지가 없습니다."));
    }

    let description = normalize_description(cmd.description);
    let result = async {
        let mut tx = db_manager.begin().await?;
        let product_id =
            insert_product(&mut tx, &title, description.as_deref(), starting_price).await?;
        for image in &stored {
            append_image(&mut tx, product_id, image).await?;
        }
        refresh_cover(&mut tx, product_id).await?;
        let product = fetch_product(&mut tx, product_id).await?;
        tx.commit().await?;
        Ok::<_, sqlx::Error>(product)
    }
    .await;

    match result {
        Ok(product) => {
            info!(
                "{:<12} --> 상품 등록 완료 id: {}, 이미지 {}개",
                "Command",
                product.id,
                stored.len()
            );
            Ok(product)
        }
        Err(e) => {
            images.remove_all(&stored).await;
            Err(e.into())
        }
    }
}

/// 2. 상품 수정
/// 주어진 필드만 바꾸고, 새 이미지는 파일 단위로 건너뛰며 뒤에 붙인다.
pub async fn update_product(
    db_manager: &DatabaseManager,
    images: &ImageStore,
    product_id: i64,
    changes: ProductChanges,
) -> Result<UpdatedProduct, AppError> {
    info!("{:<12} --> 상품 수정 요청 id: {}", "Command", product_id);

    handlers::get_product(db_manager, product_id).await?;

    let title = match changes.title {
        Some(title) => {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(AppError::validation("제목은 필수입니다."));
            }
            Some(title)
        }
        None => None,
    };

    let starting_price = match changes
        .starting_price
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
    {
        Some(text) => Some(
            Price::parse_positive(text)
                .ok_or_else(|| AppError::validation("시작가가 올바르지 않습니다."))?,
        ),
        None => None,
    };

    let description_supplied = changes.description.is_some();
    let description = normalize_description(changes.description);

    let mut images_skipped = 0;
    let mut stored = Vec::new();
    for file in changes
        .images
        .iter()
        .filter(|file| !file.file_name.trim().is_empty())
    {
        if !is_allowed_image(&file.file_name) {
            warn!(
                "{:<12} --> 허용되지 않는 파일 건너뜀: {}",
                "Command", file.file_name
            );
            images_skipped += 1;
            continue;
        }
        match store_image(images, &file.file_name, &file.bytes).await {
            Some(image) => stored.push(image),
            None => images_skipped += 1,
        }
    }

    let result = async {
        let mut tx = db_manager.begin().await?;
        let updated = sqlx::query(UPDATE_PRODUCT)
            .bind(title)
            .bind(description_supplied)
            .bind(description)
            .bind(starting_price)
            .bind(changes.is_sold)
            .bind(product_id)
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        for image in &stored {
            append_image(&mut tx, product_id, image).await?;
        }
        refresh_cover(&mut tx, product_id).await?;
        let product = fetch_product(&mut tx, product_id).await?;
        tx.commit().await?;
        Ok::<_, sqlx::Error>(Some(product))
    }
    .await;

    match result {
        Ok(Some(product)) => {
            info!(
                "{:<12} --> 상품 수정 완료 id: {}, 이미지 추가 {}개, 건너뜀 {}개",
                "Command",
                product_id,
                stored.len(),
                images_skipped
            );
            Ok(UpdatedProduct {
                product,
                images_added: stored.len(),
                images_skipped,
            })
        }
        Ok(None) => {
            images.remove_all(&stored).await;
            Err(AppError::NotFound("상품을 찾을 수 없습니다."))
        }
        Err(e) => {
            images.remove_all(&stored).await;
            Err(e.into())
        }
    }
}

/// 3. 이미지 삭제
/// 행 삭제와 커버 재계산을 한 트랜잭션으로 처리하고, 파일 삭제는 그 뒤에 best-effort.
pub async fn delete_image(
    db_manager: &DatabaseManager,
    images: &ImageStore,
    image_id: i64,
) -> Result<i64, AppError> {
    info!("{:<12} --> 이미지 삭제 요청 id: {}", "Command", image_id);

    let mut tx = db_manager.begin().await?;
    let deleted: Option<(i64, String)> = sqlx::query_as(DELETE_IMAGE)
        .bind(image_id)
        .fetch_optional(&mut *tx)
        .await?;
    let Some((product_id, filename)) = deleted else {
        return Err(AppError::NotFound("이미지를 찾을 수 없습니다."));
    };
    refresh_cover(&mut tx, product_id).await?;
    tx.commit().await?;

    images.remove(&ImageRef::parse(&filename)).await;
    info!(
        "{:<12} --> 이미지 삭제 완료 id: {}, 상품: {}",
        "Command", image_id, product_id
    );
    Ok(product_id)
}

/// 4. 상품 삭제 (입찰, 이미지, 상품을 한 트랜잭션으로)
pub async fn delete_product(
    db_manager: &DatabaseManager,
    images: &ImageStore,
    product_id: i64,
) -> Result<(), AppError> {
    info!("{:<12} --> 상품 삭제 요청 id: {}", "Command", product_id);

    let mut tx = db_manager.begin().await?;
    let bids = sqlx::query(DELETE_PRODUCT_BIDS)
        .bind(product_id)
        .execute(&mut *tx)
        .await?;
    let filenames: Vec<String> = sqlx::query_scalar(DELETE_PRODUCT_IMAGES)
        .bind(product_id)
        .fetch_all(&mut *tx)
        .await?;
    let deleted = sqlx::query(DELETE_PRODUCT)
        .bind(product_id)
        .execute(&mut *tx)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("상품을 찾을 수 없습니다."));
    }
    tx.commit().await?;

    let refs: Vec<ImageRef> = filenames.iter().map(|name| ImageRef::parse(name)).collect();
    images.remove_all(&refs).await;
    info!(
        "{:<12} --> 상품 삭제 완료 id: {}, 입찰 {}건, 이미지 {}개",
        "Command",
        product_id,
        bids.rows_affected(),
        refs.len()
    );
    Ok(())
}

/// 5. 판매 완료 처리 (여러 번 호출해도 같은 결과)
pub async fn mark_sold(db_manager: &DatabaseManager, product_id: i64) -> Result<(), AppError> {
    info!("{:<12} --> 판매 완료 처리 id: {}", "Command", product_id);
    let updated = sqlx::query(MARK_SOLD)
        .bind(product_id)
        .execute(db_manager.pool())
        .await?;
    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound("상품을 찾을 수 없습니다."));
    }
    Ok(())
}

// endregion: --- Commands

// region:    --- Shared Steps

/// 이미지 한 개 저장 (실패하면 로그 후 None)
pub(crate) async fn store_image(images: &ImageStore, file_name: &str, bytes: &[u8]) -> Option<ImageRef> {
    match images.save(file_name, bytes).await {
        Ok(image) => Some(image),
        Err(e) => {
            warn!("{:<12} --> 이미지 저장 실패 {}: {}", "Storage", file_name, e);
            None
        }
    }
}

pub(crate) async fn insert_product(
    tx: &mut Transaction<'_, Sqlite>,
    title: &str,
    description: Option<&str>,
    starting_price: Price,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(INSERT_PRODUCT)
        .bind(title)
        .bind(description)
        .bind(starting_price)
        .bind(Utc::now())
        .fetch_one(&mut **tx)
        .await
}

pub(crate) async fn append_image(
    tx: &mut Transaction<'_, Sqlite>,
    product_id: i64,
    image: &ImageRef,
) -> Result<(), sqlx::Error> {
    sqlx::query(APPEND_IMAGE)
        .bind(product_id)
        .bind(image.as_stored())
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// 커버 = (sort_order, id) 가 가장 작은 이미지, 없으면 NULL
pub(crate) async fn refresh_cover(
    tx: &mut Transaction<'_, Sqlite>,
    product_id: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(REFRESH_COVER)
        .bind(product_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub(crate) async fn fetch_product(
    tx: &mut Transaction<'_, Sqlite>,
    product_id: i64,
) -> Result<Product, sqlx::Error> {
    sqlx::query_as::<_, Product>(queries::GET_PRODUCT)
        .bind(product_id)
        .fetch_one(&mut **tx)
        .await
}

/// 빈 설명은 NULL 로 저장
fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

// endregion: --- Shared Steps
