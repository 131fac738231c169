/// 입찰 관련 커맨드 처리
/// 입찰은 추가만 되는 원장이고, 현재 가격은 항상 집계 쿼리로 다시 계산한다.
// region:    --- Imports
use crate::bidding::model::{Bid, PlaceBidCommand};
use crate::catalog::price::Price;
use crate::database::DatabaseManager;
use crate::error::AppError;
use crate::notification::{dispatch_bid_notification, Notifier};
use crate::query::handlers;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

// endregion: --- Imports

// region:    --- Statements
/// 현재 가격 = max(최고 입찰가, 시작가) 보다 클 때만 들어가는 조건부 입찰 저장
/// 한 문장이라 DB 쓰기 잠금 아래에서 비교와 저장이 함께 일어난다.
const INSERT_BID_IF_HIGHER: &str = r#"
    INSERT INTO bids (product_id, bidder_name, bidder_email, amount, created_at)
    SELECT $1, $2, $3, $4, $5
    WHERE $4 > (
        SELECT MAX(
            COALESCE((SELECT MAX(amount) FROM bids WHERE product_id = $1), p.starting_price),
            p.starting_price
        )
        FROM products p
        WHERE p.id = $1
    )
    RETURNING id, product_id, bidder_name, bidder_email, amount, created_at
"#;

// endregion: --- Statements

// region:    --- Commands

/// 입찰
pub async fn handle_place_bid(
    db_manager: &DatabaseManager,
    notifier: Arc<dyn Notifier>,
    product_id: i64,
    cmd: PlaceBidCommand,
) -> Result<Bid, AppError> {
    info!(
        "{:<12} --> 입찰 요청 처리 시작 product: {}, bidder: {}",
        "Command", product_id, cmd.email
    );

    let name = cmd.name.trim();
    let email = cmd.email.trim();
    let amount_text = cmd.amount_text();
    if name.is_empty() || email.is_empty() || amount_text.trim().is_empty() {
        return Err(AppError::validation("모든 항목을 입력하세요."));
    }
    let amount = Price::parse_positive(&amount_text)
        .ok_or_else(|| AppError::validation("입찰 금액이 올바르지 않습니다."))?;

    let product = handlers::get_product(db_manager, product_id).await?;

    // 빠른 거절 (저장 시 같은 조건을 다시 확인한다)
    let current_price = handlers::get_highest_bid(db_manager, product_id).await?;
    if amount <= current_price {
        return Err(AppError::Conflict { current_price });
    }

    let inserted = sqlx::query_as::<_, Bid>(INSERT_BID_IF_HIGHER)
        .bind(product_id)
        .bind(name)
        .bind(email)
        .bind(amount)
        .bind(Utc::now())
        .fetch_optional(db_manager.pool())
        .await?;

    let bid = match inserted {
        Some(bid) => bid,
        None => {
            // 그 사이 다른 입찰이 먼저 들어왔거나 상품이 삭제됨
            let current_price = handlers::get_highest_bid(db_manager, product_id).await?;
            info!(
                "{:<12} --> 입찰 실패: 현재 가격이 더 높거나 같음 {}",
                "Command", current_price
            );
            return Err(AppError::Conflict { current_price });
        }
    };

    info!(
        "{:<12} --> 입찰 성공 product: {}, amount: {}",
        "Command", product_id, bid.amount
    );

    dispatch_bid_notification(notifier, &product, &bid);
    Ok(bid)
}

// endregion: --- Commands
