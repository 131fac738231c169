/// 상품 컬럼
macro_rules! product_columns {
    () => {
        "p.id AS id, p.title AS title, p.description AS description, \
         p.starting_price AS starting_price, p.is_sold AS is_sold, \
         p.cover_image AS cover_image, p.created_at AS created_at"
    };
}

/// 상품 조회
pub const GET_PRODUCT: &str = concat!(
    "SELECT ",
    product_columns!(),
    " FROM products p WHERE p.id = $1"
);

/// 제목으로 상품 조회 (일괄 등록)
pub const GET_PRODUCT_BY_TITLE: &str = concat!(
    "SELECT ",
    product_columns!(),
    " FROM products p WHERE p.title = $1 ORDER BY p.id LIMIT 1"
);

/// 상품 목록 조회 (미판매 먼저, 최신순)
pub const GET_PRODUCT_SUMMARIES: &str = concat!(
    "SELECT ",
    product_columns!(),
    ",
        (SELECT MAX(b.amount) FROM bids b WHERE b.product_id = p.id) AS highest_bid,
        (SELECT COUNT(*) FROM product_images i WHERE i.product_id = p.id) AS image_count
    FROM products p
    ORDER BY p.is_sold ASC, p.created_at DESC, p.id DESC"
);

/// 관리자 상품 목록 조회 (최신순)
pub const GET_ALL_PRODUCTS: &str = concat!(
    "SELECT ",
    product_columns!(),
    " FROM products p ORDER BY p.created_at DESC, p.id DESC"
);

/// 현재 가격 조회: max(최고 입찰가, 시작가)
/// 시작가를 입찰보다 높게 수정한 경우에도 목록/상세 화면과 같은 값
pub const GET_HIGHEST_BID: &str = r#"
    SELECT MAX(
        COALESCE((SELECT MAX(amount) FROM bids WHERE product_id = p.id), p.starting_price),
        p.starting_price
    ) AS highest_bid
    FROM products p
    WHERE p.id = $1
"#;

/// 입찰 이력 조회 (금액 내림차순, 먼저 들어온 입찰 우선)
pub const GET_BID_HISTORY: &str = r#"
    SELECT id, product_id, bidder_name, bidder_email, amount, created_at
    FROM bids
    WHERE product_id = $1
    ORDER BY amount DESC, created_at ASC, id ASC
"#;

/// 상품 이미지 조회 (정렬 순서, id 순)
pub const GET_PRODUCT_IMAGES: &str = r#"
    SELECT id, product_id, filename, sort_order, created_at
    FROM product_images
    WHERE product_id = $1
    ORDER BY sort_order ASC, id ASC
"#;

/// 이미지 조회
pub const GET_IMAGE: &str =
    "SELECT id, product_id, filename, sort_order, created_at FROM product_images WHERE id = $1";
