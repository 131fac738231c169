// region:    --- Imports
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use vintage_auction::auth::AdminSessions;
use vintage_auction::config::Config;
use vintage_auction::database::DatabaseManager;
use vintage_auction::notification::SmtpNotifier;
use vintage_auction::routes::create_router;
use vintage_auction::state::AppState;
use vintage_auction::storage::cloudinary::CloudinaryClient;
use vintage_auction::storage::ImageStore;
// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // logging 초기화
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    // 설정 로드
    let config = Config::from_env()?;
    if config.admin_password.is_empty() {
        warn!("{:<12} --> ADMIN_PASSWORD 가 비어 있습니다", "Main");
    }

    // DatabaseManager 생성
    let db_manager = Arc::new(DatabaseManager::connect(&config.database_url).await?);

    // 데이터베이스 초기화
    if let Err(e) = db_manager.initialize_database().await {
        error!("{:<12} --> 데이터베이스 초기화 실패: {:?}", "Main", e);
        return Err(e.into());
    }
    info!("{:<12} --> 데이터베이스 초기화 성공", "Main");

    // 이미지 저장소 (Cloudinary 설정이 있으면 CDN 우선)
    let cdn = match config.cloudinary.clone() {
        Some(cloudinary) => Some(CloudinaryClient::new(cloudinary)?),
        None => None,
    };
    let images = ImageStore::new(
        config.upload_dir.clone(),
        config.placeholder_image.clone(),
        cdn,
    );
    images.ensure_upload_dir().await?;

    // 알림, 세션
    let notifier = SmtpNotifier::new(config.mail.as_ref())?;
    let sessions = AdminSessions::new(config.admin_password.clone());

    let bind_addr = config.bind_addr();
    let state = AppState {
        db_manager,
        images: Arc::new(images),
        notifier: Arc::new(notifier),
        sessions: Arc::new(sessions),
        config: Arc::new(config),
    };

    // 라우터 설정
    let routes_all = create_router(state);

    // 리스너 생성
    let listener = TcpListener::bind(&bind_addr).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    // 서버 실행
    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
