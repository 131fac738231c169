#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Bytes;
use sqlx::sqlite::SqliteConnectOptions;
use std::io::Write;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;
use vintage_auction::auth::AdminSessions;
use vintage_auction::catalog::commands;
use vintage_auction::catalog::model::{NewProduct, Product, UploadedFile};
use vintage_auction::config::Config;
use vintage_auction::database::DatabaseManager;
use vintage_auction::notification::{Delivery, NotificationError, Notifier, SmtpNotifier};
use vintage_auction::state::AppState;
use vintage_auction::storage::ImageStore;
use zip::write::SimpleFileOptions;

pub const ADMIN_PASSWORD: &str = "geheim";
pub const PLACEHOLDER: &str = "/static/placeholder.png";

/// 테스트용 상태 (임시 DB 파일 + 임시 업로드 폴더)
pub struct TestContext {
    pub dir: TempDir,
    pub state: AppState,
}

impl TestContext {
    pub fn db(&self) -> &DatabaseManager {
        &self.state.db_manager
    }

    pub fn images(&self) -> &ImageStore {
        &self.state.images
    }

    /// 업로드 폴더의 파일 이름 목록
    pub fn uploaded_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.images().upload_dir())
            .expect("업로드 폴더 읽기 실패")
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }
}

pub async fn setup() -> TestContext {
    setup_with(Arc::new(SmtpNotifier::disabled())).await
}

pub async fn setup_with(notifier: Arc<dyn Notifier>) -> TestContext {
    let dir = tempfile::tempdir().expect("임시 폴더 생성 실패");

    let options = SqliteConnectOptions::new().filename(dir.path().join("store.db"));
    let db_manager = DatabaseManager::connect_with(options)
        .await
        .expect("데이터베이스 연결 실패");
    db_manager
        .initialize_database()
        .await
        .expect("데이터베이스 초기화 실패");

    let images = ImageStore::new(dir.path().join("uploads"), PLACEHOLDER.to_string(), None);
    images
        .ensure_upload_dir()
        .await
        .expect("업로드 폴더 생성 실패");

    let config = Config::from_lookup(|key| match key {
        "ADMIN_PASSWORD" => Some(ADMIN_PASSWORD.to_string()),
        _ => None,
    })
    .expect("설정 생성 실패");

    let state = AppState {
        db_manager: Arc::new(db_manager),
        images: Arc::new(images),
        notifier,
        sessions: Arc::new(AdminSessions::new(config.admin_password.clone())),
        config: Arc::new(config),
    };
    TestContext { dir, state }
}

pub fn upload(file_name: &str) -> UploadedFile {
    UploadedFile {
        file_name: file_name.to_string(),
        bytes: Bytes::from(format!("image bytes of {}", file_name)),
    }
}

/// 테스트용 상품 생성
pub async fn create_test_product(
    ctx: &TestContext,
    title: &str,
    starting_price: &str,
    files: &[&str],
) -> Product {
    let cmd = NewProduct {
        title: title.to_string(),
        description: Some(format!("{} 테스트 상품입니다.", title)),
        starting_price: starting_price.to_string(),
        images: files.iter().map(|name| upload(name)).collect(),
    };
    commands::create_product(ctx.db(), ctx.images(), cmd)
        .await
        .expect("상품 생성 실패")
}

/// (경로, 내용) 목록으로 zip 생성, 경로가 '/' 로 끝나면 폴더
pub fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (path, content) in entries {
        if path.ends_with('/') {
            writer.add_directory(*path, options).expect("폴더 추가 실패");
        } else {
            writer.start_file(*path, options).expect("파일 추가 실패");
            writer
                .write_all(content.as_bytes())
                .expect("파일 쓰기 실패");
        }
    }
    writer.finish().expect("zip 생성 실패").into_inner()
}

/// 보낸 알림을 채널로 넘겨주는 Notifier
pub struct RecordingNotifier {
    sender: mpsc::UnboundedSender<(String, String)>,
}

impl RecordingNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(String, String)>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<Delivery, NotificationError> {
        let _ = self.sender.send((subject.to_string(), body.to_string()));
        Ok(Delivery::Sent)
    }
}

/// 항상 실패하는 Notifier
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _subject: &str, _body: &str) -> Result<Delivery, NotificationError> {
        let err = "not an address"
            .parse::<lettre::Address>()
            .expect_err("잘못된 주소여야 함");
        Err(NotificationError::Address(err))
    }
}
