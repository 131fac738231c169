/// 이미지 저장소
/// 1. 로컬 업로드 디렉터리
/// 2. 외부 CDN (Cloudinary, 설정된 경우 우선 사용)
// region:    --- Imports
pub mod cloudinary;

use self::cloudinary::CloudinaryClient;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

// endregion: --- Imports

// region:    --- Constants
/// 허용 이미지 확장자
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "webp", "gif"];

const FALLBACK_FILE_NAME: &str = "image";

// endregion: --- Constants

// region:    --- Errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("file system error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cdn upload failed: {0}")]
    Cdn(String),
}

// endregion: --- Errors

// region:    --- Image Reference
/// 저장된 이미지 참조
/// 외부 URL 이면 Remote, 아니면 업로드 디렉터리 안의 파일명
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    Local(String),
    Remote(String),
}

impl ImageRef {
    pub fn parse(stored: &str) -> Self {
        let lower = stored.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Remote(stored.to_string())
        } else {
            Self::Local(stored.to_string())
        }
    }

    /// DB 에 저장되는 값
    pub fn as_stored(&self) -> &str {
        match self {
            Self::Local(name) | Self::Remote(name) => name,
        }
    }

    /// 경로의 마지막 조각 (URL 이면 쿼리 제외)
    pub fn file_name(&self) -> &str {
        let raw = match self {
            Self::Local(name) => name.as_str(),
            Self::Remote(url) => url.split(['?', '#']).next().unwrap_or(url),
        };
        raw.rsplit('/').next().unwrap_or(raw)
    }

    /// 확장자를 뺀 파일명 (소문자)
    pub fn stem_lowercase(&self) -> String {
        file_stem(self.file_name()).to_lowercase()
    }
}

// endregion: --- Image Reference

// region:    --- File Names
/// 허용된 이미지 확장자인지 확인 (대소문자 무시)
pub fn is_allowed_image(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| {
            ALLOWED_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

/// 업로드 파일명 정리
/// 경로 제거, ASCII 영숫자와 . - _ 만 남기고 공백은 _ 로 바꾼다.
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let cleaned: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    let (stem, ext) = match cleaned.rsplit_once('.') {
        Some((stem, ext)) => (stem, Some(ext).filter(|ext| !ext.is_empty())),
        None => (cleaned.as_str(), None),
    };
    let stem = match stem.trim_start_matches('.') {
        "" => FALLBACK_FILE_NAME,
        stem => stem,
    };
    match ext {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem.to_string(),
    }
}

fn file_stem(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    }
}

/// 충돌 시 후보 파일명: name.ext, name_1.ext, name_2.ext ...
fn candidate_name(file_name: &str, attempt: u32) -> String {
    if attempt == 0 {
        return file_name.to_string();
    }
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}_{}.{}", stem, attempt, ext),
        _ => format!("{}_{}", file_name, attempt),
    }
}

// endregion: --- File Names

// region:    --- Image Store
pub struct ImageStore {
    upload_dir: PathBuf,
    placeholder: String,
    cdn: Option<CloudinaryClient>,
}

impl ImageStore {
    pub fn new(upload_dir: PathBuf, placeholder: String, cdn: Option<CloudinaryClient>) -> Self {
        if cdn.is_none() {
            info!(
                "{:<12} --> CDN 미설정, 로컬 업로드 디렉터리 사용: {}",
                "Storage",
                upload_dir.display()
            );
        }
        Self {
            upload_dir,
            placeholder,
            cdn,
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// 업로드 디렉터리 생성
    pub async fn ensure_upload_dir(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        Ok(())
    }

    /// 이미지 저장 (CDN 우선, 실패 시 로컬)
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<ImageRef, StorageError> {
        if let Some(cdn) = &self.cdn {
            match cdn.upload(original_name, bytes.to_vec()).await {
                Ok(url) => return Ok(ImageRef::Remote(url)),
                Err(e) => warn!(
                    "{:<12} --> CDN 업로드 실패, 로컬 저장으로 대체: {}",
                    "Storage", e
                ),
            }
        }
        let stored = self.save_local(original_name, bytes).await?;
        Ok(ImageRef::Local(stored))
    }

    /// 로컬 저장
    /// create_new 로 파일을 만들어 같은 이름의 동시 업로드도 서로 덮어쓰지 않는다.
    pub async fn save_local(&self, original_name: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let file_name = sanitize_file_name(original_name);
        let mut attempt = 0;
        loop {
            let candidate = candidate_name(&file_name, attempt);
            let path = self.upload_dir.join(&candidate);
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    if let Err(e) = write_all(&mut file, bytes).await {
                        drop(file);
                        let _ = tokio::fs::remove_file(&path).await;
                        return Err(e.into());
                    }
                    debug!("{:<12} --> 로컬 저장: {}", "Storage", candidate);
                    return Ok(candidate);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// 저장된 이미지 삭제 (best-effort, 실패는 로그만 남긴다)
    pub async fn remove(&self, image: &ImageRef) {
        match image {
            ImageRef::Remote(url) => {
                debug!("{:<12} --> 외부 이미지는 삭제하지 않음: {}", "Storage", url);
            }
            ImageRef::Local(name) => {
                let Some(path) = self.local_path(name) else {
                    warn!("{:<12} --> 잘못된 로컬 경로: {}", "Storage", name);
                    return;
                };
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => debug!("{:<12} --> 파일 삭제: {}", "Storage", name),
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        debug!("{:<12} --> 이미 없는 파일: {}", "Storage", name)
                    }
                    Err(e) => warn!("{:<12} --> 파일 삭제 실패 {}: {}", "Storage", name, e),
                }
            }
        }
    }

    /// 여러 이미지 삭제 (best-effort)
    pub async fn remove_all(&self, images: &[ImageRef]) {
        for image in images {
            self.remove(image).await;
        }
    }

    /// 표시 주소 결정: 외부 URL 그대로 / 로컬 파일이 있으면 /uploads/ / 없으면 placeholder
    pub fn resolve(&self, image: &ImageRef) -> String {
        match image {
            ImageRef::Remote(url) => url.clone(),
            ImageRef::Local(name) => match self.local_path(name) {
                Some(path) if path.is_file() => format!("/uploads/{}", urlencoding::encode(name)),
                _ => self.placeholder.clone(),
            },
        }
    }

    /// 커버가 없는 상품도 placeholder 로 처리
    pub fn resolve_optional(&self, stored: Option<&str>) -> String {
        match stored.filter(|s| !s.is_empty()) {
            Some(stored) => self.resolve(&ImageRef::parse(stored)),
            None => self.placeholder.clone(),
        }
    }

    /// 업로드 디렉터리 밖을 가리키는 이름은 거부
    fn local_path(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return None;
        }
        Some(self.upload_dir.join(name))
    }
}

async fn write_all(file: &mut tokio::fs::File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await
}

// endregion: --- Image Store

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path) -> ImageStore {
        ImageStore::new(dir.to_path_buf(), "/static/placeholder.png".to_string(), None)
    }

    #[test]
    fn extension_check_ignores_case() {
        assert!(is_allowed_image("lamp.JPG"));
        assert!(is_allowed_image("lamp.webp"));
        assert!(!is_allowed_image("lamp.txt"));
        assert!(!is_allowed_image("lamp"));
        assert!(!is_allowed_image("jpg"));
    }

    #[test]
    fn sanitizes_file_names() {
        assert_eq!(sanitize_file_name("../../etc/passwd.png"), "passwd.png");
        assert_eq!(sanitize_file_name("my lamp (1).jpg"), "my_lamp_1.jpg");
        assert_eq!(sanitize_file_name(".hidden.png"), "hidden.png");
        assert_eq!(sanitize_file_name("é.png"), "image.png");
        assert_eq!(sanitize_file_name(""), "image");
    }

    #[test]
    fn candidate_names_append_suffix_before_extension() {
        assert_eq!(candidate_name("a.jpg", 0), "a.jpg");
        assert_eq!(candidate_name("a.jpg", 2), "a_2.jpg");
        assert_eq!(candidate_name("a", 1), "a_1");
    }

    #[test]
    fn image_refs_detect_urls() {
        let remote = ImageRef::parse("https://res.cloudinary.com/demo/image/upload/v1/nofa/Lamp.JPG?x=1");
        assert!(matches!(remote, ImageRef::Remote(_)));
        assert_eq!(remote.file_name(), "Lamp.JPG");
        assert_eq!(remote.stem_lowercase(), "lamp");
        assert_eq!(ImageRef::parse("a.jpg"), ImageRef::Local("a.jpg".to_string()));
    }

    #[tokio::test]
    async fn same_name_uploads_never_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let first = store.save_local("a.jpg", b"first").await.unwrap();
        let second = store.save_local("a.jpg", b"second").await.unwrap();
        let third = store.save_local("a.jpg", b"third").await.unwrap();

        assert_eq!(first, "a.jpg");
        assert_eq!(second, "a_1.jpg");
        assert_eq!(third, "a_2.jpg");
        assert_eq!(std::fs::read(dir.path().join("a.jpg")).unwrap(), b"first");
        assert_eq!(std::fs::read(dir.path().join("a_1.jpg")).unwrap(), b"second");
    }

    #[tokio::test]
    async fn concurrent_same_name_uploads_get_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(store(dir.path()));

        let mut handles = Vec::new();
        for i in 0..8u8 {
            let store = std::sync::Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.save_local("lamp.png", &[i]).await.unwrap()
            }));
        }
        let mut names = Vec::new();
        for handle in handles {
            names.push(handle.await.unwrap());
        }
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 8);
    }

    #[tokio::test]
    async fn resolution_is_url_then_local_then_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let stored = store.save_local("a.jpg", b"x").await.unwrap();

        assert_eq!(
            store.resolve(&ImageRef::parse("https://cdn.example.com/a.jpg")),
            "https://cdn.example.com/a.jpg"
        );
        assert_eq!(store.resolve(&ImageRef::Local(stored)), "/uploads/a.jpg");
        assert_eq!(
            store.resolve(&ImageRef::Local("missing.jpg".to_string())),
            "/static/placeholder.png"
        );
        assert_eq!(store.resolve_optional(None), "/static/placeholder.png");
    }

    #[tokio::test]
    async fn legacy_names_are_percent_encoded() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        std::fs::write(dir.path().join("old lamp #1?.jpg"), b"x").unwrap();

        assert_eq!(
            store.resolve(&ImageRef::Local("old lamp #1?.jpg".to_string())),
            "/uploads/old%20lamp%20%231%3F.jpg"
        );
    }

    #[tokio::test]
    async fn removing_missing_files_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let stored = store.save_local("b.png", b"x").await.unwrap();

        store.remove(&ImageRef::Local(stored.clone())).await;
        store.remove(&ImageRef::Local(stored.clone())).await;
        assert!(!dir.path().join(stored).exists());
    }
}
// endregion: --- Tests
