/// zip 일괄 등록
/// 하위 폴더 하나가 상품 하나: 폴더명 = 제목, description.txt / price.txt / 이미지 파일
// region:    --- Imports
use crate::catalog::commands::{append_image, fetch_product, insert_product, refresh_cover, store_image};
use crate::catalog::model::Product;
use crate::catalog::price::Price;
use crate::database::DatabaseManager;
use crate::error::AppError;
use crate::query::handlers;
use crate::storage::{is_allowed_image, sanitize_file_name, ImageRef, ImageStore};
use serde::Serialize;
use std::collections::HashSet;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// endregion: --- Imports

const DESCRIPTION_FILE: &str = "description.txt";
const PRICE_FILE: &str = "price.txt";

// region:    --- Model
/// 일괄 등록 결과
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub created: usize,
    pub images_added: usize,
    pub images_skipped: usize,
    pub entries_skipped: usize,
}

/// 압축 해제된 상품 폴더 하나
#[derive(Debug, Clone)]
struct ProductEntry {
    title: String,
    description: Option<String>,
    starting_price: Price,
    images: Vec<PathBuf>,
}

/// 폴더 스캔 결과
#[derive(Debug, Default)]
struct ScannedArchive {
    entries: Vec<ProductEntry>,
    skipped: usize,
}

// endregion: --- Model

// region:    --- Import
/// zip 바이트를 받아 상품 등록
/// 압축 형식 오류만 실패로 돌려주고, 폴더 단위 문제는 건너뛰고 센다.
pub async fn import_archive(
    db_manager: &DatabaseManager,
    images: &ImageStore,
    archive: Vec<u8>,
) -> Result<ImportReport, AppError> {
    import_archive_in(db_manager, images, archive, &std::env::temp_dir()).await
}

/// 작업 폴더 위치를 지정하는 일괄 등록
pub async fn import_archive_in(
    db_manager: &DatabaseManager,
    images: &ImageStore,
    archive: Vec<u8>,
    scratch_root: &Path,
) -> Result<ImportReport, AppError> {
    info!("{:<12} --> 일괄 등록 시작: {} bytes", "Import", archive.len());

    // drop 시 임시 폴더 삭제 (성공/실패 모두)
    let workdir = tempfile::Builder::new()
        .prefix("vintage_import_")
        .tempdir_in(scratch_root)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let root = workdir.path().to_path_buf();
    let scanned = tokio::task::spawn_blocking(move || -> Result<ScannedArchive, AppError> {
        let rejected = extract(archive, &root)?;
        let mut scanned = scan(&root).map_err(|e| AppError::Internal(e.to_string()))?;
        scanned.skipped += rejected;
        Ok(scanned)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    let mut report = ImportReport {
        entries_skipped: scanned.skipped,
        ..ImportReport::default()
    };

    for entry in scanned.entries {
        match handlers::find_product_by_title(db_manager, &entry.title).await? {
            Some(existing) => append_to_product(db_manager, images, existing, entry, &mut report).await?,
            None => create_from_entry(db_manager, images, entry, &mut report).await?,
        }
    }

    drop(workdir);
    info!("{:<12} --> 일괄 등록 완료: {:?}", "Import", report);
    Ok(report)
}

/// 기존 상품에 이미지 추가 (같은 파일명 또는 같은 stem 이면 건너뜀)
async fn append_to_product(
    db_manager: &DatabaseManager,
    images: &ImageStore,
    product: Product,
    entry: ProductEntry,
    report: &mut ImportReport,
) -> Result<(), AppError> {
    let existing: Vec<ImageRef> = handlers::get_product_images(db_manager, product.id)
        .await?
        .iter()
        .map(|image| ImageRef::parse(&image.filename))
        .collect();
    let existing_names: HashSet<String> = existing
        .iter()
        .map(|image| image.file_name().to_string())
        .collect();
    let existing_stems: HashSet<String> = existing.iter().map(ImageRef::stem_lowercase).collect();

    let mut stored = Vec::new();
    for path in &entry.images {
        let Some(original) = path.file_name().and_then(|name| name.to_str()) else {
            report.images_skipped += 1;
            continue;
        };
        let candidate = ImageRef::Local(sanitize_file_name(original));
        if existing_names.contains(candidate.file_name())
            || existing_stems.contains(&candidate.stem_lowercase())
        {
            report.images_skipped += 1;
            continue;
        }
        match read_and_store(images, path, original).await {
            Some(image) => stored.push(image),
            None => report.images_skipped += 1,
        }
    }

    if stored.is_empty() {
        info!(
            "{:<12} --> 추가할 이미지 없음: {}",
            "Import", product.title
        );
        return Ok(());
    }

    let result = async {
        let mut tx = db_manager.begin().await?;
        for image in &stored {
            append_image(&mut tx, product.id, image).await?;
        }
        refresh_cover(&mut tx, product.id).await?;
        tx.commit().await?;
        Ok::<_, sqlx::Error>(())
    }
    .await;

    if let Err(e) = result {
        images.remove_all(&stored).await;
        return Err(e.into());
    }

    info!(
        "{:<12} --> 기존 상품에 이미지 추가 id: {}, {}개",
        "Import",
        product.id,
        stored.len()
    );
    report.images_added += stored.len();
    Ok(())
}

/// 새 상품 등록 (이미지를 하나도 저장하지 못하면 건너뜀)
async fn create_from_entry(
    db_manager: &DatabaseManager,
    images: &ImageStore,
    entry: ProductEntry,
    report: &mut ImportReport,
) -> Result<(), AppError> {
    let mut stored = Vec::new();
    for path in &entry.images {
        let Some(original) = path.file_name().and_then(|name| name.to_str()) else {
            report.images_skipped += 1;
            continue;
        };
        match read_and_store(images, path, original).await {
            Some(image) => stored.push(image),
            None => report.images_skipped += 1,
        }
    }

    if stored.is_empty() {
        warn!(
            "{:<12} --> 저장된 이미지가 없어 건너뜀: {}",
            "Import", entry.title
        );
        report.entries_skipped += 1;
        return Ok(());
    }

    let result = async {
        let mut tx = db_manager.begin().await?;
        let product_id = insert_product(
            &mut tx,
            &entry.title,
            entry.description.as_deref(),
            entry.starting_price,
        )
        .await?;
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
                "{:<12} --> 새 상품 등록 id: {}, {}, 이미지 {}개",
                "Import",
                product.id,
                product.title,
                stored.len()
            );
            report.created += 1;
            report.images_added += stored.len();
            Ok(())
        }
        Err(e) => {
            images.remove_all(&stored).await;
            Err(e.into())
        }
    }
}

async fn read_and_store(images: &ImageStore, path: &Path, original: &str) -> Option<ImageRef> {
    match tokio::fs::read(path).await {
        Ok(bytes) => store_image(images, original, &bytes).await,
        Err(e) => {
            warn!("{:<12} --> 파일 읽기 실패 {}: {}", "Import", original, e);
            None
        }
    }
}

// endregion: --- Import

// region:    --- Archive
/// zip 압축 해제, 건너뛴 항목 수를 돌려준다
/// 압축 폴더 밖을 가리키는 항목은 풀지 않는다. '/' 로 시작하는 항목은
/// 이름 없는 폴더 하나로 보고 한 번만 센다.
fn extract(archive: Vec<u8>, target: &Path) -> Result<usize, AppError> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive)).map_err(archive_error)?;

    let mut rejected = 0;
    let mut untitled = false;
    for index in 0..zip.len() {
        let mut file = zip.by_index(index).map_err(archive_error)?;
        let Some(relative) = file.enclosed_name() else {
            if file.name().starts_with(['/', '\\']) {
                untitled = true;
            } else {
                warn!("{:<12} --> 안전하지 않은 경로 건너뜀: {}", "Import", file.name());
                rejected += 1;
            }
            continue;
        };

        let path = target.join(relative);
        if file.is_dir() {
            std::fs::create_dir_all(&path).map_err(io_error)?;
            continue;
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|e| AppError::ArchiveFormat(e.to_string()))?;
        std::fs::write(&path, bytes).map_err(io_error)?;
    }

    if untitled {
        warn!("{:<12} --> 제목 없는 폴더 건너뜀", "Import");
    }
    Ok(rejected + usize::from(untitled))
}

fn archive_error(e: zip::result::ZipError) -> AppError {
    AppError::ArchiveFormat(e.to_string())
}

fn io_error(e: std::io::Error) -> AppError {
    AppError::Internal(e.to_string())
}

/// 최상위에 폴더 하나만 있으면 그 폴더를 기준으로 삼는다
fn content_root(base: &Path) -> std::io::Result<PathBuf> {
    let mut dirs = Vec::new();
    let mut has_files = false;
    for entry in std::fs::read_dir(base)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        } else {
            has_files = true;
        }
    }
    match (dirs.pop(), dirs.is_empty(), has_files) {
        (Some(only), true, false) if has_product_dirs(&only)? => Ok(only),
        _ => Ok(base.to_path_buf()),
    }
}

/// 감싸는 폴더인지 판단: 안에 하위 폴더가 있어야 한다
fn has_product_dirs(dir: &Path) -> std::io::Result<bool> {
    for entry in std::fs::read_dir(dir)? {
        if entry?.file_type()?.is_dir() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// 상품 폴더 목록 스캔 (이름순)
fn scan(base: &Path) -> std::io::Result<ScannedArchive> {
    let root = content_root(base)?;

    let mut dirs: Vec<PathBuf> = std::fs::read_dir(&root)?
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|entry| entry.path())
        .collect();
    dirs.sort();

    let mut scanned = ScannedArchive::default();
    for dir in dirs {
        match read_entry(&dir) {
            Ok(Some(entry)) => scanned.entries.push(entry),
            Ok(None) => scanned.skipped += 1,
            Err(e) => {
                warn!(
                    "{:<12} --> 폴더 읽기 실패 {}: {}",
                    "Import",
                    dir.display(),
                    e
                );
                scanned.skipped += 1;
            }
        }
    }
    Ok(scanned)
}

/// 상품 폴더 하나 읽기 (제목이 비었거나 이미지가 없으면 None)
fn read_entry(dir: &Path) -> std::io::Result<Option<ProductEntry>> {
    let title = dir
        .file_name()
        .map(|name| name.to_string_lossy().trim().to_string())
        .unwrap_or_default();
    if title.is_empty() {
        warn!("{:<12} --> 제목 없는 폴더 건너뜀", "Import");
        return Ok(None);
    }

    let description = read_text(&dir.join(DESCRIPTION_FILE)).filter(|text| !text.is_empty());
    let starting_price = read_text(&dir.join(PRICE_FILE))
        .map(|text| Price::parse_or_zero(&text))
        .unwrap_or(Price::ZERO);

    let mut images: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map(is_allowed_image)
                .unwrap_or(false)
        })
        .collect();
    images.sort();

    if images.is_empty() {
        warn!("{:<12} --> 이미지 없는 폴더 건너뜀: {}", "Import", title);
        return Ok(None);
    }

    Ok(Some(ProductEntry {
        title,
        description,
        starting_price,
        images,
    }))
}

fn read_text(path: &Path) -> Option<String> {
    std::fs::read_to_string(path)
        .ok()
        .map(|text| text.trim().to_string())
}

// endregion: --- Archive

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn product_dir(root: &Path, name: &str, files: &[(&str, &str)]) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        for (file, content) in files {
            fs::write(dir.join(file), content).unwrap();
        }
    }

    #[test]
    fn reads_title_description_price_and_sorted_images() {
        let root = tempfile::tempdir().unwrap();
        product_dir(
            root.path(),
            "Lamp",
            &[
                ("b.jpg", "b"),
                ("a.jpg", "a"),
                ("notes.txt", "x"),
                (DESCRIPTION_FILE, "  Brass lamp \n"),
                (PRICE_FILE, "45,50"),
            ],
        );

        let scanned = scan(root.path()).unwrap();
        assert_eq!(scanned.skipped, 0);
        let entry = &scanned.entries[0];
        assert_eq!(entry.title, "Lamp");
        assert_eq!(entry.description.as_deref(), Some("Brass lamp"));
        assert_eq!(entry.starting_price, Price::from_cents(4_550));
        let names: Vec<_> = entry
            .images
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn unreadable_price_becomes_zero() {
        let root = tempfile::tempdir().unwrap();
        product_dir(root.path(), "Chair", &[("c.png", "c"), (PRICE_FILE, "gratis")]);
        product_dir(root.path(), "Stool", &[("s.png", "s")]);

        let scanned = scan(root.path()).unwrap();
        assert_eq!(scanned.entries.len(), 2);
        assert!(scanned.entries.iter().all(|e| e.starting_price == Price::ZERO));
    }

    #[test]
    fn single_wrapper_directory_is_unwrapped() {
        let root = tempfile::tempdir().unwrap();
        let wrapper = root.path().join("export");
        product_dir(&wrapper, "Chair", &[("c.png", "c")]);
        product_dir(&wrapper, "Table", &[("t.png", "t")]);

        let scanned = scan(root.path()).unwrap();
        let titles: Vec<_> = scanned.entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Chair", "Table"]);
    }

    #[test]
    fn blank_titles_and_imageless_folders_are_skipped() {
        let root = tempfile::tempdir().unwrap();
        product_dir(root.path(), "  ", &[("x.jpg", "x")]);
        product_dir(root.path(), "Empty", &[(DESCRIPTION_FILE, "nothing")]);
        product_dir(root.path(), "Vase", &[("v.webp", "v")]);

        let scanned = scan(root.path()).unwrap();
        assert_eq!(scanned.skipped, 2);
        assert_eq!(scanned.entries.len(), 1);
        assert_eq!(scanned.entries[0].title, "Vase");
    }

    #[test]
    fn garbage_bytes_are_an_archive_error() {
        let root = tempfile::tempdir().unwrap();
        let result = extract(b"definitely not a zip".to_vec(), root.path());
        assert!(matches!(result, Err(AppError::ArchiveFormat(_))));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_folder_is_skipped_not_fatal() {
        use std::os::unix::fs::PermissionsExt;

        let root = tempfile::tempdir().unwrap();
        product_dir(root.path(), "Locked", &[("l.jpg", "l")]);
        product_dir(root.path(), "Open", &[("o.jpg", "o")]);
        let locked = root.path().join("Locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // root 권한이면 권한과 관계없이 읽힌다
        let readable = fs::read_dir(&locked).is_ok();
        let scanned = scan(root.path());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let scanned = scanned.unwrap();
        if readable {
            assert_eq!(scanned.entries.len(), 2);
        } else {
            assert_eq!(scanned.skipped, 1);
            assert_eq!(scanned.entries.len(), 1);
            assert_eq!(scanned.entries[0].title, "Open");
        }
    }
}
// endregion: --- Tests
