// region:    --- Imports
use super::StorageError;
use crate::config::CloudinaryConfig;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::time::Duration;
use tracing::info;

// endregion: --- Imports

const UPLOAD_FOLDER: &str = "nofa";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
}

// region:    --- Cloudinary Client
/// Cloudinary 업로드 클라이언트 (서명 업로드)
pub struct CloudinaryClient {
    http: Client,
    config: CloudinaryConfig,
}

impl CloudinaryClient {
    pub fn new(config: CloudinaryConfig) -> Result<Self, StorageError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StorageError::Cdn(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/upload",
            self.config.cloud_name
        )
    }

    /// 이미지 업로드 후 URL 반환
    pub async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, StorageError> {
        let timestamp = Utc::now().timestamp().to_string();
        let params = [
            ("folder", UPLOAD_FOLDER),
            ("overwrite", "false"),
            ("timestamp", timestamp.as_str()),
        ];
        let signature = sign(&params, &self.config.api_secret);

        let mut form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name.to_string()))
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature);
        for (key, value) in params {
            form = form.text(key.to_string(), value.to_string());
        }

        info!("{:<12} --> CDN 업로드: {}", "Cloudinary", file_name);
        let response = self
            .http
            .post(self.endpoint())
            .multipart(form)
            .send()
            .await
            .map_err(|e| StorageError::Cdn(e.to_string()))?
            .error_for_status()
            .map_err(|e| StorageError::Cdn(e.to_string()))?;

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| StorageError::Cdn(e.to_string()))?;

        body.secure_url
            .or(body.url)
            .ok_or_else(|| StorageError::Cdn("응답에 URL 이 없습니다".to_string()))
    }
}

/// 요청 서명: 키 정렬된 "k=v&k=v" + secret 의 SHA-1
fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    let mut hasher = Sha1::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

// endregion: --- Cloudinary Client

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_matches_documented_example() {
        // Cloudinary 문서의 서명 예제
        let signature = sign(
            &[
                ("timestamp", "1315060510"),
                ("public_id", "sample_image"),
                ("eager", "w_400,h_300,c_pad|w_260,h_200,c_crop"),
            ],
            "abcd",
        );
        assert_eq!(signature, "bfd09f95f331f558cbd1320e67aa8d488770583e");
    }
}
