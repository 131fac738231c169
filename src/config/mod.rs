/// 환경 변수 기반 설정
/// .env 파일이 있으면 먼저 읽고, 없는 값은 기본값을 사용한다.
// region:    --- Imports
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Constants
const DEFAULT_DATABASE_URL: &str = "sqlite://store.db";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_UPLOAD_DIR: &str = "static/uploads";
const DEFAULT_PLACEHOLDER_IMAGE: &str = "/static/placeholder.png";

/// 메일 설정 키 (모두 있어야 메일 발송)
pub const MAIL_KEYS: [&str; 6] = [
    "SMTP_SERVER",
    "SMTP_PORT",
    "SMTP_USERNAME",
    "SMTP_PASSWORD",
    "FROM_EMAIL",
    "ADMIN_EMAIL",
];

// endregion: --- Constants

// region:    --- Errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

// endregion: --- Errors

// region:    --- Config Model
/// SMTP 메일 설정
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub admin_email: String,
}

/// Cloudinary 설정
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

/// 애플리케이션 설정
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub placeholder_image: String,
    pub admin_password: String,
    pub mail: Option<MailConfig>,
    pub missing_mail_keys: Vec<&'static str>,
    pub cloudinary: Option<CloudinaryConfig>,
}

// endregion: --- Config Model

// region:    --- Loading
impl Config {
    /// 환경 변수에서 설정 읽기
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            info!("{:<12} --> .env 로드: {}", "Config", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 임의의 조회 함수로 설정 구성 (빈 문자열은 없는 값으로 취급)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match get("PORT") {
            Some(value) => parse_port("PORT", value)?,
            None => DEFAULT_PORT,
        };

        let missing_mail_keys: Vec<&'static str> = MAIL_KEYS
            .iter()
            .copied()
            .filter(|key| get(*key).is_none())
            .collect();

        let mail = match (
            get("SMTP_SERVER"),
            get("SMTP_PORT"),
            get("SMTP_USERNAME"),
            get("SMTP_PASSWORD"),
            get("FROM_EMAIL"),
            get("ADMIN_EMAIL"),
        ) {
            (
                Some(server),
                Some(port),
                Some(username),
                Some(password),
                Some(from_email),
                Some(admin_email),
            ) => Some(MailConfig {
                server,
                port: parse_port("SMTP_PORT", port)?,
                username,
                password,
                from_email,
                admin_email,
            }),
            _ => None,
        };

        let cloudinary = match (
            get("CLOUDINARY_CLOUD_NAME"),
            get("CLOUDINARY_API_KEY"),
            get("CLOUDINARY_API_SECRET"),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
            }),
            _ => None,
        };

        // 비밀번호는 공백까지 그대로 비교하므로 trim 하지 않는다
        let admin_password = lookup("ADMIN_PASSWORD").unwrap_or_default();
        if admin_password.is_empty() {
            warn!("{:<12} --> ADMIN_PASSWORD 미설정", "Config");
        }

        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            port,
            upload_dir: get("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
            placeholder_image: get("PLACEHOLDER_IMAGE")
                .unwrap_or_else(|| DEFAULT_PLACEHOLDER_IMAGE.to_string()),
            admin_password,
            mail,
            missing_mail_keys,
            cloudinary,
        })
    }

    /// 서버 바인드 주소
    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn parse_port(key: &'static str, value: String) -> Result<u16, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}

// endregion: --- Loading

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.bind_addr(), "0.0.0.0:5000");
        assert!(config.mail.is_none());
        assert_eq!(config.missing_mail_keys.len(), MAIL_KEYS.len());
        assert!(config.cloudinary.is_none());
    }

    #[test]
    fn mail_requires_every_key() {
        let partial = config_from(&[
            ("SMTP_SERVER", "smtp.example.com"),
            ("SMTP_PORT", "587"),
            ("SMTP_USERNAME", "shop"),
            ("FROM_EMAIL", "shop@example.com"),
            ("ADMIN_EMAIL", "owner@example.com"),
        ])
        .unwrap();
        assert!(partial.mail.is_none());
        assert_eq!(partial.missing_mail_keys, vec!["SMTP_PASSWORD"]);

        let full = config_from(&[
            ("SMTP_SERVER", "smtp.example.com"),
            ("SMTP_PORT", "587"),
            ("SMTP_USERNAME", "shop"),
            ("SMTP_PASSWORD", "secret"),
            ("FROM_EMAIL", "shop@example.com"),
            ("ADMIN_EMAIL", "owner@example.com"),
        ])
        .unwrap();
        assert_eq!(full.mail.unwrap().port, 587);
    }

    #[test]
    fn invalid_port_is_rejected() {
        assert!(matches!(
            config_from(&[("PORT", "abc")]),
            Err(ConfigError::InvalidValue { key: "PORT", .. })
        ));
    }
}
// endregion: --- Tests
