/// 입찰 알림 메일
/// 메일 설정이 모두 있을 때만 발송하고, 실패는 로그만 남긴다.
// region:    --- Imports
use crate::bidding::model::Bid;
use crate::catalog::model::Product;
use crate::config::MailConfig;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

// endregion: --- Imports

// region:    --- Errors
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

// endregion: --- Errors

// region:    --- Notifier Trait
/// 발송 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Disabled,
}

/// 운영자 알림 트레이트
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> Result<Delivery, NotificationError>;
}

// endregion: --- Notifier Trait

// region:    --- SMTP Notifier
struct SmtpSettings {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

/// SMTP 알림 구현체 (설정이 없으면 아무것도 하지 않음)
pub struct SmtpNotifier {
    settings: Option<SmtpSettings>,
}

impl SmtpNotifier {
    pub fn new(config: Option<&MailConfig>) -> Result<Self, NotificationError> {
        let Some(config) = config else {
            info!("{:<12} --> 메일 설정 없음, 알림 비활성화", "Notifier");
            return Ok(Self::disabled());
        };

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self {
            settings: Some(SmtpSettings {
                transport,
                from: config.from_email.parse()?,
                to: config.admin_email.parse()?,
            }),
        })
    }

    pub fn disabled() -> Self {
        Self { settings: None }
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<Delivery, NotificationError> {
        let Some(settings) = &self.settings else {
            return Ok(Delivery::Disabled);
        };

        let message = Message::builder()
            .from(settings.from.clone())
            .to(settings.to.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        settings.transport.send(message).await?;
        Ok(Delivery::Sent)
    }
}

// endregion: --- SMTP Notifier

// region:    --- Dispatch
/// 입찰 알림 제목/본문
pub fn bid_message(product: &Product, bid: &Bid) -> (String, String) {
    let subject = format!("새 입찰: {}", product.title);
    let body = format!(
        "{} ({}) 님이 상품 #{} - {} 에 €{} 을 입찰했습니다.",
        bid.bidder_name, bid.bidder_email, product.id, product.title, bid.amount
    );
    (subject, body)
}

/// 입찰 알림 발송 (분리된 태스크, 결과는 로그로만 남긴다)
pub fn dispatch_bid_notification(
    notifier: Arc<dyn Notifier>,
    product: &Product,
    bid: &Bid,
) -> JoinHandle<()> {
    let (subject, body) = bid_message(product, bid);
    let bid_id = bid.id;
    tokio::spawn(async move {
        match notifier.send(&subject, &body).await {
            Ok(Delivery::Sent) => info!("{:<12} --> 입찰 알림 발송 bid: {}", "Notifier", bid_id),
            Ok(Delivery::Disabled) => {
                debug!("{:<12} --> 메일 미설정, 알림 생략 bid: {}", "Notifier", bid_id)
            }
            Err(e) => error!(
                "{:<12} --> 입찰 알림 발송 실패 bid: {}: {}",
                "Notifier", bid_id, e
            ),
        }
    })
}

/// 메일 설정 진단 결과
#[derive(Debug, Clone, Serialize)]
pub struct MailDiagnostics {
    pub missing_keys: Vec<&'static str>,
    pub delivery: &'static str,
    pub error: Option<String>,
}

/// 테스트 메일 발송 (관리자 진단용)
pub async fn test_email(notifier: &dyn Notifier, missing_keys: &[&'static str]) -> MailDiagnostics {
    info!(
        "{:<12} --> 테스트 메일 발송, 누락된 설정: {:?}",
        "Notifier", missing_keys
    );
    let result = notifier
        .send("테스트 메일", "메일 설정이 정상적으로 동작합니다.")
        .await;
    let (delivery, error) = match result {
        Ok(Delivery::Sent) => ("sent", None),
        Ok(Delivery::Disabled) => ("disabled", None),
        Err(e) => {
            error!("{:<12} --> 테스트 메일 발송 실패: {}", "Notifier", e);
            ("failed", Some(e.to_string()))
        }
    };
    MailDiagnostics {
        missing_keys: missing_keys.to_vec(),
        delivery,
        error,
    }
}

// endregion: --- Dispatch

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::price::Price;
    use chrono::Utc;

    #[tokio::test]
    async fn disabled_notifier_is_a_silent_noop() {
        let notifier = SmtpNotifier::new(None).unwrap();
        assert_eq!(
            notifier.send("subject", "body").await.unwrap(),
            Delivery::Disabled
        );
    }

    #[tokio::test]
    async fn test_email_reports_missing_keys() {
        let notifier = SmtpNotifier::disabled();
        let report = test_email(&notifier, &["SMTP_SERVER", "ADMIN_EMAIL"]).await;
        assert_eq!(report.delivery, "disabled");
        assert_eq!(report.missing_keys, vec!["SMTP_SERVER", "ADMIN_EMAIL"]);
        assert!(report.error.is_none());
    }

    #[test]
    fn bid_message_mentions_product_and_amount() {
        let product = Product {
            id: 7,
            title: "Lamp".to_string(),
            description: None,
            starting_price: Price::from_cents(10_000),
            is_sold: false,
            cover_image: None,
            created_at: Utc::now(),
        };
        let bid = Bid {
            id: 1,
            product_id: 7,
            bidder_name: "Anna".to_string(),
            bidder_email: "anna@example.com".to_string(),
            amount: Price::from_cents(10_001),
            created_at: Utc::now(),
        };
        let (subject, body) = bid_message(&product, &bid);
        assert!(subject.contains("Lamp"));
        assert!(body.contains("100.01"));
        assert!(body.contains("#7"));
    }
}
// endregion: --- Tests
