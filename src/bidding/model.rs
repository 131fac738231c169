use crate::catalog::price::Price;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// 입찰 모델
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Bid {
    pub id: i64,
    pub product_id: i64,
    pub bidder_name: String,
    pub bidder_email: String,
    pub amount: Price,
    pub created_at: DateTime<Utc>,
}

/// 입찰 명령
/// 금액은 "100,01" 같은 문자열이나 숫자 모두 받는다.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceBidCommand {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub amount: serde_json::Value,
}

impl PlaceBidCommand {
    pub fn new(name: &str, email: &str, amount: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            amount: serde_json::Value::String(amount.to_string()),
        }
    }

    /// 금액 입력 원문
    pub fn amount_text(&self) -> String {
        match &self.amount {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            _ => String::new(),
        }
    }
}
