use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// 센트 단위 금액
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, sqlx::Type)]
#[sqlx(transparent)]
pub struct Price(i64);

impl Price {
    pub const ZERO: Price = Price(0);

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// 사용자 입력 금액 파싱
    /// '.' 과 ',' 를 모두 소수점으로 받는다. 0 이하, 소수 셋째 자리 이상은 거부.
    pub fn parse_positive(input: &str) -> Option<Self> {
        let normalized = input.trim().replace(',', ".");
        if normalized.is_empty() {
            return None;
        }
        let value = Decimal::from_str(&normalized).ok()?.normalize();
        if value <= Decimal::ZERO || value.scale() > 2 {
            return None;
        }
        (value * Decimal::ONE_HUNDRED).to_i64().map(Self)
    }

    /// 일괄 등록용 관대한 파싱: 실패하면 0
    pub fn parse_or_zero(input: &str) -> Self {
        Self::parse_positive(input).unwrap_or(Self::ZERO)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_dot_and_comma() {
        assert_eq!(Price::parse_positive("100.01"), Some(Price(10_001)));
        assert_eq!(Price::parse_positive(" 100,01 "), Some(Price(10_001)));
        assert_eq!(Price::parse_positive("150"), Some(Price(15_000)));
        assert_eq!(Price::parse_positive("2.50"), Some(Price(250)));
    }

    #[test]
    fn rejects_non_positive_and_malformed() {
        assert_eq!(Price::parse_positive("0"), None);
        assert_eq!(Price::parse_positive("-5"), None);
        assert_eq!(Price::parse_positive("abc"), None);
        assert_eq!(Price::parse_positive(""), None);
        assert_eq!(Price::parse_positive("1.001"), None);
    }

    #[test]
    fn displays_two_fraction_digits() {
        assert_eq!(Price(10_000).to_string(), "100.00");
        assert_eq!(Price(15_001).to_string(), "150.01");
        assert_eq!(serde_json::to_string(&Price(5)).unwrap(), "\"0.05\"");
    }

    #[test]
    fn lenient_parse_falls_back_to_zero() {
        assert_eq!(Price::parse_or_zero("n.v.t."), Price::ZERO);
        assert_eq!(Price::parse_or_zero("12,5"), Price(1_250));
    }
}
