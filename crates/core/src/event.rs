//! 이벤트 -- 파이프라인을 흐르는 텔레메트리의 기본 단위
//!
//! [`Event`]는 포맷 파서가 로그 한 줄에서 생성하고, 보강(enrich) 단계에서
//! 필드가 추가/삭제되며, 샘플러와 싱크는 읽기만 합니다.
//! `data`는 로그 형식별 필드명 → [`FieldValue`] 매핑입니다.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 샘플러가 유지(keep)한 이벤트에 기록되는 샘플 레이트 필드명
pub const SAMPLE_RATE_FIELD: &str = "sample_rate";

/// 보강 단계가 기록하는 에러 설명 필드명
pub const ERROR_FIELD: &str = "error";

/// 이벤트 필드 값
///
/// JSON으로 직렬화할 때 태그 없이 원시 값(문자열, 숫자, 불리언)으로 표현됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// 문자열
    Str(String),
    /// 정수
    Int(i64),
    /// 부동소수점
    Float(f64),
    /// 불리언
    Bool(bool),
}

impl FieldValue {
    /// 문자열 값이면 참조를 반환합니다.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// 숫자 값(정수/부동소수점)이면 `f64`로 반환합니다.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// 정수 값이면 반환합니다.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// 텔레메트리 이벤트
///
/// 로그 한 줄에서 정확히 하나가 생성됩니다. 필드 삽입 순서는 의미가 없으며,
/// 직렬화 결과를 안정적으로 유지하기 위해 `BTreeMap`을 사용합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// 레코드가 설명하는 시각 (형식별 타임스탬프에서 파싱)
    pub timestamp: DateTime<Utc>,
    /// 필드명 → 값
    pub data: BTreeMap<String, FieldValue>,
}

impl Event {
    /// 빈 데이터로 새 이벤트를 생성합니다.
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            data: BTreeMap::new(),
        }
    }

    /// 필드를 설정합니다. 같은 이름의 기존 값은 덮어씁니다.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.data.insert(key.into(), value.into());
    }

    /// 필드를 삭제하고 이전 값을 반환합니다.
    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.data.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.data.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// 문자열 필드를 조회합니다.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(FieldValue::as_str)
    }

    /// 숫자 필드를 `f64`로 조회합니다.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.data.get(key).and_then(FieldValue::as_f64)
    }

    /// 샘플러가 기록한 유효 샘플 레이트를 반환합니다 (기록 전이면 1).
    pub fn sample_rate(&self) -> u32 {
        self.data
            .get(SAMPLE_RATE_FIELD)
            .and_then(FieldValue::as_i64)
            .and_then(|r| u32::try_from(r).ok())
            .filter(|r| *r > 0)
            .unwrap_or(1)
    }

    /// 유효 샘플 레이트를 필드로 기록합니다.
    pub fn set_sample_rate(&mut self, rate: u32) {
        self.insert(SAMPLE_RATE_FIELD, rate);
    }

    /// 타임스탬프를 Unix 나노초로 반환합니다.
    ///
    /// 나노초 범위(1677~2262년)를 벗어나면 마이크로초 정밀도로 포화 계산합니다.
    pub fn unix_nanos(&self) -> i64 {
        self.timestamp
            .timestamp_nanos_opt()
            .unwrap_or_else(|| self.timestamp.timestamp_micros().saturating_mul(1000))
    }

    /// `data`만 JSON 객체 문자열로 직렬화합니다.
    pub fn data_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.data)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Event[{}] fields={}",
            self.timestamp.to_rfc3339(),
            self.data.len()
        )
    }
}
