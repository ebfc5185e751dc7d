//! 포맷 파서 -- AWS 액세스 로그 한 줄을 [`Event`]로 변환
//!
//! 각 형식은 nginx `log_format` 스타일의 템플릿으로 정의됩니다.
//! 템플릿은 시작 시 한 번 [`LineFormat`]으로 컴파일되고, 이후 모든 라인은
//! 컴파일된 슬롯 목록에 맞춰 토큰 단위로 매핑됩니다.
//!
//! # 지원 형식
//! - Classic ELB ([`ElbParser`])
//! - ALB ([`AlbParser`])
//! - CloudFront 웹 배포 ([`CloudFrontParser`])
//!
//! # 사용 예시
//! ```
//! use honeyaws_core::pipeline::LogParser;
//! use honeyaws_core::types::LogFormat;
//! use honeyaws_publisher::parser::FormatParser;
//!
//! let parser = FormatParser::for_format(LogFormat::Elb).unwrap();
//! let line = r#"2017-07-31T20:30:57.975041Z spline_reticulation_lb 10.11.12.13:47882 10.3.47.87:8080 0.000021 0.010962 0.000016 200 200 766 17 "PUT https://api.simulation.io:443/reticulate/spline/1 HTTP/1.1" "libhoney-go/1.3.3" ECDHE-RSA-AES128-GCM-SHA256 TLSv1.2"#;
//! let event = parser.parse_line(line).unwrap().unwrap();
//! assert_eq!(event.get_str("elb"), Some("spline_reticulation_lb"));
//! ```

pub mod alb;
pub mod cloudfront;
pub mod elb;

pub use alb::AlbParser;
pub use cloudfront::CloudFrontParser;
pub use elb::ElbParser;

use std::collections::{BTreeMap, HashSet};

use honeyaws_core::error::ParseError;
use honeyaws_core::event::{Event, FieldValue};
use honeyaws_core::pipeline::LogParser;
use honeyaws_core::types::LogFormat;

use crate::error::PublisherError;

/// 한 라인의 최대 허용 크기 (바이트)
pub const DEFAULT_MAX_LINE_SIZE: usize = 64 * 1024;

/// 필드가 없음을 나타내는 토큰
const ABSENT: &str = "-";

/// 슬롯 값의 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// 문자열 그대로 보존
    Str,
    /// 정수 (`i64`)
    Int,
    /// 부동소수점 (`f64`)
    Float,
}

/// 컴파일된 템플릿 슬롯 하나
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    /// 필드명 (`$` 제외)
    pub name: String,
    /// 큰따옴표로 감싸진 토큰이어야 하는지 여부
    pub quoted: bool,
    /// 값 타입
    pub kind: FieldKind,
}

/// 컴파일된 라인 포맷
///
/// 템플릿의 `$name` 토큰 순서대로 슬롯을 보관합니다.
/// 라인의 토큰 수가 `required`보다 적으면 잘못된 레코드이고,
/// 슬롯 수를 넘는 추가 토큰은 무시합니다.
#[derive(Debug, Clone)]
pub struct LineFormat {
    slots: Vec<Slot>,
    required: usize,
}

impl LineFormat {
    /// 템플릿을 컴파일합니다.
    ///
    /// `kind_of`는 필드명에 대한 값 타입을 결정합니다. 템플릿 문법 오류나
    /// 중복 필드명은 [`PublisherError::LineFormat`]으로 반환됩니다.
    pub fn compile(template: &str, kind_of: fn(&str) -> FieldKind) -> Result<Self, PublisherError> {
        let mut slots = Vec::new();
        let mut seen = HashSet::new();

        for raw in template.split_whitespace() {
            let (inner, quoted) = match raw.strip_prefix('"') {
                Some(rest) => match rest.strip_suffix('"') {
                    Some(inner) => (inner, true),
                    None => {
                        return Err(PublisherError::LineFormat(format!(
                            "unterminated quote in template token '{raw}'"
                        )));
                    }
                },
                None => (raw, false),
            };

            let name = inner.strip_prefix('$').ok_or_else(|| {
                PublisherError::LineFormat(format!("template token '{raw}' must start with '$'"))
            })?;

            if name.is_empty()
                || !name
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
            {
                return Err(PublisherError::LineFormat(format!(
                    "invalid field name in template token '{raw}'"
                )));
            }

            if !seen.insert(name.to_owned()) {
                return Err(PublisherError::LineFormat(format!(
                    "duplicate field '{name}' in template"
                )));
            }

            slots.push(Slot {
                name: name.to_owned(),
                quoted,
                kind: kind_of(name),
            });
        }

        if slots.is_empty() {
            return Err(PublisherError::LineFormat("template has no fields".to_owned()));
        }

        let required = slots.len();
        Ok(Self { slots, required })
    }

    /// 필수 토큰 수를 설정합니다. 슬롯 수를 넘을 수 없습니다.
    pub fn with_required(mut self, required: usize) -> Result<Self, PublisherError> {
        if required == 0 || required > self.slots.len() {
            return Err(PublisherError::LineFormat(format!(
                "required field count {required} out of range 1-{}",
                self.slots.len()
            )));
        }
        self.required = required;
        Ok(self)
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn required(&self) -> usize {
        self.required
    }

    /// 라인을 토큰화하고 슬롯에 맞춰 타입이 지정된 필드 맵을 생성합니다.
    ///
    /// `-` 토큰은 필드를 생략합니다. 실패 사유는 문자열로 반환되며
    /// 호출자가 형식 정보를 붙여 에러로 감쌉니다.
    pub fn extract(&self, line: &str) -> Result<BTreeMap<String, FieldValue>, String> {
        let tokens = tokenize(line)?;
        if tokens.len() < self.required {
            return Err(format!(
                "expected at least {} fields, found {}",
                self.required,
                tokens.len()
            ));
        }

        let mut data = BTreeMap::new();
        for (slot, token) in self.slots.iter().zip(tokens.iter()) {
            if slot.quoted && !token.quoted {
                return Err(format!("field '{}' must be quoted", slot.name));
            }
            if token.text == ABSENT {
                continue;
            }
            let value = match slot.kind {
                FieldKind::Str => FieldValue::Str(token.text.to_owned()),
                FieldKind::Int => token
                    .text
                    .parse::<i64>()
                    .map(FieldValue::Int)
                    .map_err(|_| format!("field '{}' is not an integer: {}", slot.name, token.text))?,
                FieldKind::Float => token
                    .text
                    .parse::<f64>()
                    .map(FieldValue::Float)
                    .map_err(|_| format!("field '{}' is not a number: {}", slot.name, token.text))?,
            };
            data.insert(slot.name.clone(), value);
        }

        Ok(data)
    }
}

/// 라인에서 분리된 토큰
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    /// 따옴표를 제외한 원문
    pub text: &'a str,
    /// 큰따옴표로 감싸져 있었는지 여부
    pub quoted: bool,
}

/// 공백/탭으로 라인을 토큰화합니다.
///
/// `"..."`는 내부 공백을 포함해 하나의 토큰이 되며, 백슬래시 다음 문자는
/// 따옴표 종료로 취급하지 않습니다.
pub fn tokenize(line: &str) -> Result<Vec<Token<'_>>, String> {
    let bytes = line.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            b'"' => {
                let start = i + 1;
                let mut j = start;
                loop {
                    match bytes.get(j) {
                        None => return Err(format!("unterminated quote at offset {i}")),
                        Some(b'\\') => j += 2,
                        Some(b'"') => break,
                        Some(_) => j += 1,
                    }
                }
                let end = j.min(bytes.len());
                tokens.push(Token {
                    text: &line[start..end],
                    quoted: true,
                });
                i = end + 1;
            }
            _ => {
                let start = i;
                while i < bytes.len() && !matches!(bytes[i], b' ' | b'\t' | b'\r' | b'\n') {
                    i += 1;
                }
                tokens.push(Token {
                    text: &line[start..i],
                    quoted: false,
                });
            }
        }
    }

    Ok(tokens)
}

/// 형식별 파서를 하나로 묶은 태그드 variant
///
/// 오브젝트의 [`LogFormat`]으로 한 번 선택되며, core의 [`LogParser`]를 구현합니다.
pub enum FormatParser {
    Elb(ElbParser),
    Alb(AlbParser),
    CloudFront(CloudFrontParser),
}

impl FormatParser {
    /// 로그 형식에 맞는 파서를 생성합니다.
    pub fn for_format(format: LogFormat) -> Result<Self, PublisherError> {
        Ok(match format {
            LogFormat::Elb => Self::Elb(ElbParser::new()?),
            LogFormat::Alb => Self::Alb(AlbParser::new()?),
            LogFormat::CloudFront => Self::CloudFront(CloudFrontParser::new()?),
        })
    }

    fn inner(&self) -> &dyn LogParser {
        match self {
            Self::Elb(p) => p,
            Self::Alb(p) => p,
            Self::CloudFront(p) => p,
        }
    }
}

impl LogParser for FormatParser {
    fn format(&self) -> LogFormat {
        self.inner().format()
    }

    fn parse_line(&self, line: &str) -> Result<Option<Event>, ParseError> {
        self.inner().parse_line(line)
    }
}

/// 입력 크기 검사. 초과 시 Malformed 에러를 반환합니다.
pub(crate) fn check_line_size(
    format: LogFormat,
    line: &str,
    max_line_size: usize,
) -> Result<(), ParseError> {
    if line.len() > max_line_size {
        return Err(malformed(
            format,
            format!("line too large: {} bytes (max: {max_line_size})", line.len()),
        ));
    }
    Ok(())
}

pub(crate) fn malformed(format: LogFormat, reason: impl Into<String>) -> ParseError {
    ParseError::Malformed {
        format: format.as_str().to_owned(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_str(_: &str) -> FieldKind {
        FieldKind::Str
    }

    fn counted(name: &str) -> FieldKind {
        match name {
            "count" => FieldKind::Int,
            "ratio" => FieldKind::Float,
            _ => FieldKind::Str,
        }
    }

    #[test]
    fn compile_records_quoted_slots() {
        let format = LineFormat::compile(r#"$a "$b" $c"#, all_str).unwrap();
        let quoted: Vec<bool> = format.slots().iter().map(|s| s.quoted).collect();
        assert_eq!(quoted, vec![false, true, false]);
        assert_eq!(format.required(), 3);
    }

    #[test]
    fn compile_rejects_bad_templates() {
        assert!(LineFormat::compile("", all_str).is_err());
        assert!(LineFormat::compile("$a plain", all_str).is_err());
        assert!(LineFormat::compile(r#"$a "$b"#, all_str).is_err());
        assert!(LineFormat::compile("$a $a", all_str).is_err());
        assert!(LineFormat::compile("$A", all_str).is_err());
        assert!(LineFormat::compile("$", all_str).is_err());
    }

    #[test]
    fn with_required_bounds() {
        let format = LineFormat::compile("$a $b $c", all_str).unwrap();
        assert!(format.clone().with_required(0).is_err());
        assert!(format.clone().with_required(4).is_err());
        assert_eq!(format.with_required(2).unwrap().required(), 2);
    }

    #[test]
    fn tokenize_groups_quoted_text() {
        let tokens = tokenize(r#"a "b c" d"#).unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].text, "b c");
        assert!(tokens[1].quoted);
        assert!(!tokens[2].quoted);
    }

    #[test]
    fn tokenize_splits_on_tabs() {
        let tokens = tokenize("a\tb\t\tc").unwrap();
        let texts: Vec<&str> = tokens.iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn tokenize_keeps_escaped_quotes() {
        let tokens = tokenize(r#""say \"hi\"" x"#).unwrap();
        assert_eq!(tokens[0].text, r#"say \"hi\""#);
        assert_eq!(tokens[1].text, "x");
    }

    #[test]
    fn tokenize_empty_quoted_token() {
        let tokens = tokenize(r#""" x"#).unwrap();
        assert_eq!(tokens[0].text, "");
        assert!(tokens[0].quoted);
    }

    #[test]
    fn tokenize_unterminated_quote_fails() {
        assert!(tokenize(r#"a "b c"#).is_err());
    }

    #[test]
    fn extract_types_and_absent_fields() {
        let format = LineFormat::compile("$name $count $ratio", counted).unwrap();
        let data = format.extract("web 42 -").unwrap();
        assert_eq!(data.get("name"), Some(&FieldValue::Str("web".to_owned())));
        assert_eq!(data.get("count"), Some(&FieldValue::Int(42)));
        assert!(!data.contains_key("ratio"));
    }

    #[test]
    fn extract_ignores_extra_tokens() {
        let format = LineFormat::compile("$name $count", counted).unwrap();
        let data = format.extract("web 1 extra trailing").unwrap();
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn extract_rejects_short_lines() {
        let format = LineFormat::compile("$name $count $ratio", counted).unwrap();
        let err = format.extract("web 1").unwrap_err();
        assert!(err.contains("found 2"));
    }

    #[test]
    fn extract_rejects_unquoted_quote_slot() {
        let format = LineFormat::compile(r#"$name "$request""#, all_str).unwrap();
        assert!(format.extract("web GET").is_err());
        assert!(format.extract(r#"web "GET / HTTP/1.1""#).is_ok());
    }

    #[test]
    fn extract_rejects_bad_numbers() {
        let format = LineFormat::compile("$name $count", counted).unwrap();
        assert!(format.extract("web many").is_err());
    }

    #[test]
    fn format_parser_selects_by_format() {
        for format in [LogFormat::Elb, LogFormat::Alb, LogFormat::CloudFront] {
            let parser = FormatParser::for_format(format).unwrap();
            assert_eq!(parser.format(), format);
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn tokenize_never_panics(line in "\\PC{0,200}") {
                let _ = tokenize(&line);
            }

            #[test]
            fn unquoted_words_round_trip(words in prop::collection::vec("[a-z0-9:./-]{1,12}", 1..20)) {
                let line = words.join(" ");
                let tokens = tokenize(&line).unwrap();
                let texts: Vec<&str> = tokens.iter().map(|t| t.text).collect();
                prop_assert_eq!(texts, words.iter().map(String::as_str).collect::<Vec<_>>());
            }

            #[test]
            fn elb_parser_never_panics(line in "\\PC{0,300}") {
                let parser = FormatParser::for_format(LogFormat::Elb).unwrap();
                let _ = parser.parse_line(&line);
            }
        }
    }
}
