//! 도메인 타입 -- 시스템 전역에서 사용되는 공통 타입
//!
//! 로그 형식 식별자([`LogFormat`])와 다운로드된 오브젝트 참조([`DownloadedObject`])를
//! 정의합니다. 다운로드 협력자가 생성하고 파이프라인은 읽기만 합니다.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// AWS 액세스 로그 형식
///
/// 오브젝트 메타데이터에서 한 번 결정되며, 어떤 포맷 파서를 사용할지 선택합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogFormat {
    /// Classic Elastic Load Balancer (`aws_elb`)
    #[serde(rename = "aws_elb")]
    Elb,
    /// Application Load Balancer (`aws_alb`)
    #[serde(rename = "aws_alb")]
    Alb,
    /// CloudFront 웹 배포 (`aws_cf_web`)
    #[serde(rename = "aws_cf_web")]
    CloudFront,
}

impl LogFormat {
    /// 설정 및 로그에서 사용하는 형식 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Elb => "aws_elb",
            Self::Alb => "aws_alb",
            Self::CloudFront => "aws_cf_web",
        }
    }

    /// 데이터셋 이름의 `$SERVICE` 자리에 들어가는 서비스명
    pub fn service(&self) -> &'static str {
        match self {
            Self::Elb => "elb",
            Self::Alb => "alb",
            Self::CloudFront => "cloudfront",
        }
    }

    /// 로드 밸런서 형식(ELB/ALB)인지 여부
    pub fn is_load_balancer(&self) -> bool {
        matches!(self, Self::Elb | Self::Alb)
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogFormat {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aws_elb" | "elb" => Ok(Self::Elb),
            "aws_alb" | "alb" | "aws_elbv2" => Ok(Self::Alb),
            "aws_cf_web" | "cloudfront" => Ok(Self::CloudFront),
            other => Err(ParseError::UnsupportedFormat(other.to_owned())),
        }
    }
}

/// 다운로드 협력자가 가져온 로그 오브젝트 하나에 대한 참조
///
/// 파이프라인은 `filename`의 내용을 읽고, 파싱이 끝나면 로컬 파일을 삭제합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadedObject {
    /// 스토리지 오브젝트 키 (상태 저장소 식별자로도 사용)
    pub object: String,
    /// 이미 내려받은 로컬 파일 경로
    pub filename: PathBuf,
    /// 파서 선택에 사용할 로그 형식
    pub format: LogFormat,
}

impl DownloadedObject {
    /// 새 오브젝트 참조를 생성합니다.
    pub fn new(object: impl Into<String>, filename: impl Into<PathBuf>, format: LogFormat) -> Self {
        Self {
            object: object.into(),
            filename: filename.into(),
            format,
        }
    }
}

impl fmt::Display for DownloadedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.object, self.format)
    }
}
