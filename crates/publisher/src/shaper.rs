//! 요청 라인 분해
//!
//! ELB/ALB의 `request` 필드(`"GET https://host:443/path?a=1 HTTP/1.1"`)를
//! 메서드, URI, 프로토콜, 호스트, 경로, 쿼리로 나누고, 쿼리 값을 `?`로 치환한
//! `request_shape`를 추가합니다. 형식이 맞지 않는 요청 라인은 이벤트를 건드리지 않습니다.

use honeyaws_core::event::Event;

/// 요청 라인 필드를 분해하는 셰이퍼
#[derive(Debug, Clone)]
pub struct RequestShaper {
    field: String,
}

/// 분해된 요청 라인
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapedRequest {
    pub method: String,
    pub uri: String,
    pub protocol_version: String,
    pub host: Option<String>,
    pub path: String,
    pub query: Option<String>,
    pub shape: String,
}

impl RequestShaper {
    /// `field`의 값을 분해하고 `{field}_*` 필드를 기록하는 셰이퍼를 만듭니다.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    /// 이벤트의 요청 라인을 분해해 필드를 추가합니다.
    pub fn shape(&self, event: &mut Event) {
        let Some(shaped) = event.get_str(&self.field).and_then(shape_request) else {
            return;
        };

        let prefix = &self.field;
        event.insert(format!("{prefix}_method"), shaped.method);
        event.insert(format!("{prefix}_uri"), shaped.uri);
        event.insert(
            format!("{prefix}_protocol_version"),
            shaped.protocol_version,
        );
        if let Some(host) = shaped.host {
            event.insert(format!("{prefix}_host"), host);
        }
        event.insert(format!("{prefix}_path"), shaped.path);
        if let Some(query) = shaped.query {
            event.insert(format!("{prefix}_query"), query);
        }
        event.insert(format!("{prefix}_shape"), shaped.shape);
    }
}

impl Default for RequestShaper {
    fn default() -> Self {
        Self::new("request")
    }
}

/// `METHOD URI PROTOCOL` 형식의 요청 라인을 분해합니다.
pub fn shape_request(request: &str) -> Option<ShapedRequest> {
    let mut parts = request.split(' ');
    let method = parts.next().filter(|m| !m.is_empty())?;
    let uri = parts.next().filter(|u| !u.is_empty())?;
    let protocol_version = parts.next().filter(|p| !p.is_empty())?;
    if parts.next().is_some() {
        return None;
    }

    let (host, path_and_query) = match uri.split_once("://") {
        Some((_scheme, rest)) => match rest.find('/') {
            Some(idx) => (Some(&rest[..idx]), &rest[idx..]),
            None => (Some(rest), "/"),
        },
        None => (None, uri),
    };
    if !path_and_query.starts_with('/') {
        return None;
    }

    let (path, query) = match path_and_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_and_query, None),
    };

    let shape = match query {
        Some(q) if !q.is_empty() => format!("{path}?{}", query_shape(q)),
        _ => path.to_owned(),
    };

    Some(ShapedRequest {
        method: method.to_owned(),
        uri: uri.to_owned(),
        protocol_version: protocol_version.to_owned(),
        host: host.filter(|h| !h.is_empty()).map(str::to_owned),
        path: path.to_owned(),
        query: query.filter(|q| !q.is_empty()).map(str::to_owned),
        shape,
    })
}

/// 쿼리 값을 `?`로 치환합니다. 키 순서는 유지합니다.
fn query_shape(query: &str) -> String {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) => format!("{key}=?"),
            None => format!("{pair}=?"),
        })
        .collect::<Vec<_>>()
        .join("&")
}
