//! URL 구성 요소 추출
//!
//! 로그에 기록된 URL 형태의 값에서 도메인, 경로, 포트 등을 분리합니다.
//! 스킴이 없는 `www.example.net/path` 형태와 경로만 있는 `/path` 형태도 허용합니다.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static URL_REGEX: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:(?P<scheme>[a-z][a-z0-9+.\-]*)://)?(?:[^@/?#]*@)?(?P<host>\[[0-9a-f:.]+\]|[^:/?#\[\]@]*)(?::(?P<port>\d*))?(?P<path>/[^?#]*)?(?:\?(?P<query>[^#]*))?(?:#.*)?$",
    )
    .ok()
});

/// 추출할 URL 구성 요소
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlComponent {
    /// 호스트 이름
    Domain,
    /// 정규화된 호스트 이름 (현재 `Domain`과 동일)
    Fqdn,
    /// `scheme://host:port`
    Root,
    /// 경로
    Path,
    /// 경로의 마지막 세그먼트
    Page,
    /// 페이지의 확장자 (`.html`)
    Ext,
    /// 포트 (없으면 스킴 기본 포트)
    Port,
    /// 쿼리 문자열
    Query,
}

impl UrlComponent {
    /// 카탈로그에서 쓰는 이름으로부터 변환합니다.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "domain" => Self::Domain,
            "fqdn" => Self::Fqdn,
            "root" => Self::Root,
            "path" => Self::Path,
            "page" => Self::Page,
            "ext" => Self::Ext,
            "port" => Self::Port,
            "query" => Self::Query,
            _ => return None,
        })
    }

    /// 카탈로그에서 쓰는 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Fqdn => "fqdn",
            Self::Root => "root",
            Self::Path => "path",
            Self::Page => "page",
            Self::Ext => "ext",
            Self::Port => "port",
            Self::Query => "query",
        }
    }
}

impl fmt::Display for UrlComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_port(scheme: &str) -> Option<&'static str> {
    match scheme.to_ascii_lowercase().as_str() {
        "ftp" => Some("21"),
        "ssh" => Some("22"),
        "http" => Some("80"),
        "https" => Some("443"),
        _ => None,
    }
}

/// URL 값에서 구성 요소를 추출합니다. 해당 요소가 없으면 `None`.
pub fn extract(value: &str, component: UrlComponent) -> Option<String> {
    let caps = URL_REGEX.as_ref()?.captures(value.trim())?;
    let non_empty = |name: &str| caps.name(name).map(|m| m.as_str()).filter(|s| !s.is_empty());

    let result = match component {
        UrlComponent::Domain | UrlComponent::Fqdn => non_empty("host")?.to_owned(),
        UrlComponent::Root => {
            let host = non_empty("host")?;
            let mut root = String::new();
            if let Some(scheme) = non_empty("scheme") {
                root.push_str(scheme);
                root.push_str("://");
            }
            root.push_str(host);
            if let Some(port) = non_empty("port") {
                root.push(':');
                root.push_str(port);
            }
            root
        }
        UrlComponent::Path => non_empty("path")?.to_owned(),
        UrlComponent::Page => page(non_empty("path")?)?.to_owned(),
        UrlComponent::Ext => {
            let page = page(non_empty("path")?)?;
            let dot = page.rfind('.')?;
            let ext = &page[dot..];
            if ext.len() < 2 {
                return None;
            }
            ext.to_owned()
        }
        UrlComponent::Port => match non_empty("port") {
            Some(port) => port.to_owned(),
            None => default_port(non_empty("scheme")?)?.to_owned(),
        },
        UrlComponent::Query => non_empty("query")?.to_owned(),
    };
    Some(result)
}

fn page(path: &str) -> Option<&str> {
    let (_, last) = path.rsplit_once('/')?;
    (!last.is_empty()).then_some(last)
}
