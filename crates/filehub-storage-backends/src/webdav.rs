//! Minimal WebDAV client: PROPFIND listing and GET download.
//!
//! Credentials are sent as HTTP basic auth on every request.

use std::time::Duration;

use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use reqwest::{Client, Method, StatusCode, Url};
use thiserror::Error;
use tracing::{debug, instrument};

const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:">
  <d:prop>
    <d:resourcetype/>
    <d:getcontentlength/>
    <d:getlastmodified/>
  </d:prop>
</d:propfind>"#;

#[derive(Error, Debug)]
pub enum DavError {
    #[error("authentication failed (HTTP {0})")]
    Unauthorized(StatusCode),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("WebDAV error {status}: {body}")]
    Http { status: StatusCode, body: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("malformed multistatus response: {0}")]
    Parse(String),
}

/// One `<response>` of a PROPFIND multistatus.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DavEntry {
    /// Percent-decoded URL path of the resource
    pub href: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub is_collection: bool,
}

/// WebDAV client bound to one endpoint and one set of credentials.
#[derive(Debug)]
pub struct WebDavClient {
    http: Client,
    base: Url,
    username: String,
    password: String,
}

impl WebDavClient {
    pub fn new(
        base_url: &str,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DavError> {
        let base = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| DavError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base,
            username: username.into(),
            password: password.into(),
        })
    }

    /// Decoded URL path of the endpoint, without trailing slash (`/webdav`).
    pub fn base_path(&self) -> String {
        decode(self.base.path().trim_end_matches('/'))
    }

    /// Absolute URL for a remote path such as `/remote/files/notes`.
    fn url_for(&self, remote_path: &str, collection: bool) -> String {
        let encoded = remote_path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| urlencoding::encode(s).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let base = self.base.as_str().trim_end_matches('/');
        match (encoded.is_empty(), collection) {
            (true, _) => format!("{}/", base),
            (false, true) => format!("{}/{}/", base, encoded),
            (false, false) => format!("{}/{}", base, encoded),
        }
    }

    /// PROPFIND a collection with the given depth (0 or 1).
    #[instrument(skip(self), level = "debug")]
    pub async fn propfind(&self, remote_path: &str, depth: u8) -> Result<Vec<DavEntry>, DavError> {
        let url = self.url_for(remote_path, true);
        let method = Method::from_bytes(b"PROPFIND")
            .map_err(|e| DavError::InvalidUrl(format!("PROPFIND method: {}", e)))?;

        let resp = self
            .http
            .request(method, &url)
            .basic_auth(&self.username, Some(&self.password))
            .header("Depth", depth.to_string())
            .header("Content-Type", "application/xml; charset=utf-8")
            .body(PROPFIND_BODY)
            .send()
            .await?;

        let status = resp.status();
        check_status(status, &url)?;
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DavError::Http { status, body });
        }

        let body = resp.text().await?;
        let entries = parse_multistatus(&body)?;
        debug!("PROPFIND {} returned {} entries", url, entries.len());
        Ok(entries)
    }

    /// Download a file.
    #[instrument(skip(self), level = "debug")]
    pub async fn get(&self, remote_path: &str) -> Result<Vec<u8>, DavError> {
        let url = self.url_for(remote_path, false);

        let resp = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        let status = resp.status();
        check_status(status, &url)?;
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DavError::Http { status, body });
        }

        let bytes = resp.bytes().await?;
        debug!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}

fn check_status(status: StatusCode, url: &str) -> Result<(), DavError> {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(DavError::Unauthorized(status)),
        StatusCode::NOT_FOUND => Err(DavError::NotFound(url.to_string())),
        _ => Ok(()),
    }
}

fn decode(s: &str) -> String {
    urlencoding::decode(s)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| s.to_string())
}

#[derive(Clone, Copy)]
enum Field {
    Href,
    Length,
    Modified,
}

/// Parse a `207 Multi-Status` body. Namespace prefixes are ignored.
pub fn parse_multistatus(xml: &str) -> Result<Vec<DavEntry>, DavError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<DavEntry> = None;
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"response" => current = Some(DavEntry::default()),
                b"href" => field = Some(Field::Href),
                b"getcontentlength" => field = Some(Field::Length),
                b"getlastmodified" => field = Some(Field::Modified),
                b"collection" => {
                    if let Some(entry) = current.as_mut() {
                        entry.is_collection = true;
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"collection" {
                    if let Some(entry) = current.as_mut() {
                        entry.is_collection = true;
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if let (Some(f), Some(entry)) = (field, current.as_mut()) {
                    let text = t.unescape().map_err(|e| DavError::Parse(e.to_string()))?;
                    let text = text.trim();
                    match f {
                        Field::Href => entry.href = href_path(text),
                        Field::Length => entry.size = text.parse().unwrap_or(0),
                        Field::Modified => {
                            entry.modified = DateTime::parse_from_rfc2822(text)
                                .ok()
                                .map(|dt| dt.with_timezone(&Utc))
                        }
                    }
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"response" => {
                    if let Some(entry) = current.take() {
                        entries.push(entry);
                    }
                }
                b"href" | b"getcontentlength" | b"getlastmodified" => field = None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(DavError::Parse(e.to_string())),
            _ => {}
        }
    }

    Ok(entries)
}

/// Decoded URL path of an href, which may be absolute (`https://host/dav/x`)
/// or path-only (`/dav/x`).
fn href_path(href: &str) -> String {
    let path = match Url::parse(href) {
        Ok(url) => url.path().to_string(),
        Err(_) => href.to_string(),
    };
    decode(&path)
}
