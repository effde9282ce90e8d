// ── Page retrieval ──
//
// Thin transport over `reqwest` with the device-specific quirks baked
// in: manual cookie handling (one session cookie, host-scoped, path
// "/"), a silent-expiry body check on every 200, and timeouts degrading
// to an empty response instead of an error so poll loops stay alive.
// An offline mode serves canned pages from disk, keyed by the final
// path segment, for deterministic testing.

use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::model::HttpMethod;

/// Page name used when an endpoint path ends in `/`.
pub const DEFAULT_PAGE: &str = "index.htm";

/// Default request timeout. The embedded HTTP stack on these devices is
/// slow under load; shorter timeouts cause spurious empty cycles.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Marker script fragment the devices embed to bounce a dead session
/// back to the login page client-side.
const LOGIN_REDIRECT_SCRIPT: &str = "top.location.href = \"/wmi/login\"";

/// Where pages come from: the live device, or canned files on disk.
#[derive(Debug, Clone)]
pub enum FetchMode {
    Online,
    Offline { dir: PathBuf },
}

/// Minimal HTTP response view: status plus decoded body. A transport
/// timeout is represented as status 0 with an empty body.
#[derive(Debug, Clone, Default)]
pub struct PageResponse {
    pub status: u16,
    pub body: String,
}

impl PageResponse {
    /// The no-response placeholder a timed-out request degrades to.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// A login submission result: the page plus any cookies the device set.
#[derive(Debug)]
pub struct LoginReply {
    pub page: PageResponse,
    pub cookies: Vec<(String, String)>,
}

impl LoginReply {
    /// Value of the first response cookie with the given name.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Fetches HTML pages from one switch (or from files). Owns the session
/// cookie and the cached login page; one instance per device.
pub struct PageFetcher {
    host: String,
    http: reqwest::Client,
    mode: FetchMode,
    cookie: Option<(String, String)>,
    login_page: Option<PageResponse>,
}

impl PageFetcher {
    /// Live fetcher for `host` (IP or hostname, optionally `host:port`).
    ///
    /// Redirects are never followed -- these devices signal everything
    /// in 200 bodies, and detection must see the raw login page.
    pub fn new(host: impl Into<String>, timeout: Duration) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            host: host.into(),
            http,
            mode: FetchMode::Online,
            cookie: None,
            login_page: None,
        })
    }

    /// Fetcher that reads canned pages from `dir` instead of the
    /// network. Functionally identical from the caller's perspective.
    pub fn offline(host: impl Into<String>, dir: impl Into<PathBuf>) -> Result<Self, Error> {
        let mut fetcher = Self::new(host, DEFAULT_TIMEOUT)?;
        fetcher.mode = FetchMode::Offline { dir: dir.into() };
        Ok(fetcher)
    }

    pub fn is_offline(&self) -> bool {
        matches!(self.mode, FetchMode::Offline { .. })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Build the absolute URL for a template path.
    pub fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(Url::parse(&format!("http://{}{path}", self.host))?)
    }

    // ── Session cookie ───────────────────────────────────────────────

    pub fn cookie(&self) -> Option<(&str, &str)> {
        self.cookie
            .as_ref()
            .map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn set_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookie = Some((name.into(), value.into()));
    }

    pub fn clear_cookie(&mut self) {
        self.cookie = None;
    }

    // ── Cached login page ────────────────────────────────────────────

    pub fn login_page(&self) -> Option<&PageResponse> {
        self.login_page.as_ref()
    }

    pub fn set_login_page(&mut self, page: PageResponse) {
        self.login_page = Some(page);
    }

    pub fn clear_login_page(&mut self) {
        self.login_page = None;
    }

    // ── Requests ─────────────────────────────────────────────────────

    /// Issue one request with the session cookie attached (if set).
    ///
    /// - a timeout yields `PageResponse::none()`, not an error;
    /// - a connection failure raises [`Error::Connection`];
    /// - a 200 whose body is the login-redirect marker raises
    ///   [`Error::SessionExpired`] -- the caller decides whether to
    ///   re-login.
    pub async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        params: &[(String, String)],
    ) -> Result<PageResponse, Error> {
        if let FetchMode::Offline { dir } = &self.mode {
            return Ok(page_from_file(dir, path));
        }

        let url = self.url(path)?;
        let mut builder = match method {
            HttpMethod::Get => self.http.get(url.clone()).query(params),
            HttpMethod::Post => self.http.post(url.clone()).form(params),
        };
        if let Some((name, value)) = &self.cookie {
            trace!(cookie = %name, "attaching session cookie");
            builder = builder.header(reqwest::header::COOKIE, format!("{name}={value}"));
        }
        debug!(method = ?method, %url, "request");

        let resp = match builder.send().await {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => {
                debug!(%url, "request timed out");
                return Ok(PageResponse::none());
            }
            Err(e) if e.is_connect() => {
                return Err(Error::Connection {
                    message: e.to_string(),
                });
            }
            Err(e) => return Err(Error::Transport(e)),
        };

        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(Error::Transport)?;

        if status == 200 && !is_authenticated(&body) {
            return Err(Error::SessionExpired);
        }

        Ok(PageResponse { status, body })
    }

    /// Submit the login form. Skips the expiry check (the reply is the
    /// post-login page itself) and surfaces any cookies the device set.
    pub async fn submit_login(
        &self,
        method: HttpMethod,
        path: &str,
        params: &[(String, String)],
    ) -> Result<LoginReply, Error> {
        if let FetchMode::Offline { dir } = &self.mode {
            return Ok(LoginReply {
                page: page_from_file(dir, path),
                cookies: Vec::new(),
            });
        }

        let url = self.url(path)?;
        let builder = match method {
            HttpMethod::Get => self.http.get(url.clone()).query(params),
            HttpMethod::Post => self.http.post(url.clone()).form(params),
        };
        debug!(%url, "submitting login form");

        let resp = match builder.send().await {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => {
                debug!(%url, "login request timed out");
                return Ok(LoginReply {
                    page: PageResponse::none(),
                    cookies: Vec::new(),
                });
            }
            Err(e) if e.is_connect() => {
                return Err(Error::Connection {
                    message: e.to_string(),
                });
            }
            Err(e) => return Err(Error::Transport(e)),
        };

        let status = resp.status().as_u16();
        let cookies: Vec<(String, String)> = resp
            .cookies()
            .map(|c| (c.name().to_owned(), c.value().to_owned()))
            .collect();
        let body = resp.text().await.map_err(Error::Transport)?;

        Ok(LoginReply {
            page: PageResponse { status, body },
            cookies,
        })
    }
}

/// Silent-expiry check. The devices never answer 401 or redirect; a
/// dead session comes back as HTTP 200 whose `<title>` is a fixed
/// marker, or whose body scripts a client-side hop to the login page.
pub fn is_authenticated(body: &str) -> bool {
    if body.is_empty() {
        return true;
    }
    if let Some(title) = Regex::new(r"(?is)<title>\s*(.*?)\s*</title>")
        .ok()
        .and_then(|re| re.captures(body))
        .and_then(|c| c.get(1))
    {
        if title.as_str().trim().eq_ignore_ascii_case("redirect to login") {
            return false;
        }
    }
    !body.contains(LOGIN_REDIRECT_SCRIPT)
}

/// Offline lookup: the page is keyed by the endpoint's final path
/// segment. A missing file reads as 404, same as a dead endpoint.
fn page_from_file(dir: &Path, path: &str) -> PageResponse {
    let segment = path.rsplit('/').next().unwrap_or_default();
    let name = if segment.is_empty() {
        DEFAULT_PAGE
    } else {
        segment
    };
    match std::fs::read_to_string(dir.join(name)) {
        Ok(body) => {
            debug!(page = %name, "loaded offline page");
            PageResponse { status: 200, body }
        }
        Err(_) => {
            debug!(page = %name, "offline page not found");
            PageResponse {
                status: 404,
                body: String::new(),
            }
        }
    }
}
