// ── Session and authentication state machine ──
//
// Owns model detection, login, re-authentication and lockout for one
// switch. The devices have no structured API: detection means probing
// login pages against every registered descriptor's predicates, and a
// dead session announces itself only through a 200 body with a login
// redirect marker, which the bounded retry here recovers from exactly
// once per request.

use std::time::Duration;

use secrecy::SecretString;
use tracing::{debug, info, warn};

use crate::crypt;
use crate::error::Error;
use crate::fetch::{PageFetcher, PageResponse};
use crate::model::{
    DETECT_TEMPLATES, DetectionCheck, ModelDescriptor, Template, TemplateParam, registry,
    unique_id,
};
use crate::parse::{self, PageParser};

/// Consecutive soft login failures tolerated before the session locks
/// out permanently.
pub const MAX_AUTHENTICATION_FAILURES: u8 = 3;

const NOT_LOGGED_IN: &str = "not logged in and unable to log in";

/// Lifecycle of one device session. `LockedOut` is terminal until an
/// explicit [`SwitchClient::reset_lockout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Undetected,
    Detecting,
    Detected,
    LoggingIn,
    Authenticated,
    Reauthenticating,
    LockedOut,
}

/// Mutable per-device session state. One per connector, never shared.
#[derive(Debug)]
struct Session {
    password: SecretString,
    /// One-time login challenge; consumed by the next login attempt
    /// whether or not it succeeds.
    challenge: Option<String>,
    /// Per-session page hash some request templates resend.
    client_hash: Option<String>,
    failures: u8,
    state: SessionState,
}

/// Client for one switch: detection, authentication and authenticated
/// page fetches. All operations are sequential; the caller drives one
/// request at a time.
pub struct SwitchClient {
    host: String,
    session: Session,
    fetcher: PageFetcher,
    descriptor: Option<&'static ModelDescriptor>,
    parser: Option<PageParser>,
}

impl SwitchClient {
    /// Live client for `host`.
    pub fn new(
        host: impl Into<String>,
        password: SecretString,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let host = host.into();
        let fetcher = PageFetcher::new(host.clone(), timeout)?;
        Ok(Self::from_parts(host, password, fetcher))
    }

    /// Client reading canned pages from `dir` instead of the network.
    /// Offline fetches skip authentication entirely.
    pub fn offline(
        host: impl Into<String>,
        password: SecretString,
        dir: impl Into<std::path::PathBuf>,
    ) -> Result<Self, Error> {
        let host = host.into();
        let fetcher = PageFetcher::offline(host.clone(), dir)?;
        Ok(Self::from_parts(host, password, fetcher))
    }

    fn from_parts(host: String, password: SecretString, fetcher: PageFetcher) -> Self {
        debug!(%host, "switch client created");
        Self {
            host,
            session: Session {
                password,
                challenge: None,
                client_hash: None,
                failures: 0,
                state: SessionState::Undetected,
            },
            fetcher,
            descriptor: None,
            parser: None,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn state(&self) -> SessionState {
        self.session.state
    }

    pub fn failure_count(&self) -> u8 {
        self.session.failures
    }

    /// The descriptor bound at detection time, if any.
    pub fn descriptor(&self) -> Option<&'static ModelDescriptor> {
        self.descriptor
    }

    /// Parser for the bound family. Mutable access is needed for the
    /// metadata pass (it captures version state on some families).
    pub fn parser_mut(&mut self) -> Option<&mut PageParser> {
        self.parser.as_mut()
    }

    pub fn parser(&self) -> Option<&PageParser> {
        self.parser.as_ref()
    }

    pub fn client_hash(&self) -> Option<&str> {
        self.session.client_hash.as_deref()
    }

    pub fn set_client_hash(&mut self, hash: impl Into<String>) {
        self.session.client_hash = Some(hash.into());
    }

    /// Current session cookie pair, for callers persisting sessions
    /// across restarts.
    pub fn cookie(&self) -> Option<(&str, &str)> {
        self.fetcher.cookie()
    }

    /// Seed a previously persisted session token. The next request
    /// still validates it: a stale token fails the expiry check and
    /// triggers the normal re-login.
    pub fn set_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fetcher.set_cookie(name, value);
        if self.session.state == SessionState::Detected {
            self.session.state = SessionState::Authenticated;
        }
    }

    pub fn is_offline(&self) -> bool {
        self.fetcher.is_offline()
    }

    /// Clear a lockout so login attempts are accepted again. Resets the
    /// failure counter; detection state is kept.
    pub fn reset_lockout(&mut self) {
        self.session.failures = 0;
        if self.session.state == SessionState::LockedOut {
            self.session.state = if self.descriptor.is_some() {
                SessionState::Detected
            } else {
                SessionState::Undetected
            };
        }
    }

    /// Stable identifier for this device (detects the model first if
    /// needed).
    pub async fn unique_id(&mut self) -> Result<String, Error> {
        let descriptor = self.ensure_detected().await?;
        Ok(unique_id(descriptor, &self.host))
    }

    // ── Detection ────────────────────────────────────────────────────

    /// Detect the switch model from its login page.
    ///
    /// Probes the candidate login pages in order; the first page that
    /// answers 200 is evaluated against every registered descriptor.
    /// A descriptor matches when all of its predicates pass, or when
    /// its info-banner predicate passes on its own.
    pub async fn detect(&mut self) -> Result<&'static ModelDescriptor, Error> {
        if let Some(descriptor) = self.descriptor {
            return Ok(descriptor);
        }
        self.session.state = SessionState::Detecting;

        for template in DETECT_TEMPLATES {
            let response = match self
                .fetcher
                .request(template.method, template.path, &[])
                .await
            {
                Ok(response) => response,
                Err(Error::Connection { message }) => {
                    debug!(path = template.path, %message, "detection probe failed");
                    continue;
                }
                Err(e) => {
                    self.session.state = SessionState::Undetected;
                    return Err(e);
                }
            };
            if !response.is_ok() {
                continue;
            }

            let matched = evaluate_descriptors(&response.body);
            match matched.as_slice() {
                [] => {
                    debug!(path = template.path, "no descriptor matched this page");
                }
                [matched_one] => {
                    let descriptor: &'static ModelDescriptor = *matched_one;
                    info!(host = %self.host, model = descriptor.name, "switch model detected");
                    self.descriptor = Some(descriptor);
                    self.parser = Some(PageParser::new(descriptor.parser));
                    self.fetcher.set_login_page(response);
                    self.session.state = SessionState::Detected;
                    return Ok(descriptor);
                }
                many => {
                    self.session.state = SessionState::Undetected;
                    let names: Vec<&str> = many.iter().map(|m| m.name).collect();
                    return Err(Error::MultipleModelsDetected {
                        models: names.join(", "),
                    });
                }
            }
        }

        self.session.state = SessionState::Undetected;
        Err(Error::ModelNotDetected)
    }

    async fn ensure_detected(&mut self) -> Result<&'static ModelDescriptor, Error> {
        match self.descriptor {
            Some(descriptor) => Ok(descriptor),
            None => self.detect().await,
        }
    }

    // ── Login ────────────────────────────────────────────────────────

    /// Attempt a login. `Ok(true)` on success, `Ok(false)` on a soft
    /// failure the caller may retry; `Err(LoginFailed)` once the
    /// lockout threshold is reached. A locked-out session fails
    /// immediately without touching the network.
    pub async fn login(&mut self) -> Result<bool, Error> {
        if self.session.state == SessionState::LockedOut {
            return Err(Error::LoginFailed {
                message: format!(
                    "locked out after {} authentication failures",
                    self.session.failures
                ),
            });
        }
        let descriptor = self.ensure_detected().await?;

        if self.fetcher.login_page().is_none() {
            self.refresh_login_page().await?;
        }
        let login_body = self
            .fetcher
            .login_page()
            .map(|p| p.body.clone())
            .unwrap_or_default();
        self.session.challenge = self
            .parser
            .as_ref()
            .and_then(|p| p.parse_challenge(&login_body));

        let credential = crypt::login_credential(
            descriptor.scheme,
            &self.session.password,
            self.session.challenge.as_deref(),
        );
        // The challenge is single-use: discard it no matter how the
        // attempt ends.
        self.session.challenge = None;
        self.session.state = SessionState::LoggingIn;

        let template = &descriptor.login;
        let params = render_login(template, &credential);
        let reply = self
            .fetcher
            .submit_login(template.method, template.path, &params)
            .await?;

        if !reply.page.is_ok() {
            debug!(status = reply.page.status, "login endpoint did not answer 200");
            self.soft_failure(&reply.page)?;
            return Ok(false);
        }

        // Some families embed the token in the response body instead of
        // setting a cookie.
        if let Some(token) = parse::parse_session_token(&reply.page.body) {
            let name = descriptor.allowed_cookie_names.first().copied().unwrap_or("SID");
            debug!(cookie = name, "session token found in login response body");
            self.fetcher.set_cookie(name, token);
            self.login_succeeded();
            return Ok(true);
        }
        for &name in descriptor.allowed_cookie_names {
            if let Some(value) = reply.cookie(name) {
                debug!(cookie = name, "session cookie set by device");
                let value = value.to_owned();
                self.fetcher.set_cookie(name, value);
                self.login_succeeded();
                return Ok(true);
            }
        }

        debug!("login response carried neither a body token nor a known cookie");
        self.soft_failure(&reply.page)?;
        Ok(false)
    }

    fn login_succeeded(&mut self) {
        self.session.failures = 0;
        self.session.state = SessionState::Authenticated;
    }

    /// Book-keeping for a login attempt the device rejected without a
    /// hard protocol error. The device error message, when present, is
    /// logged for diagnostics; its absence is not itself an error.
    fn soft_failure(&mut self, page: &PageResponse) -> Result<(), Error> {
        self.fetcher.clear_login_page();
        self.session.challenge = None;

        match self
            .parser
            .as_ref()
            .and_then(|p| p.parse_error_message(&page.body))
        {
            Some(message) => {
                warn!(host = %self.host, device_message = %message, "switch rejected login");
            }
            None => debug!("no device error message in rejected login response"),
        }

        self.session.failures += 1;
        if self.session.failures >= MAX_AUTHENTICATION_FAILURES {
            self.session.state = SessionState::LockedOut;
            return Err(Error::LoginFailed {
                message: format!(
                    "too many authentication failures ({})",
                    self.session.failures
                ),
            });
        }
        self.session.state = SessionState::Detected;
        Ok(())
    }

    /// Log out and clear the session token. Mainly useful in tests and
    /// teardown; the devices cap concurrent sessions.
    pub async fn logout(&mut self) -> Result<bool, Error> {
        let descriptor = self.ensure_detected().await?;
        let mut reached = false;

        for template in descriptor.logout {
            let params = match self.render(template, &[]) {
                Ok(params) => params,
                // No token left to render the logout with; nothing to do.
                Err(Error::EmptyTemplateParameter { .. }) => break,
                Err(e) => return Err(e),
            };
            match self
                .fetcher
                .request(template.method, template.path, &params)
                .await
            {
                Ok(response) => {
                    reached = response.status != 404;
                    if reached {
                        break;
                    }
                }
                // The session was already gone.
                Err(Error::SessionExpired) => {
                    reached = true;
                    break;
                }
                Err(Error::Connection { message }) => {
                    debug!(%message, "logout request failed");
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        self.fetcher.clear_cookie();
        if matches!(
            self.session.state,
            SessionState::Authenticated | SessionState::Reauthenticating
        ) {
            self.session.state = SessionState::Detected;
        }
        debug!(host = %self.host, reached, "logout complete");
        Ok(reached)
    }

    // ── Authenticated fetches ────────────────────────────────────────

    /// Fetch one templated page with the bounded re-login: a silently
    /// expired session triggers exactly one login and one resubmission
    /// before the failure surfaces. Transport hiccups degrade to an
    /// empty response so the caller's poll loop survives.
    pub async fn fetch_page(&mut self, template: &Template) -> Result<PageResponse, Error> {
        self.fetch_page_with(template, &[]).await
    }

    /// [`fetch_page`](Self::fetch_page) with extra form fields (control
    /// posts carry device-specific payloads on top of the template).
    pub async fn fetch_page_with(
        &mut self,
        template: &Template,
        extra: &[(String, String)],
    ) -> Result<PageResponse, Error> {
        // Body-token families cannot render a request at all without a
        // live session; log in up front rather than send a malformed
        // request.
        let needs_token = template
            .params
            .iter()
            .any(|&(_, p)| matches!(p, TemplateParam::SessionToken));
        if needs_token && self.fetcher.cookie().is_none() && !self.fetcher.is_offline() {
            if !self.login().await? {
                return Err(Error::LoginFailed {
                    message: NOT_LOGGED_IN.into(),
                });
            }
        }

        for attempt in 0..2 {
            // Render inside the loop: a re-login may have rotated the
            // session token the parameters embed.
            let params = self.render(template, extra)?;
            match self
                .fetcher
                .request(template.method, template.path, &params)
                .await
            {
                Ok(response) => return Ok(response),
                Err(Error::SessionExpired) => {
                    if attempt == 0 {
                        debug!(path = template.path, "session expired silently; re-logging in");
                        self.session.state = SessionState::Reauthenticating;
                        if self.login().await? {
                            continue;
                        }
                    }
                    return Err(Error::LoginFailed {
                        message: NOT_LOGGED_IN.into(),
                    });
                }
                Err(Error::Connection { message }) => {
                    debug!(%message, "connection failed; degrading to empty response");
                    return Ok(PageResponse::none());
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::LoginFailed {
            message: NOT_LOGGED_IN.into(),
        })
    }

    /// First 200 response among the candidate templates for a page.
    /// Exhausting the list is [`Error::PageNotLoaded`].
    pub async fn fetch_first(&mut self, templates: &[Template]) -> Result<PageResponse, Error> {
        for template in templates {
            let response = self.fetch_page(template).await?;
            if response.is_ok() {
                return Ok(response);
            }
        }
        let paths: Vec<&str> = templates.iter().map(|t| t.path).collect();
        Err(Error::PageNotLoaded {
            context: paths.join(", "),
        })
    }

    /// Resolve template parameters against session state. Offline mode
    /// sends no parameters -- canned pages ignore them.
    fn render(
        &self,
        template: &Template,
        extra: &[(String, String)],
    ) -> Result<Vec<(String, String)>, Error> {
        if self.fetcher.is_offline() {
            return Ok(Vec::new());
        }
        let mut params = Vec::with_capacity(template.params.len() + extra.len());
        for &(key, param) in template.params {
            let value = match param {
                TemplateParam::Literal(value) => value.to_owned(),
                TemplateParam::ClientHash => self
                    .session
                    .client_hash
                    .clone()
                    .ok_or(Error::EmptyTemplateParameter { name: key })?,
                TemplateParam::SessionToken => self
                    .fetcher
                    .cookie()
                    .map(|(_, value)| value.to_owned())
                    .ok_or(Error::EmptyTemplateParameter { name: key })?,
                // Credentials are only rendered by the login flow.
                TemplateParam::PasswordHash => {
                    return Err(Error::EmptyTemplateParameter { name: key });
                }
            };
            params.push((key.to_owned(), value));
        }
        params.extend_from_slice(extra);
        Ok(params)
    }

    /// Re-fetch and cache a login page (the challenge source) from the
    /// candidate endpoints.
    async fn refresh_login_page(&mut self) -> Result<(), Error> {
        for template in DETECT_TEMPLATES {
            let response = self
                .fetcher
                .request(template.method, template.path, &[])
                .await?;
            if response.is_ok() {
                self.fetcher.set_login_page(response);
                return Ok(());
            }
        }
        let paths: Vec<&str> = DETECT_TEMPLATES.iter().map(|t| t.path).collect();
        Err(Error::PageNotLoaded {
            context: paths.join(", "),
        })
    }
}

/// Render the login form: template literals plus the computed
/// credential in the descriptor's password slot.
fn render_login(template: &Template, credential: &str) -> Vec<(String, String)> {
    template
        .params
        .iter()
        .map(|&(key, param)| {
            let value = match param {
                TemplateParam::PasswordHash => credential.to_owned(),
                TemplateParam::Literal(value) => value.to_owned(),
                TemplateParam::ClientHash | TemplateParam::SessionToken => String::new(),
            };
            (key.to_owned(), value)
        })
        .collect()
}

/// Evaluate every registered descriptor against one login page.
fn evaluate_descriptors(body: &str) -> Vec<&'static ModelDescriptor> {
    let challenge_present = parse::parse_challenge_field(body).is_some();
    let title = parse::parse_login_title(body);
    let banner = parse::parse_info_banner(body);
    let script_model = parse::parse_script_model(body);

    let mut matched = Vec::new();
    for descriptor in registry() {
        let mut all_passed = true;
        let mut strong_passed = false;
        for check in descriptor.checks {
            let passed = match check {
                DetectionCheck::ChallengePresent(expected) => challenge_present == *expected,
                DetectionCheck::TitleEquals(candidates) => {
                    title.as_deref().is_some_and(|t| candidates.contains(&t))
                }
                DetectionCheck::InfoBannerEquals(candidates) => {
                    let passed = banner.as_deref().is_some_and(|b| candidates.contains(&b));
                    strong_passed |= passed;
                    passed
                }
                DetectionCheck::ScriptModelEquals(candidates) => script_model
                    .as_deref()
                    .is_some_and(|s| candidates.contains(&s)),
            };
            all_passed &= passed;
        }
        if all_passed || strong_passed {
            matched.push(descriptor);
        }
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_predicate_match_selects_one_model() {
        let body = r#"
            <title>NETGEAR GS305EP</title>
            <input type="hidden" id="rand" value="1234567">
        "#;
        let matched = evaluate_descriptors(body);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "GS305EP");
    }

    #[test]
    fn info_banner_match_wins_over_failing_checks() {
        // Banner names GS108Ev3 while the title says something else
        // entirely -- the strong predicate still binds the model.
        let body = r#"
            <title>NETGEAR login</title>
            <input type="hidden" id="rand" value="42">
            <div class="switchInfo">GS108Ev3 - 8-Port Gigabit ProSAFE Plus Switch</div>
        "#;
        let matched = evaluate_descriptors(body);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "GS108Ev3");
    }

    #[test]
    fn challenge_free_page_matches_script_models() {
        let body = "<script>sysGeneInfor = 'JGS516PE?name?V2?fw?16?a?b?c?serial';</script>";
        let matched = evaluate_descriptors(body);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "JGS516PE");
    }

    #[test]
    fn unmatched_page_matches_nothing() {
        let matched = evaluate_descriptors("<html><title>a router</title></html>");
        assert!(matched.is_empty());
    }

    #[test]
    fn render_login_fills_credential_slot() {
        let descriptor = registry()
            .iter()
            .find(|m| m.name == "JGS516PE")
            .expect("registered");
        let params = render_login(&descriptor.login, "deadbeef");
        assert_eq!(
            params,
            vec![
                ("submitId".to_owned(), "pwdLogin".to_owned()),
                ("password".to_owned(), "deadbeef".to_owned()),
                ("submitEnd".to_owned(), String::new()),
            ]
        );
    }
}
