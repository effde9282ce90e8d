#![allow(clippy::unwrap_used)]
// Integration tests for `SwitchClient` using wiremock.

use std::time::Duration;

use secrecy::SecretString;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use plusmon_api::{Error, SessionState, SwitchClient};

// ── Helpers ─────────────────────────────────────────────────────────

fn client_for(server: &MockServer) -> SwitchClient {
    SwitchClient::new(
        server.address().to_string(),
        SecretString::from("Password1".to_string()),
        Duration::from_secs(5),
    )
    .unwrap()
}

const GS305EP_LOGIN_PAGE: &str = r#"
    <html><head><title>NETGEAR GS305EP</title></head>
    <body><form>
      <input type="hidden" id="rand" value="897006492">
    </form></body></html>
"#;

const GS108EV3_LOGIN_PAGE: &str = r#"
    <html><head><title>NETGEAR GS108Ev3</title></head>
    <body>
      <div class="switchInfo">GS108Ev3 - 8-Port Gigabit ProSAFE Plus Switch</div>
      <form><input type="hidden" id="rand" value="1763184457"></form>
    </body></html>
"#;

const GS316EP_LOGIN_PAGE: &str = r#"
    <html><head><title>NETGEAR GS316EP</title></head>
    <body><form>
      <input type="hidden" id="rand" value="1127757600">
    </form></body></html>
"#;

async fn mount_login_page(server: &MockServer, page: &str) {
    Mock::given(method("GET"))
        .and(path("/login.cgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .mount(server)
        .await;
}

// ── Detection tests ─────────────────────────────────────────────────

#[tokio::test]
async fn test_detect_binds_single_model() {
    let server = MockServer::start().await;
    mount_login_page(&server, GS305EP_LOGIN_PAGE).await;

    let mut client = client_for(&server);
    let descriptor = client.detect().await.unwrap();

    assert_eq!(descriptor.name, "GS305EP");
    assert_eq!(descriptor.ports, 5);
    assert_eq!(client.state(), SessionState::Detected);
    assert_eq!(
        client.unique_id().await.unwrap(),
        format!("gs305ep_{}", server.address().to_string().replace('.', "_"))
    );
}

#[tokio::test]
async fn test_detect_unknown_page_fails() {
    let server = MockServer::start().await;
    mount_login_page(&server, "<html><title>some other device</title></html>").await;

    let mut client = client_for(&server);
    let result = client.detect().await;

    assert!(
        matches!(result, Err(Error::ModelNotDetected)),
        "expected ModelNotDetected, got: {result:?}"
    );
    assert_eq!(client.state(), SessionState::Undetected);
}

#[tokio::test]
async fn test_detect_ambiguous_page_is_fatal() {
    // Full predicate match for GS305EP plus another model's info
    // banner: two descriptors match, which means the registry or the
    // page is ill-formed.
    let page = r#"
        <html><head><title>NETGEAR GS305EP</title></head>
        <body>
          <div class="switchInfo">GS108Ev3 - 8-Port Gigabit ProSAFE Plus Switch</div>
          <input type="hidden" id="rand" value="42">
        </body></html>
    "#;
    let server = MockServer::start().await;
    mount_login_page(&server, page).await;

    let mut client = client_for(&server);
    let result = client.detect().await;

    match result {
        Err(Error::MultipleModelsDetected { ref models }) => {
            assert!(models.contains("GS305EP"), "got: {models}");
            assert!(models.contains("GS108Ev3"), "got: {models}");
        }
        other => panic!("expected MultipleModelsDetected, got: {other:?}"),
    }
}

// ── Login tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_via_cookie_submits_merged_hash() {
    let server = MockServer::start().await;
    mount_login_page(&server, GS305EP_LOGIN_PAGE).await;

    // merge_hash("Password1", "897006492") -- the device-side digest.
    Mock::given(method("POST"))
        .and(path("/login.cgi"))
        .and(body_string_contains(
            "password=6e5b60b4082b2ac23103ec2e7caf0284",
        ))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Set-Cookie", "SID=token123; Path=/")
                .set_body_string("<html>welcome</html>"),
        )
        .mount(&server)
        .await;

    let mut client = client_for(&server);
    assert!(client.login().await.unwrap());
    assert_eq!(client.state(), SessionState::Authenticated);
    assert_eq!(client.cookie(), Some(("SID", "token123")));
    assert_eq!(client.failure_count(), 0);
}

#[tokio::test]
async fn test_login_via_body_token() {
    let server = MockServer::start().await;
    mount_login_page(&server, GS316EP_LOGIN_PAGE).await;

    Mock::given(method("POST"))
        .and(path("/homepage.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><input type="hidden" name="Gambit" value="cafef00d"></html>"#,
        ))
        .mount(&server)
        .await;

    let mut client = client_for(&server);
    assert!(client.login().await.unwrap());
    assert_eq!(client.cookie(), Some(("gambitCookie", "cafef00d")));

    // The token is resent as a request parameter on body-token models.
    Mock::given(method("GET"))
        .and(path("/iss/specific/dashboard.html"))
        .and(query_param("Gambit", "cafef00d"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>dash</html>"))
        .mount(&server)
        .await;

    let descriptor = client.descriptor().unwrap();
    let page = client.fetch_page(&descriptor.info[0]).await.unwrap();
    assert!(page.is_ok());
    assert_eq!(page.body, "<html>dash</html>");
}

#[tokio::test]
async fn test_lockout_after_three_soft_failures() {
    let server = MockServer::start().await;
    mount_login_page(&server, GS305EP_LOGIN_PAGE).await;

    // 200 with neither a cookie nor a body token: soft failure.
    Mock::given(method("POST"))
        .and(path("/login.cgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><div class="pwdErrStyle">The password is invalid.</div></html>"#,
        ))
        .mount(&server)
        .await;

    let mut client = client_for(&server);
    assert!(!client.login().await.unwrap());
    assert_eq!(client.failure_count(), 1);
    assert!(!client.login().await.unwrap());
    assert_eq!(client.failure_count(), 2);

    // Third consecutive soft failure trips the lockout.
    let third = client.login().await;
    assert!(
        matches!(third, Err(Error::LoginFailed { .. })),
        "expected LoginFailed, got: {third:?}"
    );
    assert_eq!(client.state(), SessionState::LockedOut);

    // A locked-out session refuses further attempts without any I/O.
    let posts_before = login_posts(&server).await;
    let fourth = client.login().await;
    assert!(matches!(fourth, Err(Error::LoginFailed { .. })));
    assert_eq!(login_posts(&server).await, posts_before);
    assert_eq!(posts_before, 3);
}

async fn login_posts(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == "POST" && r.url.path() == "/login.cgi")
        .count()
}

// ── Silent-expiry recovery ──────────────────────────────────────────

#[tokio::test]
async fn test_expired_session_triggers_single_relogin() {
    let server = MockServer::start().await;
    mount_login_page(&server, GS305EP_LOGIN_PAGE).await;

    Mock::given(method("POST"))
        .and(path("/login.cgi"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Set-Cookie", "SID=fresh; Path=/")
                .set_body_string("<html>welcome</html>"),
        )
        .mount(&server)
        .await;

    // First status fetch answers 200 with the login redirect marker;
    // the retry gets the real page.
    Mock::given(method("GET"))
        .and(path("/dashboard.cgi"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><title>Redirect to Login</title></html>"),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dashboard.cgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>real dashboard</html>"))
        .mount(&server)
        .await;

    let mut client = client_for(&server);
    let descriptor = client.detect().await.unwrap();

    let page = client.fetch_page(&descriptor.status[0]).await.unwrap();
    assert!(page.is_ok());
    assert_eq!(page.body, "<html>real dashboard</html>");
    assert_eq!(client.state(), SessionState::Authenticated);

    let requests = server.received_requests().await.unwrap();
    let logins = requests
        .iter()
        .filter(|r| r.method.as_str() == "POST" && r.url.path() == "/login.cgi")
        .count();
    let dashboards = requests
        .iter()
        .filter(|r| r.url.path() == "/dashboard.cgi")
        .count();
    assert_eq!(logins, 1, "exactly one automatic re-login");
    assert_eq!(dashboards, 2, "original request resubmitted exactly once");
}

// ── Degradation ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_timeout_degrades_to_empty_response() {
    let server = MockServer::start().await;
    mount_login_page(&server, GS305EP_LOGIN_PAGE).await;

    Mock::given(method("GET"))
        .and(path("/dashboard.cgi"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;

    let mut client = SwitchClient::new(
        server.address().to_string(),
        SecretString::from("Password1".to_string()),
        Duration::from_millis(100),
    )
    .unwrap();
    let descriptor = client.detect().await.unwrap();

    let page = client.fetch_page(&descriptor.status[0]).await.unwrap();
    assert_eq!(page.status, 0);
    assert!(page.body.is_empty());
}

#[tokio::test]
async fn test_exhausted_templates_raise_page_not_loaded() {
    let server = MockServer::start().await;
    mount_login_page(&server, GS108EV3_LOGIN_PAGE).await;

    let mut client = client_for(&server);
    let descriptor = client.detect().await.unwrap();

    // No info endpoints mounted: every candidate 404s.
    let result = client.fetch_first(descriptor.info).await;
    assert!(
        matches!(result, Err(Error::PageNotLoaded { .. })),
        "expected PageNotLoaded, got: {result:?}"
    );
}

#[tokio::test]
async fn test_unset_template_parameter_fails_before_sending() {
    let server = MockServer::start().await;
    mount_login_page(&server, GS108EV3_LOGIN_PAGE).await;

    let mut client = client_for(&server);
    let descriptor = client.detect().await.unwrap();

    // The status template embeds the page hash, which only the info
    // page provides -- requesting out of order must fail fast.
    let result = client.fetch_page(&descriptor.status[0]).await;
    match result {
        Err(Error::EmptyTemplateParameter { name }) => assert_eq!(name, "hash"),
        other => panic!("expected EmptyTemplateParameter, got: {other:?}"),
    }

    let status_requests = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/status.htm")
        .count();
    assert_eq!(status_requests, 0, "malformed request must not be sent");
}

// ── Session resumption ──────────────────────────────────────────────

#[tokio::test]
async fn test_resumed_cookie_is_used_without_login() {
    let server = MockServer::start().await;
    mount_login_page(&server, GS305EP_LOGIN_PAGE).await;

    Mock::given(method("GET"))
        .and(path("/dashboard.cgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>dash</html>"))
        .mount(&server)
        .await;

    let mut client = client_for(&server);
    let descriptor = client.detect().await.unwrap();
    client.set_cookie("SID", "resumed-token");

    let page = client.fetch_page(&descriptor.status[0]).await.unwrap();
    assert!(page.is_ok());

    let requests = server.received_requests().await.unwrap();
    assert!(
        requests
            .iter()
            .all(|r| r.method.as_str() != "POST" || r.url.path() != "/login.cgi"),
        "no login should have been issued"
    );
    let dashboard = requests
        .iter()
        .find(|r| r.url.path() == "/dashboard.cgi")
        .expect("dashboard fetched");
    let cookie_header = dashboard
        .headers
        .get("cookie")
        .map(|v| v.to_str().unwrap_or_default().to_owned())
        .unwrap_or_default();
    assert!(
        cookie_header.contains("SID=resumed-token"),
        "got cookie header: {cookie_header}"
    );
}
