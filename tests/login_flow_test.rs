// Integration tests for login orchestration
//
// These tests drive LoginManager end to end with scripted collaborators in
// place of the terminal prompts, browser capture and token service.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use spsearch_login::{
    auth::{
        current_identity, AuthKind, AuthMethod, BearerToken, Cookie, CookieBag, Credential,
        LoginManager, LoginOptions, LoginParams, SearchRequest, SessionCredentialCache, SessionId,
        DEFAULT_TOKEN_TIMEOUT,
    },
    error::{LoginError, MethodSource},
    ports::{CaptureRequest, CookieCapture, CredentialPrompt, TokenProvider, TokenRequest},
};

// ==================================================================================================
// Test Helpers
// ==================================================================================================

#[derive(Default)]
struct ScriptedPrompt {
    answer: Option<(String, String)>,
    calls: AtomicUsize,
    last_default: Mutex<Option<String>>,
}

impl ScriptedPrompt {
    fn answering(username: &str, password: &str) -> Self {
        Self {
            answer: Some((username.to_string(), password.to_string())),
            ..Self::default()
        }
    }
}

#[async_trait]
impl CredentialPrompt for ScriptedPrompt {
    async fn prompt(
        &self,
        _message: &str,
        default_username: Option<&str>,
    ) -> anyhow::Result<Option<Credential>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_default.lock().unwrap() = default_username.map(str::to_string);
        Ok(self
            .answer
            .as_ref()
            .map(|(user, password)| Credential::new(user.as_str(), password.as_str())))
    }
}

#[derive(Default)]
struct CountingCapture {
    bag: Option<CookieBag>,
    delay: Duration,
    calls: AtomicUsize,
}

impl CountingCapture {
    fn returning(bag: Option<CookieBag>) -> Self {
        Self {
            bag,
            ..Self::default()
        }
    }
}

#[async_trait]
impl CookieCapture for CountingCapture {
    async fn capture(&self, request: CaptureRequest) -> anyhow::Result<Option<CookieBag>> {
        assert_eq!(request.style, AuthKind::LegacyCookie);
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.bag.clone())
    }
}

/// Token provider answering after `delay`, or never when `delay` is None
#[derive(Default)]
struct StubTokens {
    delay: Option<Duration>,
    calls: AtomicUsize,
    last_request: Mutex<Option<TokenRequest>>,
}

impl StubTokens {
    fn after(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    fn never() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenProvider for StubTokens {
    async fn login(&self, request: TokenRequest) -> anyhow::Result<BearerToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request);
        match self.delay {
            Some(delay) => {
                tokio::time::sleep(delay).await;
                Ok(BearerToken::new("eyJ0eXAiOiJKV1QiLCJhbGciOiJSUzI1NiJ9"))
            }
            None => {
                futures::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

struct Harness {
    prompt: Arc<ScriptedPrompt>,
    capture: Arc<CountingCapture>,
    tokens: Arc<StubTokens>,
    manager: LoginManager,
}

fn harness(prompt: ScriptedPrompt, capture: CountingCapture, tokens: StubTokens) -> Harness {
    let prompt = Arc::new(prompt);
    let capture = Arc::new(capture);
    let tokens = Arc::new(tokens);
    let manager = LoginManager::new(prompt.clone(), capture.clone(), tokens.clone())
        .with_cache(SessionCredentialCache::new());

    Harness {
        prompt,
        capture,
        tokens,
        manager,
    }
}

fn fed_auth_bag() -> CookieBag {
    CookieBag::new(vec![
        Cookie::new("FedAuth", "77u/PD94bWwgdmVyc2lvbj0iMS4wIj8+"),
        Cookie::new("rtFa", "mV0cmEuY29t"),
    ])
}

fn assert_untouched(request: &SearchRequest) {
    assert_eq!(request.auth_kind(), None);
    assert!(request.material().is_none());
}

// ==================================================================================================
// Scenarios
// ==================================================================================================

#[tokio::test]
async fn test_override_network_credential_prompts_for_credential() {
    let h = harness(
        ScriptedPrompt::answering("alice", "secret"),
        CountingCapture::default(),
        StubTokens::never(),
    );
    let mut request = SearchRequest::new("https://contoso.sharepoint.com");
    let params = LoginParams {
        explicit_method: Some(AuthMethod::Windows),
        ..LoginParams::default()
    };

    let kind = h.manager.login(&mut request, &params).await.unwrap();

    assert_eq!(kind, AuthKind::NetworkCredential);
    assert_eq!(request.auth_kind(), Some(AuthKind::NetworkCredential));
    assert_eq!(request.username.as_deref(), Some("alice"));
    assert_eq!(request.secret().unwrap().expose_secret(), "secret");
    assert!(request.cookies().is_none());
    assert!(request.token().is_none());
    assert_eq!(h.prompt.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_preset_legacy_cookie_fills_session_cache() {
    let h = harness(
        ScriptedPrompt::default(),
        CountingCapture::returning(Some(fed_auth_bag())),
        StubTokens::never(),
    );
    let session = SessionId::new();
    let mut request = SearchRequest::new("https://contoso.sharepoint.com/sites/hr");
    let params = LoginParams {
        session,
        using_preset: true,
        preset_method: Some(AuthMethod::Spo),
        ..LoginParams::default()
    };

    assert!(!h.manager.cache().contains(&session));

    let kind = h.manager.login(&mut request, &params).await.unwrap();

    assert_eq!(kind, AuthKind::LegacyCookie);
    assert_eq!(request.auth_kind(), Some(AuthKind::LegacyCookie));
    assert_eq!(request.cookies().unwrap().names(), vec!["FedAuth", "rtFa"]);
    assert!(request.secret().is_none());
    assert!(h.manager.cache().contains(&session));
    assert_eq!(h.capture.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cloud_host_guess_acquires_management_token() {
    let h = harness(
        ScriptedPrompt::default(),
        CountingCapture::default(),
        StubTokens::after(Duration::from_secs(2)),
    );
    let mut request = SearchRequest::new("https://contoso.sharepoint.com");

    let kind = h
        .manager
        .login(&mut request, &LoginParams::default())
        .await
        .unwrap();

    assert_eq!(kind, AuthKind::ManagementToken);
    assert_eq!(request.auth_kind(), Some(AuthKind::ManagementToken));
    assert!(request.token().is_some());
    assert!(request.secret().is_none());
    assert_eq!(h.tokens.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.prompt.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_preset_with_anonymous_method_is_unsupported() {
    let h = harness(
        ScriptedPrompt::default(),
        CountingCapture::default(),
        StubTokens::never(),
    );
    let mut request = SearchRequest::new("https://intranet.contoso.com");
    let params = LoginParams {
        using_preset: true,
        preset_method: Some(AuthMethod::Anonymous),
        ..LoginParams::default()
    };

    let err = h.manager.login(&mut request, &params).await.unwrap_err();

    match err {
        LoginError::UnsupportedMethod { ref method, origin } => {
            assert_eq!(method, "Anonymous");
            assert_eq!(origin, MethodSource::Preset);
        }
        ref other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("override"));
    assert_untouched(&request);
}

#[tokio::test(start_paused = true)]
async fn test_never_resolving_token_provider_times_out() {
    let h = harness(
        ScriptedPrompt::default(),
        CountingCapture::default(),
        StubTokens::never(),
    );
    let mut request = SearchRequest::new("https://contoso.sharepoint.com");
    let params = LoginParams {
        explicit_method: Some(AuthMethod::SpoManagement),
        ..LoginParams::default()
    };

    let started = Instant::now();
    let err = h.manager.login(&mut request, &params).await.unwrap_err();

    assert!(started.elapsed() >= DEFAULT_TOKEN_TIMEOUT);
    assert!(matches!(err, LoginError::TimedOut { after } if after == DEFAULT_TOKEN_TIMEOUT));
    assert_eq!(
        err.to_string(),
        "Prompt for user credentials timed out after 5 minutes"
    );
    assert_untouched(&request);
}

// ==================================================================================================
// Strategy Behavior
// ==================================================================================================

#[tokio::test]
async fn test_null_cookie_capture_fails_without_caching() {
    let h = harness(
        ScriptedPrompt::default(),
        CountingCapture::returning(None),
        StubTokens::never(),
    );
    let session = SessionId::new();
    let mut request = SearchRequest::new("https://contoso.sharepoint.com");
    let params = LoginParams {
        session,
        explicit_method: Some(AuthMethod::Spo),
        ..LoginParams::default()
    };

    let err = h.manager.login(&mut request, &params).await.unwrap_err();

    match err {
        LoginError::AuthenticationFailed(msg) => assert!(msg.contains("null")),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(h.capture.calls.load(Ordering::SeqCst), 1);
    assert!(!h.manager.cache().contains(&session));
    assert_untouched(&request);
}

#[tokio::test]
async fn test_empty_cookie_bag_is_a_failure() {
    let h = harness(
        ScriptedPrompt::default(),
        CountingCapture::returning(Some(CookieBag::default())),
        StubTokens::never(),
    );
    let mut request = SearchRequest::new("https://contoso.sharepoint.com");
    let params = LoginParams {
        explicit_method: Some(AuthMethod::Spo),
        ..LoginParams::default()
    };

    let err = h.manager.login(&mut request, &params).await.unwrap_err();
    assert!(matches!(err, LoginError::AuthenticationFailed(_)));
    assert!(h.manager.cache().is_empty());
}

#[tokio::test]
async fn test_cached_cookies_reused_within_session() {
    let h = harness(
        ScriptedPrompt::default(),
        CountingCapture::returning(Some(fed_auth_bag())),
        StubTokens::never(),
    );
    let session = SessionId::new();
    let params = LoginParams {
        session,
        explicit_method: Some(AuthMethod::Spo),
        ..LoginParams::default()
    };

    let mut first = SearchRequest::new("https://contoso.sharepoint.com");
    let mut second = SearchRequest::new("https://contoso.sharepoint.com/sites/hr");
    h.manager.login(&mut first, &params).await.unwrap();
    h.manager.login(&mut second, &params).await.unwrap();

    assert_eq!(h.capture.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        second.cookies().unwrap().header_value().expose_secret(),
        first.cookies().unwrap().header_value().expose_secret()
    );

    // A different session captures its own cookies
    let other = LoginParams {
        session: SessionId::new(),
        ..params
    };
    let mut third = SearchRequest::new("https://contoso.sharepoint.com");
    h.manager.login(&mut third, &other).await.unwrap();
    assert_eq!(h.capture.calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.manager.cache().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_use_captures_once() {
    let capture = CountingCapture {
        bag: Some(fed_auth_bag()),
        delay: Duration::from_millis(50),
        calls: AtomicUsize::new(0),
    };
    let h = harness(ScriptedPrompt::default(), capture, StubTokens::never());
    let manager = Arc::new(h.manager);
    let session = SessionId::new();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let manager = Arc::clone(&manager);
        handles.push(tokio::spawn(async move {
            let mut request = SearchRequest::new("https://contoso.sharepoint.com");
            let params = LoginParams {
                session,
                explicit_method: Some(AuthMethod::Spo),
                ..LoginParams::default()
            };
            manager.login(&mut request, &params).await.map(|_| request)
        }));
    }

    for handle in handles {
        let request = handle.await.unwrap().unwrap();
        assert_eq!(request.cookies().unwrap().len(), 2);
    }

    assert_eq!(h.capture.calls.load(Ordering::SeqCst), 1);
    assert_eq!(manager.cache().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_null_capture_runs_once() {
    let capture = CountingCapture {
        bag: None,
        delay: Duration::from_millis(50),
        calls: AtomicUsize::new(0),
    };
    let h = harness(ScriptedPrompt::default(), capture, StubTokens::never());
    let manager = Arc::new(h.manager);
    let session = SessionId::new();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let manager = Arc::clone(&manager);
        handles.push(tokio::spawn(async move {
            let mut request = SearchRequest::new("https://contoso.sharepoint.com");
            let params = LoginParams {
                session,
                explicit_method: Some(AuthMethod::Spo),
                ..LoginParams::default()
            };
            let result = manager.login(&mut request, &params).await;
            (result, request)
        }));
    }

    for handle in handles {
        let (result, request) = handle.await.unwrap();
        assert!(matches!(result, Err(LoginError::AuthenticationFailed(_))));
        assert_untouched(&request);
    }

    assert_eq!(h.capture.calls.load(Ordering::SeqCst), 1);
    assert!(!manager.cache().contains(&session));
}

#[tokio::test]
async fn test_cached_cookies_ignore_malformed_site_url() {
    let h = harness(
        ScriptedPrompt::default(),
        CountingCapture::returning(Some(fed_auth_bag())),
        StubTokens::never(),
    );
    let params = LoginParams {
        session: SessionId::new(),
        explicit_method: Some(AuthMethod::Spo),
        ..LoginParams::default()
    };

    let mut first = SearchRequest::new("https://contoso.sharepoint.com");
    h.manager.login(&mut first, &params).await.unwrap();

    let mut second = SearchRequest::new("sites/hr");
    let kind = h.manager.login(&mut second, &params).await.unwrap();

    assert_eq!(kind, AuthKind::LegacyCookie);
    assert_eq!(second.cookies().unwrap().names(), vec!["FedAuth", "rtFa"]);
    assert_eq!(h.capture.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_explicit_credential_skips_prompt() {
    let h = harness(
        ScriptedPrompt::answering("mallory", "wrong"),
        CountingCapture::default(),
        StubTokens::never(),
    );
    let mut request = SearchRequest::new("https://intranet.contoso.com");
    let params = LoginParams {
        credential: Some(Credential::new("CONTOSO\\bob", "Passw0rd!")),
        ..LoginParams::default()
    };

    let kind = h.manager.login(&mut request, &params).await.unwrap();

    assert_eq!(kind, AuthKind::NetworkCredential);
    assert_eq!(request.username.as_deref(), Some("CONTOSO\\bob"));
    assert_eq!(request.secret().unwrap().expose_secret(), "Passw0rd!");
    assert_eq!(h.prompt.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_prompt_defaults_to_request_username() {
    let h = harness(
        ScriptedPrompt::answering("CONTOSO\\alice", "pw"),
        CountingCapture::default(),
        StubTokens::never(),
    );
    let mut request = SearchRequest::new("https://intranet.contoso.com");
    request.username = Some("CONTOSO\\alice".to_string());
    let params = LoginParams {
        using_preset: true,
        preset_method: Some(AuthMethod::Windows),
        ..LoginParams::default()
    };

    h.manager.login(&mut request, &params).await.unwrap();

    assert_eq!(
        h.prompt.last_default.lock().unwrap().as_deref(),
        Some("CONTOSO\\alice")
    );
}

#[tokio::test]
async fn test_cancelled_prompt_fails() {
    let h = harness(
        ScriptedPrompt::default(),
        CountingCapture::default(),
        StubTokens::never(),
    );
    let mut request = SearchRequest::new("https://intranet.contoso.com");
    let params = LoginParams {
        explicit_method: Some(AuthMethod::Windows),
        ..LoginParams::default()
    };

    let err = h.manager.login(&mut request, &params).await.unwrap_err();
    assert!(matches!(err, LoginError::AuthenticationFailed(_)));
    assert_untouched(&request);
}

#[tokio::test]
async fn test_management_token_receives_credential_and_force_flag() {
    let h = harness(
        ScriptedPrompt::default(),
        CountingCapture::default(),
        StubTokens::after(Duration::ZERO),
    );
    let mut request = SearchRequest::new("https://contoso.sharepoint.com");
    let params = LoginParams {
        credential: Some(Credential::new("alice@contoso.com", "pw")),
        options: LoginOptions {
            force_login_prompt: true,
            skip_server_certificate_validation: true,
        },
        ..LoginParams::default()
    };

    let kind = h.manager.login(&mut request, &params).await.unwrap();
    assert_eq!(kind, AuthKind::ManagementToken);

    let last = h.tokens.last_request.lock().unwrap().take().unwrap();
    assert!(last.force_interactive);
    assert!(last.accept_invalid_certs);
    assert_eq!(last.credential.unwrap().username, "alice@contoso.com");
    assert_eq!(last.site_url.host_str(), Some("contoso.sharepoint.com"));
}

#[tokio::test(start_paused = true)]
async fn test_custom_token_timeout() {
    let prompt = Arc::new(ScriptedPrompt::default());
    let capture = Arc::new(CountingCapture::default());
    let tokens = Arc::new(StubTokens::after(Duration::from_secs(30)));
    let manager = LoginManager::new(prompt, capture, tokens)
        .with_cache(SessionCredentialCache::new())
        .with_token_timeout(Duration::from_secs(10));

    let mut request = SearchRequest::new("https://contoso.sharepoint.com");
    let started = Instant::now();
    let err = manager
        .login(&mut request, &LoginParams::default())
        .await
        .unwrap_err();

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(10));
    assert!(elapsed < Duration::from_secs(30));
    assert!(matches!(err, LoginError::TimedOut { .. }));
}

#[tokio::test]
async fn test_current_identity_sets_username_only() {
    let h = harness(
        ScriptedPrompt::default(),
        CountingCapture::default(),
        StubTokens::never(),
    );
    let mut request = SearchRequest::new("http://sp2019/sites/search");

    let result = h.manager.login(&mut request, &LoginParams::default()).await;

    // The outcome follows whatever identity this process actually runs as
    match current_identity() {
        Ok(identity) => {
            assert_eq!(result.unwrap(), AuthKind::CurrentIdentity);
            assert_eq!(request.auth_kind(), Some(AuthKind::CurrentIdentity));
            assert_eq!(request.username.as_deref(), Some(identity.as_str()));
            assert!(request.material().is_none());
        }
        Err(_) => {
            assert!(matches!(result, Err(LoginError::EnvironmentFailure(_))));
            assert_untouched(&request);
        }
    }
}

#[tokio::test]
async fn test_invalid_site_url_for_cookie_login() {
    let h = harness(
        ScriptedPrompt::default(),
        CountingCapture::returning(Some(fed_auth_bag())),
        StubTokens::never(),
    );
    let mut request = SearchRequest::new("sites/hr");
    let params = LoginParams {
        explicit_method: Some(AuthMethod::Spo),
        ..LoginParams::default()
    };

    let err = h.manager.login(&mut request, &params).await.unwrap_err();
    assert!(matches!(err, LoginError::AuthenticationFailed(_)));
    assert_eq!(h.capture.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failed_login_keeps_previous_credential() {
    let h = harness(
        ScriptedPrompt::answering("alice", "first"),
        CountingCapture::returning(None),
        StubTokens::never(),
    );
    let mut request = SearchRequest::new("https://intranet.contoso.com");

    let windows = LoginParams {
        explicit_method: Some(AuthMethod::Windows),
        ..LoginParams::default()
    };
    tokio_test::assert_ok!(h.manager.login(&mut request, &windows).await);

    let cookies = LoginParams {
        explicit_method: Some(AuthMethod::Spo),
        ..LoginParams::default()
    };
    tokio_test::assert_err!(h.manager.login(&mut request, &cookies).await);

    assert_eq!(request.auth_kind(), Some(AuthKind::NetworkCredential));
    assert_eq!(request.secret().unwrap().expose_secret(), "first");
    assert!(request.cookies().is_none());
}
