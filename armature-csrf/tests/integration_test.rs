//! Integration tests for armature-csrf

use armature_core::{HandlerFn, HttpRequest, HttpResponse, MiddlewareChain, handler_fn};
use armature_csrf::*;
use std::sync::Arc;

/// Echoes the attached token as `name:value`
fn echo_handler() -> HandlerFn {
    handler_fn(|req: HttpRequest| async move {
        let name = req.attribute("csrf_name").unwrap_or_default().to_string();
        let value = req.attribute("csrf_value").unwrap_or_default().to_string();
        Ok::<_, armature_core::Error>(HttpResponse::ok().with_text(format!("{}:{}", name, value)))
    })
}

fn token_from(response: &HttpResponse) -> CsrfToken {
    let text = response.text();
    let (name, value) = text.split_once(':').unwrap();
    CsrfToken::new(name, value)
}

fn submit(token: &CsrfToken) -> HttpRequest {
    HttpRequest::new("POST", "/profile")
        .with_form(&[
            ("csrf_name", token.name.as_str()),
            ("csrf_value", token.value.as_str()),
        ])
        .unwrap()
}

fn chain_for(csrf: CsrfMiddleware) -> MiddlewareChain {
    MiddlewareChain::new().with(csrf)
}

#[tokio::test]
async fn test_round_trip() {
    let store = MemoryTokenStore::shared();
    let chain = chain_for(CsrfMiddleware::new(CsrfConfig::default(), store).unwrap());

    let form = chain
        .apply(HttpRequest::new("GET", "/profile"), echo_handler())
        .await
        .unwrap();
    let token = token_from(&form);

    let response = chain.apply(submit(&token), echo_handler()).await.unwrap();
    assert_eq!(response.status, 200);
    assert_ne!(token_from(&response), token);
}

#[tokio::test]
async fn test_single_use_in_rotate_mode() {
    let store = MemoryTokenStore::shared();
    let chain = chain_for(CsrfMiddleware::new(CsrfConfig::default(), store.clone()).unwrap());

    let token = token_from(
        &chain
            .apply(HttpRequest::new("GET", "/profile"), echo_handler())
            .await
            .unwrap(),
    );

    let first = chain.apply(submit(&token), echo_handler()).await.unwrap();
    assert_eq!(first.status, 200);

    let replay = chain.apply(submit(&token), echo_handler()).await.unwrap();
    assert_eq!(replay.status, 400);
    assert_eq!(replay.text(), FAILURE_MESSAGE);
    assert!(!store.contains(&token.name));
}

#[tokio::test]
async fn test_tamper_rejection() {
    let store = MemoryTokenStore::shared();
    let chain = chain_for(CsrfMiddleware::new(CsrfConfig::default(), store.clone()).unwrap());

    let token = token_from(
        &chain
            .apply(HttpRequest::new("GET", "/profile"), echo_handler())
            .await
            .unwrap(),
    );

    let mut value = token.value.clone().into_bytes();
    value[31] = if value[31] == b'a' { b'b' } else { b'a' };
    let forged = CsrfToken::new(token.name.clone(), String::from_utf8(value).unwrap());

    let response = chain.apply(submit(&forged), echo_handler()).await.unwrap();
    assert_eq!(response.status, 400);
    assert_eq!(
        response.headers.get("Content-Type").map(String::as_str),
        Some("text/plain")
    );
    assert!(!store.contains(&token.name));

    // The genuine value is dead too
    let retry = chain.apply(submit(&token), echo_handler()).await.unwrap();
    assert_eq!(retry.status, 400);
}

#[tokio::test]
async fn test_failed_posts_respect_storage_limit() {
    let store = MemoryTokenStore::shared();
    let config = CsrfConfig::new("csrf").with_storage_limit(2);
    let csrf = CsrfMiddleware::new(config, store.clone()).unwrap();
    let chain = chain_for(csrf.clone());

    let mut issued = Vec::new();
    for _ in 0..3 {
        let before = store.entries().unwrap();
        let response = chain
            .apply(HttpRequest::new("POST", "/profile"), echo_handler())
            .await
            .unwrap();
        assert_eq!(response.status, 400);
        assert_eq!(response.text(), "Failed CSRF check!");

        let after = store.entries().unwrap();
        let new: Vec<_> = after.iter().filter(|e| !before.contains(e)).collect();
        assert_eq!(new.len(), 1);
        issued.push(new[0].0.clone());
    }

    assert!(store.count().unwrap() <= 2);
    assert!(!store.contains(&issued[0]));
    assert!(store.contains(&issued[1]));
    assert!(store.contains(&issued[2]));
}

#[tokio::test]
async fn test_bounded_storage_over_many_requests() {
    let store = MemoryTokenStore::shared();
    let config = CsrfConfig::default().with_storage_limit(5);
    let chain = chain_for(CsrfMiddleware::new(config, store.clone()).unwrap());

    let mut names = Vec::new();
    for _ in 0..20 {
        let response = chain
            .apply(HttpRequest::new("GET", "/"), echo_handler())
            .await
            .unwrap();
        names.push(token_from(&response).name);
        assert!(store.count().unwrap() <= 5);
    }

    let remaining: Vec<_> = store.entries().unwrap().into_iter().map(|(k, _)| k).collect();
    assert_eq!(remaining, names[15..]);
}

#[tokio::test]
async fn test_persistent_mode_stability() {
    let session = Session::shared();
    let config = CsrfConfig::default().with_persistent_token_mode(true);
    let chain = chain_for(CsrfMiddleware::with_session(config, session).unwrap());

    let first = token_from(
        &chain
            .apply(HttpRequest::new("GET", "/"), echo_handler())
            .await
            .unwrap(),
    );
    for _ in 0..3 {
        let again = token_from(
            &chain
                .apply(HttpRequest::new("GET", "/"), echo_handler())
                .await
                .unwrap(),
        );
        assert_eq!(again, first);
    }

    // Valid submissions keep the pair alive
    let ok = chain.apply(submit(&first), echo_handler()).await.unwrap();
    assert_eq!(ok.status, 200);
    assert_eq!(token_from(&ok), first);

    // A failure forces a new pair on the next response
    let forged = CsrfToken::new(first.name.clone(), "f".repeat(32));
    let rejected = chain.apply(submit(&forged), echo_handler()).await.unwrap();
    assert_eq!(rejected.status, 400);

    let next = token_from(
        &chain
            .apply(HttpRequest::new("GET", "/"), echo_handler())
            .await
            .unwrap(),
    );
    assert_ne!(next, first);
}

#[tokio::test]
async fn test_failure_handler_sees_fresh_token() {
    let store = MemoryTokenStore::shared();
    let csrf = CsrfMiddleware::builder()
        .storage(store.clone())
        .failure_handler_fn(|req: HttpRequest, _next| async move {
            let name = req.attribute("csrf_name").unwrap_or_default().to_string();
            Ok::<_, armature_core::Error>(HttpResponse::forbidden().with_text(name))
        })
        .build()
        .unwrap();
    let chain = chain_for(csrf);

    let response = chain
        .apply(HttpRequest::new("PATCH", "/profile"), echo_handler())
        .await
        .unwrap();
    assert_eq!(response.status, 403);
    assert!(store.contains(&response.text()));
}

#[tokio::test]
async fn test_failure_handler_may_forward() {
    struct Forward;

    #[async_trait::async_trait]
    impl FailureHandler for Forward {
        async fn handle(
            &self,
            req: HttpRequest,
            next: armature_core::Next,
        ) -> std::result::Result<HttpResponse, armature_core::Error> {
            next(req).await
        }
    }

    let csrf = CsrfMiddleware::builder()
        .storage(MemoryTokenStore::shared())
        .failure_handler(Forward)
        .build()
        .unwrap();

    let response = chain_for(csrf)
        .apply(HttpRequest::new("PUT", "/profile"), echo_handler())
        .await
        .unwrap();
    assert_eq!(response.status, 200);
    assert!(response.text().starts_with("csrf"));
}

#[test]
fn test_strength_floor() {
    for strength in [0, 1, 8, 15] {
        let result = CsrfMiddleware::new(
            CsrfConfig::default().with_strength(strength),
            MemoryTokenStore::shared(),
        );
        assert!(matches!(result, Err(CsrfError::Configuration(_))));
    }

    let csrf = CsrfMiddleware::new(
        CsrfConfig::default().with_strength(32),
        MemoryTokenStore::shared(),
    )
    .unwrap();
    assert_eq!(csrf.generate_token().unwrap().value.len(), 64);
}

#[test]
fn test_no_storage_no_session() {
    let result = CsrfMiddleware::builder().config(CsrfConfig::default()).build();
    assert!(matches!(result, Err(CsrfError::Configuration(_))));
}

struct BrokenEntropy;

impl EntropySource for BrokenEntropy {
    fn fill(&self, _dest: &mut [u8]) -> armature_csrf::Result<()> {
        Err(CsrfError::EntropyUnavailable("no entropy".into()))
    }
}

#[tokio::test]
async fn test_entropy_failure_escapes_guard() {
    let csrf = CsrfMiddleware::builder()
        .storage(MemoryTokenStore::shared())
        .entropy(Arc::new(BrokenEntropy))
        .build()
        .unwrap();

    let err = chain_for(csrf)
        .apply(HttpRequest::new("GET", "/"), echo_handler())
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 500);
}

#[tokio::test]
async fn test_json_body_submission() {
    let store = MemoryTokenStore::shared();
    let csrf = CsrfMiddleware::new(CsrfConfig::default(), store).unwrap();
    let token = csrf.generate_token().unwrap();

    let req = HttpRequest::new("POST", "/api/items")
        .with_json(&token_body(&token))
        .unwrap();
    let response = chain_for(csrf).apply(req, echo_handler()).await.unwrap();
    assert_eq!(response.status, 200);
}

fn token_body(token: &CsrfToken) -> serde_json::Value {
    serde_json::json!({
        "csrf_name": token.name,
        "csrf_value": token.value,
        "title": "hello",
    })
}

#[test]
fn test_config_from_env() {
    temp_env::with_vars(
        [
            ("ARMATURE_CSRF_PREFIX", Some("guard_")),
            ("ARMATURE_CSRF_STRENGTH", Some("24")),
            ("ARMATURE_CSRF_STORAGE_LIMIT", Some("10")),
            ("ARMATURE_CSRF_PERSISTENT", Some("true")),
            ("ARMATURE_CSRF_EXCLUDE_PATHS", Some("/hooks, /health")),
        ],
        || {
            let config = CsrfConfig::from_env().unwrap();
            assert_eq!(config.prefix, "guard");
            assert_eq!(config.strength, 24);
            assert_eq!(config.storage_limit, 10);
            assert!(config.persistent_token_mode);
            assert_eq!(config.exclude_paths, ["/hooks", "/health"]);
        },
    );

    temp_env::with_var("ARMATURE_CSRF_STRENGTH", Some("lots"), || {
        assert!(matches!(
            CsrfConfig::from_env(),
            Err(CsrfError::Configuration(_))
        ));
    });
}

#[test]
fn test_token_serialization() {
    let token = CsrfToken::new("csrfabc", "00ff");
    let json = serde_json::to_string(&token).unwrap();
    assert_eq!(json, r#"{"name":"csrfabc","value":"00ff"}"#);
}
