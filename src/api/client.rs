//! Authenticated API Client
//!
//! Attaches the stored access token to every request. The first request
//! to come back 401 starts a refresh-token exchange; any other request
//! that hits 401 meanwhile waits on that same exchange instead of
//! starting its own. Each waiter is retried once with the new token.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use futures::future::{AbortHandle, Abortable, FutureExt, LocalBoxFuture, Shared};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::storage::TokenStorage;
use super::transport::{HttpRequest, HttpResponse, Method, Transport};
use crate::error::ApiError;
use crate::models::{Claims, TokenPair};

pub const REFRESH_PATH: &str = "/auth/refresh";

/// Outcome of one refresh, shared by every request waiting on it
type RefreshFuture = Shared<LocalBoxFuture<'static, Result<String, ApiError>>>;

#[derive(Clone)]
pub struct ApiClient {
    inner: Rc<ClientInner>,
}

struct ClientInner {
    transport: Rc<dyn Transport>,
    storage: Rc<dyn TokenStorage>,
    /// Set while a refresh is in flight
    refreshing: RefCell<Option<RefreshFuture>>,
    in_flight: RefCell<HashMap<u64, AbortHandle>>,
    next_request: Cell<u64>,
    on_session_expired: RefCell<Option<Rc<dyn Fn()>>>,
}

impl ApiClient {
    pub fn new(transport: impl Transport + 'static, storage: impl TokenStorage + 'static) -> Self {
        Self {
            inner: Rc::new(ClientInner {
                transport: Rc::new(transport),
                storage: Rc::new(storage),
                refreshing: RefCell::new(None),
                in_flight: RefCell::new(HashMap::new()),
                next_request: Cell::new(0),
                on_session_expired: RefCell::new(None),
            }),
        }
    }

    pub fn storage(&self) -> &dyn TokenStorage {
        self.inner.storage.as_ref()
    }

    /// Called after a failed refresh has cleared the tokens
    pub fn on_session_expired(&self, hook: impl Fn() + 'static) {
        *self.inner.on_session_expired.borrow_mut() = Some(Rc::new(hook));
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.refreshing.borrow().is_some()
    }

    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.borrow().len()
    }

    /// Identity from the stored access token
    pub fn claims(&self) -> Result<Claims, ApiError> {
        let token = self.inner.storage.access_token().ok_or(ApiError::Unauthorized)?;
        Claims::from_token(&token)
    }

    // ========================
    // Typed helpers
    // ========================

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(HttpRequest::new(Method::Get, path)).await?.json()
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(HttpRequest::new(Method::Post, path).with_body(to_body(body)?))
            .await?
            .json()
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(HttpRequest::new(Method::Patch, path).with_body(to_body(body)?))
            .await?
            .json()
    }

    /// PATCH where only success matters
    pub async fn patch_ok<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        self.send(HttpRequest::new(Method::Patch, path).with_body(to_body(body)?))
            .await?
            .error_for_status()
            .map(drop)
    }

    /// Bodiless POST where only success matters
    pub async fn post_ok(&self, path: &str) -> Result<(), ApiError> {
        self.send(HttpRequest::new(Method::Post, path))
            .await?
            .error_for_status()
            .map(drop)
    }

    /// GET a non-JSON body (spreadsheet exports)
    pub async fn get_raw(&self, path: &str) -> Result<HttpResponse, ApiError> {
        self.send(HttpRequest::new(Method::Get, path)).await?.error_for_status()
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(HttpRequest::new(Method::Delete, path))
            .await?
            .error_for_status()
            .map(drop)
    }

    /// Unauthenticated POST (login, registration): no bearer, no refresh
    pub async fn post_anonymous<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<HttpResponse, ApiError> {
        let request = HttpRequest::new(Method::Post, path).with_body(to_body(body)?);
        self.inner.transport.send(request).await
    }

    // ========================
    // Core
    // ========================

    /// Send with bearer token, refreshing once on 401.
    /// Resolves to `Cancelled` if `cancel_all` runs first.
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let (handle, registration) = AbortHandle::new_pair();
        let id = self.inner.next_request.get();
        self.inner.next_request.set(id.wrapping_add(1));
        self.inner.in_flight.borrow_mut().insert(id, handle);

        let path = request.path.clone();
        let outcome = Abortable::new(self.send_with_refresh(request), registration).await;
        self.inner.in_flight.borrow_mut().remove(&id);

        outcome.unwrap_or_else(|_aborted| {
            debug!(%path, "request cancelled");
            Err(ApiError::Cancelled)
        })
    }

    async fn send_with_refresh(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let bearer = self.inner.storage.access_token();
        let response = self.inner.transport.send(request.clone().with_bearer(bearer)).await?;
        if !response.is_unauthorized() {
            return Ok(response);
        }

        debug!(path = %request.path, "401, waiting for token refresh");
        let token = self.refreshed_token().await?;
        self.inner.transport.send(request.with_bearer(Some(token))).await
    }

    /// Join the refresh in flight, or start one
    fn refreshed_token(&self) -> RefreshFuture {
        let pending = self.inner.refreshing.borrow().clone();
        if let Some(pending) = pending {
            return pending;
        }

        let inner = Rc::clone(&self.inner);
        let refresh = async move {
            let result = exchange_refresh_token(&inner).await;
            inner.refreshing.borrow_mut().take();
            result
        }
        .boxed_local()
        .shared();

        *self.inner.refreshing.borrow_mut() = Some(refresh.clone());
        refresh
    }

    /// Abort every outstanding request and drop any refresh in flight
    pub fn cancel_all(&self) {
        let handles: Vec<AbortHandle> = self.inner.in_flight.borrow_mut().drain().map(|(_, handle)| handle).collect();
        for handle in &handles {
            handle.abort();
        }
        self.inner.refreshing.borrow_mut().take();
        info!(count = handles.len(), "cancelled outstanding requests");
    }
}

fn to_body<B: Serialize + ?Sized>(body: &B) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::Decode(e.to_string()))
}

async fn exchange_refresh_token(inner: &ClientInner) -> Result<String, ApiError> {
    let outcome = match inner.storage.refresh_token().filter(|token| !token.is_empty()) {
        Some(refresh_token) => {
            let request = HttpRequest::new(Method::Post, REFRESH_PATH)
                .with_body(json!({ "refresh_token": refresh_token }));
            match inner.transport.send(request).await {
                Ok(response) => response.json::<TokenPair>(),
                Err(err) => Err(err),
            }
        }
        None => Err(ApiError::RefreshFailed("no refresh token stored".to_string())),
    };

    match outcome {
        Ok(tokens) => {
            inner.storage.store(&tokens);
            info!("access token refreshed");
            Ok(tokens.access_token)
        }
        Err(err) => {
            warn!(error = %err, "token refresh failed, clearing session");
            inner.storage.clear();
            let hook = inner.on_session_expired.borrow().clone();
            if let Some(hook) = hook {
                hook();
            }
            Err(match err {
                ApiError::RefreshFailed(_) => err,
                other => ApiError::RefreshFailed(other.to_string()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::storage::MemoryStorage;
    use async_trait::async_trait;
    use std::cell::RefCell;

    /// Accepts one bearer token at a time; `/auth/refresh` rotates it.
    /// Every call yields once so concurrent requests interleave.
    struct FakeBackend {
        valid_token: RefCell<String>,
        refresh_succeeds: bool,
        refresh_calls: Cell<usize>,
        seen: RefCell<Vec<(String, Option<String>)>>,
    }

    impl FakeBackend {
        fn new(valid_token: &str, refresh_succeeds: bool) -> Rc<Self> {
            Rc::new(Self {
                valid_token: RefCell::new(valid_token.to_string()),
                refresh_succeeds,
                refresh_calls: Cell::new(0),
                seen: RefCell::new(Vec::new()),
            })
        }
    }

    struct FakeTransport(Rc<FakeBackend>);

    #[async_trait(?Send)]
    impl Transport for FakeTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
            tokio::task::yield_now().await;
            let backend = &self.0;
            backend.seen.borrow_mut().push((request.path.clone(), request.bearer.clone()));

            if request.path == REFRESH_PATH {
                backend.refresh_calls.set(backend.refresh_calls.get() + 1);
                tokio::task::yield_now().await;
                if !backend.refresh_succeeds {
                    return Ok(HttpResponse::new(401, r#"{"message":"refresh token expired"}"#));
                }
                *backend.valid_token.borrow_mut() = "fresh-access".to_string();
                return Ok(HttpResponse::new(
                    200,
                    r#"{"access_token":"fresh-access","refresh_token":"fresh-refresh"}"#,
                ));
            }

            if request.bearer.as_deref() == Some(backend.valid_token.borrow().as_str()) {
                Ok(HttpResponse::new(200, format!(r#"{{"path":"{}"}}"#, request.path)))
            } else {
                Ok(HttpResponse::new(401, r#"{"message":"Unauthorized"}"#))
            }
        }
    }

    #[derive(serde::Deserialize)]
    struct Echo {
        path: String,
    }

    fn client_with(backend: &Rc<FakeBackend>) -> ApiClient {
        ApiClient::new(FakeTransport(Rc::clone(backend)), MemoryStorage::with_tokens("stale-access", "old-refresh"))
    }

    #[tokio::test]
    async fn test_concurrent_401s_share_one_refresh() {
        let backend = FakeBackend::new("current-access", true);
        let client = client_with(&backend);

        let (a, b, c) = tokio::join!(
            client.get::<Echo>("/accounts"),
            client.get::<Echo>("/contacts"),
            client.get::<Echo>("/tasks"),
        );

        assert_eq!(a.unwrap().path, "/accounts");
        assert_eq!(b.unwrap().path, "/contacts");
        assert_eq!(c.unwrap().path, "/tasks");
        assert_eq!(backend.refresh_calls.get(), 1);
        assert!(!client.is_refreshing());
        assert_eq!(client.storage().access_token().as_deref(), Some("fresh-access"));
        assert_eq!(client.storage().refresh_token().as_deref(), Some("fresh-refresh"));

        // Each original request was retried with the refreshed token
        let retried = backend
            .seen
            .borrow()
            .iter()
            .filter(|(path, bearer)| path != REFRESH_PATH && bearer.as_deref() == Some("fresh-access"))
            .count();
        assert_eq!(retried, 3);
    }

    #[tokio::test]
    async fn test_valid_token_skips_refresh() {
        let backend = FakeBackend::new("stale-access", true);
        let client = client_with(&backend);

        let echo: Echo = client.get("/users").await.unwrap();

        assert_eq!(echo.path, "/users");
        assert_eq!(backend.refresh_calls.get(), 0);
        assert_eq!(client.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_failed_refresh_rejects_waiters_and_clears_tokens() {
        let backend = FakeBackend::new("current-access", false);
        let client = client_with(&backend);
        let expired = Rc::new(Cell::new(0));
        let counter = Rc::clone(&expired);
        client.on_session_expired(move || counter.set(counter.get() + 1));

        let (a, b) = tokio::join!(client.get::<Echo>("/accounts"), client.get::<Echo>("/tasks"));

        assert!(matches!(a, Err(ApiError::RefreshFailed(_))));
        assert!(matches!(b, Err(ApiError::RefreshFailed(_))));
        assert_eq!(backend.refresh_calls.get(), 1);
        assert_eq!(expired.get(), 1);
        assert_eq!(client.storage().access_token(), None);
        assert_eq!(client.storage().refresh_token(), None);
    }

    #[tokio::test]
    async fn test_missing_refresh_token_fails_without_network_call() {
        let backend = FakeBackend::new("current-access", true);
        let client = ApiClient::new(FakeTransport(Rc::clone(&backend)), MemoryStorage::default());

        let result = client.get::<Echo>("/accounts").await;

        assert!(matches!(result, Err(ApiError::RefreshFailed(_))));
        assert_eq!(backend.refresh_calls.get(), 0);
    }

    #[tokio::test]
    async fn test_second_401_after_retry_is_not_refreshed_again() {
        struct AlwaysUnauthorized(Rc<FakeBackend>);

        #[async_trait(?Send)]
        impl Transport for AlwaysUnauthorized {
            async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
                if request.path == REFRESH_PATH {
                    self.0.refresh_calls.set(self.0.refresh_calls.get() + 1);
                    return Ok(HttpResponse::new(200, r#"{"access_token":"a2","refresh_token":"r2"}"#));
                }
                Ok(HttpResponse::new(401, ""))
            }
        }

        let backend = FakeBackend::new("unused", true);
        let client = ApiClient::new(AlwaysUnauthorized(Rc::clone(&backend)), MemoryStorage::with_tokens("a1", "r1"));

        let result = client.get::<Echo>("/reports").await;

        assert_eq!(result.err(), Some(ApiError::Unauthorized));
        assert_eq!(backend.refresh_calls.get(), 1);
    }

    #[tokio::test]
    async fn test_cancel_all_aborts_outstanding_requests() {
        let backend = FakeBackend::new("stale-access", true);
        let client = client_with(&backend);

        let canceller = client.clone();
        let (first, second, ()) = tokio::join!(
            client.get::<Echo>("/accounts"),
            client.get::<Echo>("/contacts"),
            async move {
                // Both requests are parked in the transport by now
                assert_eq!(canceller.in_flight(), 2);
                canceller.cancel_all();
            },
        );

        assert_eq!(first.err(), Some(ApiError::Cancelled));
        assert_eq!(second.err(), Some(ApiError::Cancelled));
        assert_eq!(client.in_flight(), 0);
    }
}
