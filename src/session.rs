//! Session
//!
//! Who is signed in, derived from the stored access token, plus the
//! login / registration / logout lifecycle.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Serialize;
use tracing::info;

use crate::api::ApiClient;
use crate::error::{require, require_len, ApiError, SessionError};
use crate::models::{Claims, TokenPair, User};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_MANAGER: &str = "manager";

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_USERNAME_LEN: usize = 3;

impl Claims {
    /// Decode the payload segment of a JWT. The signature is not checked;
    /// roles read here only decide what the UI shows.
    pub fn from_token(token: &str) -> Result<Self, ApiError> {
        let payload = token
            .split('.')
            .nth(1)
            .ok_or_else(|| ApiError::Decode("token has no payload segment".to_string()))?;
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Sees every deal on the board and may pick an owner filter
    pub fn is_elevated(&self) -> bool {
        self.has_role(ROLE_ADMIN) || self.has_role(ROLE_MANAGER)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn validate(&self) -> Result<(), SessionError> {
        require("Email", &self.email)?;
        require_len("Пароль", &self.password, MIN_PASSWORD_LEN)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl Registration {
    pub fn validate(&self) -> Result<(), SessionError> {
        require("Имя пользователя", &self.username)?;
        require_len("Имя пользователя", self.username.trim(), MIN_USERNAME_LEN)?;
        require("Email", &self.email)?;
        require_len("Пароль", &self.password, MIN_PASSWORD_LEN)?;
        require("Имя", &self.first_name)?;
        require("Фамилия", &self.last_name)?;
        Ok(())
    }
}

// ========================
// Lifecycle
// ========================

/// Identity from a token left by a previous visit
pub fn restore(api: &ApiClient) -> Option<Claims> {
    api.claims().ok()
}

pub async fn login(api: &ApiClient, credentials: &Credentials) -> Result<Claims, SessionError> {
    credentials.validate()?;

    let response = api.post_anonymous("/auth/login", credentials).await?;
    if !response.is_success() {
        return Err(response.status_error().into());
    }
    let tokens: TokenPair = response.json()?;
    let claims = Claims::from_token(&tokens.access_token)?;
    api.storage().store(&tokens);

    info!(user_id = claims.sub, "signed in");
    Ok(claims)
}

pub async fn register(api: &ApiClient, registration: &Registration) -> Result<User, SessionError> {
    registration.validate()?;

    let response = api.post_anonymous("/users", registration).await?;
    if !response.is_success() {
        return Err(response.status_error().into());
    }
    let user: User = response.json()?;

    info!(user_id = user.user_id, "registered");
    Ok(user)
}

pub fn logout(api: &ApiClient) {
    api.cancel_all();
    api.storage().clear();
    info!("signed out");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{HttpRequest, HttpResponse, MemoryStorage, Transport};
    use crate::error::FormError;
    use async_trait::async_trait;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn token_for(payload: &str) -> String {
        format!("eyJhbGciOiJIUzI1NiJ9.{}.signature", URL_SAFE_NO_PAD.encode(payload))
    }

    /// Replays one canned response and records the request
    struct Canned {
        response: HttpResponse,
        requests: Rc<RefCell<Vec<HttpRequest>>>,
    }

    #[async_trait(?Send)]
    impl Transport for Canned {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
            self.requests.borrow_mut().push(request);
            Ok(self.response.clone())
        }
    }

    fn client(response: HttpResponse) -> (ApiClient, Rc<RefCell<Vec<HttpRequest>>>) {
        let requests = Rc::new(RefCell::new(Vec::new()));
        let transport = Canned { response, requests: Rc::clone(&requests) };
        (ApiClient::new(transport, MemoryStorage::default()), requests)
    }

    #[test]
    fn test_claims_from_token() {
        let token = token_for(r#"{"sub":7,"roles":["manager"],"username":"olga","exp":1900000000}"#);
        let claims = Claims::from_token(&token).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.username.as_deref(), Some("olga"));
        assert!(claims.is_elevated());
        assert!(!claims.is_admin());

        assert!(matches!(Claims::from_token("not-a-jwt"), Err(ApiError::Decode(_))));
        assert!(matches!(Claims::from_token("a.%%%.c"), Err(ApiError::Decode(_))));
    }

    #[test]
    fn test_plain_user_is_not_elevated() {
        let claims = Claims::from_token(&token_for(r#"{"sub":"3","roles":["user"]}"#)).unwrap();
        assert!(!claims.is_elevated());
        assert!(claims.has_role("user"));
    }

    #[test]
    fn test_credentials_validation() {
        let mut credentials = Credentials { email: " ".to_string(), password: "secret1".to_string() };
        assert_eq!(credentials.validate(), Err(SessionError::Form(FormError::Required("Email"))));

        credentials.email = "a@b.ru".to_string();
        credentials.password = "12345".to_string();
        assert_eq!(
            credentials.validate(),
            Err(SessionError::Form(FormError::TooShort { field: "Пароль", min: 6 }))
        );
    }

    #[test]
    fn test_registration_validation() {
        let registration = Registration {
            username: "ab".to_string(),
            email: "a@b.ru".to_string(),
            password: "secret1".to_string(),
            first_name: "Анна".to_string(),
            last_name: "Иванова".to_string(),
        };
        assert_eq!(
            registration.validate(),
            Err(SessionError::Form(FormError::TooShort { field: "Имя пользователя", min: 3 }))
        );
        let registration = Registration { username: "anna".to_string(), ..registration };
        assert!(registration.validate().is_ok());
    }

    #[tokio::test]
    async fn test_login_stores_tokens() {
        let access = token_for(r#"{"sub":5,"roles":["admin"]}"#);
        let body = format!(r#"{{"access_token":"{access}","refresh_token":"r1"}}"#);
        let (api, requests) = client(HttpResponse::new(201, body));

        let credentials = Credentials { email: "boss@crm.ru".to_string(), password: "secret1".to_string() };
        let claims = login(&api, &credentials).await.unwrap();

        assert_eq!(claims.sub, 5);
        assert_eq!(api.storage().access_token(), Some(access));
        assert_eq!(api.storage().refresh_token().as_deref(), Some("r1"));
        let sent = &requests.borrow()[0];
        assert_eq!(sent.path, "/auth/login");
        assert_eq!(sent.bearer, None);
        assert_eq!(restore(&api).map(|c| c.sub), Some(5));
    }

    #[tokio::test]
    async fn test_login_surfaces_backend_message() {
        let (api, _) = client(HttpResponse::new(401, r#"{"message":"Неверный пароль"}"#));
        let credentials = Credentials { email: "boss@crm.ru".to_string(), password: "secret1".to_string() };

        let err = login(&api, &credentials).await.unwrap_err();

        assert_eq!(err.user_message(), "Неверный пароль");
        assert_eq!(api.storage().access_token(), None);
    }

    #[tokio::test]
    async fn test_invalid_form_sends_nothing() {
        let (api, requests) = client(HttpResponse::new(200, "{}"));
        let credentials = Credentials { email: String::new(), password: String::new() };

        assert!(login(&api, &credentials).await.is_err());
        assert!(requests.borrow().is_empty());
    }

    #[test]
    fn test_logout_clears_tokens() {
        let api = ApiClient::new(
            Canned { response: HttpResponse::new(200, "{}"), requests: Rc::default() },
            MemoryStorage::with_tokens(&token_for(r#"{"sub":1}"#), "r"),
        );
        assert!(restore(&api).is_some());

        logout(&api);

        assert!(restore(&api).is_none());
        assert_eq!(api.storage().refresh_token(), None);
    }
}
