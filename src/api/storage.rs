//! Token Storage
//!
//! Where the access/refresh pair lives between page loads.

use std::cell::RefCell;

use tracing::warn;

use crate::models::TokenPair;

pub const ACCESS_TOKEN_KEY: &str = "token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

pub trait TokenStorage {
    fn access_token(&self) -> Option<String>;
    fn refresh_token(&self) -> Option<String>;
    fn store(&self, tokens: &TokenPair);
    fn clear(&self);
}

/// `window.localStorage`
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserStorage;

impl BrowserStorage {
    fn local() -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok().flatten()
    }

    fn read(key: &str) -> Option<String> {
        Self::local()?.get_item(key).ok().flatten()
    }

    fn write(key: &str, value: &str) {
        let written = Self::local().map(|storage| storage.set_item(key, value).is_ok());
        if written != Some(true) {
            warn!(key, "could not write to localStorage");
        }
    }

    fn remove(key: &str) {
        if let Some(storage) = Self::local() {
            let _ = storage.remove_item(key);
        }
    }
}

impl TokenStorage for BrowserStorage {
    fn access_token(&self) -> Option<String> {
        Self::read(ACCESS_TOKEN_KEY)
    }

    fn refresh_token(&self) -> Option<String> {
        Self::read(REFRESH_TOKEN_KEY)
    }

    fn store(&self, tokens: &TokenPair) {
        Self::write(ACCESS_TOKEN_KEY, &tokens.access_token);
        Self::write(REFRESH_TOKEN_KEY, &tokens.refresh_token);
    }

    fn clear(&self) {
        Self::remove(ACCESS_TOKEN_KEY);
        Self::remove(REFRESH_TOKEN_KEY);
    }
}

/// In-memory storage for tests
#[derive(Debug, Default)]
pub struct MemoryStorage {
    access: RefCell<Option<String>>,
    refresh: RefCell<Option<String>>,
}

impl MemoryStorage {
    pub fn with_tokens(access: &str, refresh: &str) -> Self {
        Self {
            access: RefCell::new(Some(access.to_string())),
            refresh: RefCell::new(Some(refresh.to_string())),
        }
    }
}

impl TokenStorage for MemoryStorage {
    fn access_token(&self) -> Option<String> {
        self.access.borrow().clone()
    }

    fn refresh_token(&self) -> Option<String> {
        self.refresh.borrow().clone()
    }

    fn store(&self, tokens: &TokenPair) {
        *self.access.borrow_mut() = Some(tokens.access_token.clone());
        *self.refresh.borrow_mut() = Some(tokens.refresh_token.clone());
    }

    fn clear(&self) {
        self.access.borrow_mut().take();
        self.refresh.borrow_mut().take();
    }
}
