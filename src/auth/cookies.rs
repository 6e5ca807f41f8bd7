use chrono::Duration;
use tower_cookies::cookie::SameSite;
use tower_cookies::cookie::time;
use tower_cookies::{Cookie, Cookies};

use super::services::TokenPair;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// How the token pair travels back to the browser.
#[derive(Debug, Clone, Copy)]
pub struct CookiePolicy {
    secure: bool,
    access_max_age: Duration,
    refresh_max_age: Duration,
}

impl CookiePolicy {
    pub fn new(secure: bool, access_max_age: Duration, refresh_max_age: Duration) -> Self {
        Self {
            secure,
            access_max_age,
            refresh_max_age,
        }
    }

    pub fn set_tokens(&self, cookies: &Cookies, tokens: &TokenPair) {
        cookies.add(self.build(
            ACCESS_TOKEN_COOKIE,
            tokens.access_token.clone(),
            self.access_max_age,
        ));
        cookies.add(self.build(
            REFRESH_TOKEN_COOKIE,
            tokens.refresh_token.to_string(),
            self.refresh_max_age,
        ));
    }

    /// Expires both cookies on the client, whether or not the request sent them.
    pub fn clear_tokens(&self, cookies: &Cookies) {
        cookies.add(self.build(ACCESS_TOKEN_COOKIE, String::new(), Duration::zero()));
        cookies.add(self.build(REFRESH_TOKEN_COOKIE, String::new(), Duration::zero()));
    }

    fn build(&self, name: &'static str, value: String, max_age: Duration) -> Cookie<'static> {
        Cookie::build((name, value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(max_age.num_seconds()))
            .build()
    }
}

pub fn refresh_token_from(cookies: &Cookies) -> Option<String> {
    cookies
        .get(REFRESH_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

pub fn access_token_from(cookies: &Cookies) -> Option<String> {
    cookies
        .get(ACCESS_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}
