//! HTTP Basic authentication against a configured allow-list

use crate::config::AuthorizedUser;
use crate::server::{ApiError, AppState};
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};

type Digest32 = [u8; 32];

/// Allow-listed credentials, stored as SHA-256 digests
///
/// Comparing fixed-size digests with a branch-free fold keeps the
/// comparison time independent of where the inputs differ, and of their
/// lengths.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    entries: Vec<(Digest32, Digest32)>,
}

impl Credentials {
    pub fn new(users: &[AuthorizedUser]) -> Self {
        Self {
            entries: users
                .iter()
                .map(|u| (digest(&u.login), digest(&u.password)))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checks a login/password pair against every entry
    ///
    /// All entries are compared even after a match.
    pub fn verify(&self, login: &str, password: &str) -> bool {
        let login = digest(login);
        let password = digest(password);

        self.entries.iter().fold(false, |matched, (l, p)| {
            let hit = constant_time_eq(&login, l) & constant_time_eq(&password, p);
            matched | hit
        })
    }
}

fn digest(value: &str) -> Digest32 {
    Sha256::digest(value.as_bytes()).into()
}

fn constant_time_eq(a: &Digest32, b: &Digest32) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Decodes an `Authorization: Basic <base64(login:password)>` value
pub fn parse_basic_auth(header: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (login, password) = decoded.split_once(':')?;
    Some((login.to_string(), password.to_string()))
}

/// Login of the authenticated caller
///
/// Used as a handler argument, it rejects the request with `401` and
/// `WWW-Authenticate: Basic` unless valid credentials are supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let (login, password) = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_basic_auth)
            .ok_or(ApiError::Unauthorized)?;

        if state.credentials.verify(&login, &password) {
            Ok(Self(login))
        } else {
            tracing::warn!(login = %login, "Rejected credentials");
            Err(ApiError::Unauthorized)
        }
    }
}
