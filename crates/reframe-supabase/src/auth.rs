//! Identity service client
//!
//! Wraps the `auth/v1` endpoints and keeps the shared [`SessionStore`] in
//! step with every successful exchange, so the workflow observes sign in,
//! sign out and token refresh through its auth subscription.

use crate::client::SupabaseClient;
use reframe_backend::{AuthError, SessionStore};
use reframe_model::{AuthSession, AuthUser};
use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use serde_json::json;
use url::Url;

/// Result of a sign-up
///
/// `session` is `None` when the project requires email confirmation first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpOutcome {
    pub user: AuthUser,
    pub session: Option<AuthSession>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(AuthSession),
    User(AuthUser),
}

/// Tokens carried back on an OAuth redirect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackTokens {
    pub access_token: String,
    /// Empty when the provider sent none
    pub refresh_token: String,
    pub expires_in: Option<u64>,
    pub expires_at: Option<i64>,
}

/// Email/password and OAuth flows against the identity service
#[derive(Debug, Clone)]
pub struct SupabaseAuth {
    client: SupabaseClient,
}

impl SupabaseAuth {
    #[must_use]
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    fn session(&self) -> &SessionStore {
        self.client.session()
    }

    fn anonymous(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request_with_token(method, path, &self.client.config().anon_key)
    }

    /// Register a new account
    ///
    /// Installs the session when the service returns one.
    ///
    /// # Errors
    /// `Rejected` for refused credentials, `Network`/`Decode` otherwise
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        let request = self
            .anonymous(Method::POST, "auth/v1/signup")
            .json(&json!({ "email": email, "password": password }));
        let response: SignUpResponse = self.client.send_json(request).await?;

        let outcome = match response {
            SignUpResponse::Session(session) => {
                self.session().set_session(session.clone());
                SignUpOutcome {
                    user: session.user.clone(),
                    session: Some(session),
                }
            }
            SignUpResponse::User(user) => {
                tracing::info!(user = %user.id, "sign-up awaiting email confirmation");
                SignUpOutcome { user, session: None }
            }
        };
        Ok(outcome)
    }

    /// Password sign-in
    ///
    /// # Errors
    /// `Rejected` for bad credentials, `Network`/`Decode` otherwise
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let request = self
            .anonymous(Method::POST, "auth/v1/token")
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));
        let session: AuthSession = self.client.send_json(request).await?;
        self.session().set_session(session.clone());
        Ok(session)
    }

    /// Exchange the stored refresh token for a new session
    ///
    /// # Errors
    /// `NoSession` without a refresh token, otherwise the service's refusal
    pub async fn refresh(&self) -> Result<AuthSession, AuthError> {
        let refresh_token = self.session().refresh_token().ok_or(AuthError::NoSession)?;
        let request = self
            .anonymous(Method::POST, "auth/v1/token")
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }));
        let session: AuthSession = self.client.send_json(request).await?;
        self.session().set_session(session.clone());
        Ok(session)
    }

    /// Refresh the session if it has expired at `now` (unix seconds)
    ///
    /// Returns the session in effect afterwards.
    ///
    /// # Errors
    /// Refresh failures; the stale session is left in place
    pub async fn ensure_fresh(&self, now: i64) -> Result<Option<AuthSession>, AuthError> {
        match self.session().session() {
            Some(session) if session.is_expired_at(now) => {
                tracing::debug!(user = %session.user.id, "access token expired, refreshing");
                self.refresh().await.map(Some)
            }
            current => Ok(current),
        }
    }

    /// End the session
    ///
    /// The local session is cleared even when the service call fails.
    ///
    /// # Errors
    /// The service's refusal or a transport failure, after clearing
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let Some(token) = self.session().access_token() else {
            return Ok(());
        };
        let result = self
            .client
            .send(self.client.request_with_token(Method::POST, "auth/v1/logout", &token))
            .await;
        self.session().clear();

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::warn!(error = %e, "remote sign-out failed, local session cleared");
                Err(e.into())
            }
        }
    }

    /// Send a password reset email
    ///
    /// # Errors
    /// The service's refusal or a transport failure
    pub async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        let request = self
            .anonymous(Method::POST, "auth/v1/recover")
            .json(&json!({ "email": email }));
        self.client.send(request).await?;
        tracing::info!("password reset requested");
        Ok(())
    }

    /// Change the signed-in user's password
    ///
    /// # Errors
    /// `NoSession` when signed out, otherwise the service's refusal
    pub async fn update_password(&self, password: &str) -> Result<AuthUser, AuthError> {
        if self.session().access_token().is_none() {
            return Err(AuthError::NoSession);
        }
        let request = self
            .client
            .request(Method::PUT, "auth/v1/user")
            .json(&json!({ "password": password }));
        let user: AuthUser = self.client.send_json(request).await?;
        self.session().update_user(user.clone());
        Ok(user)
    }

    /// User behind an access token
    ///
    /// # Errors
    /// `Rejected` for an invalid token
    pub async fn fetch_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        let request = self
            .client
            .request_with_token(Method::GET, "auth/v1/user", access_token);
        Ok(self.client.send_json(request).await?)
    }

    /// Browser URL that starts an OAuth sign-in with `provider`
    ///
    /// # Errors
    /// `Decode` if the project URL cannot host the authorize endpoint
    pub fn oauth_url(&self, provider: &str, redirect_to: &str) -> Result<Url, AuthError> {
        let mut url = Url::parse(&self.client.endpoint("auth/v1/authorize"))
            .map_err(|e| AuthError::Decode(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("provider", provider)
            .append_pair("redirect_to", redirect_to);
        Ok(url)
    }

    /// Finish an OAuth sign-in from the redirect URL the browser landed on
    ///
    /// # Errors
    /// `Cancelled` when the redirect carries no access token, otherwise
    /// failures looking up the token's user
    pub async fn complete_oauth(&self, callback_url: &str) -> Result<AuthSession, AuthError> {
        let tokens = parse_callback_tokens(callback_url).ok_or(AuthError::Cancelled)?;
        let user = self.fetch_user(&tokens.access_token).await?;

        let session = AuthSession {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in.unwrap_or_default(),
            expires_at: tokens.expires_at,
            token_type: "bearer".to_string(),
            user,
        };
        self.session().set_session(session.clone());
        Ok(session)
    }
}

/// Tokens from an OAuth redirect
///
/// Reads the fragment when there is one, the query string otherwise.
/// `None` when no access token is present.
#[must_use]
pub fn parse_callback_tokens(callback_url: &str) -> Option<CallbackTokens> {
    let params = callback_url
        .split_once('#')
        .or_else(|| callback_url.split_once('?'))
        .map(|(_, params)| params)?;

    let mut tokens = CallbackTokens {
        access_token: String::new(),
        refresh_token: String::new(),
        expires_in: None,
        expires_at: None,
    };
    for (key, value) in url::form_urlencoded::parse(params.as_bytes()) {
        match key.as_ref() {
            "access_token" => tokens.access_token = value.into_owned(),
            "refresh_token" => tokens.refresh_token = value.into_owned(),
            "expires_in" => tokens.expires_in = value.parse().ok(),
            "expires_at" => tokens.expires_at = value.parse().ok(),
            _ => {}
        }
    }

    (!tokens.access_token.is_empty()).then_some(tokens)
}
