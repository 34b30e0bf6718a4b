use chrono::Utc;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::auth::password::{hash_password, verify_password};
use crate::auth::reset::{hash_token, ResetToken};
use crate::auth::TokenService;
use crate::database::models::user::check_password;
use crate::database::models::{User, UserDetails, UserInput};
use crate::database::store::{Collection, Document, DocumentStore, StoreError};
use crate::error::ApiError;
use crate::filter::Condition;
use crate::services::mailer::{EmailMessage, Mailer};
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Account flows: registration, login, password reset and self-service
/// updates. Every successful credential check yields a fresh session token.
pub struct AuthService<'a> {
    store: &'a dyn DocumentStore,
    tokens: &'a TokenService,
    mailer: &'a dyn Mailer,
    reset_ttl_minutes: i64,
    public_base_url: &'a str,
    decoy_hash: &'a str,
}

impl<'a> AuthService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self {
            store: state.store.as_ref(),
            tokens: &state.tokens,
            mailer: state.mailer.as_ref(),
            reset_ttl_minutes: state.config.security.reset_token_expire_minutes,
            public_base_url: &state.config.server.public_base_url,
            decoy_hash: &state.decoy_hash,
        }
    }

    pub async fn register(&self, input: UserInput) -> Result<(User, String), ApiError> {
        let role = input.validate(false)?;
        let password_hash = hash_password(input.password.as_deref().unwrap_or_default())?;
        let doc = input.into_document(role, password_hash);

        let user = User::from_document(self.store.insert(Collection::Users, doc).await?)?;
        info!("Registered user {} ({})", user.id, user.role);
        let token = self.tokens.issue(&user.id)?;
        Ok((user, token))
    }

    /// Unknown email and wrong password fail identically, including a full
    /// password verification on both paths
    pub async fn login(&self, email: Option<&str>, password: Option<&str>) -> Result<(User, String), ApiError> {
        let (Some(email), Some(password)) = (email.filter(|e| !e.is_empty()), password.filter(|p| !p.is_empty()))
        else {
            return Err(ApiError::bad_request("Please provide an email and password"));
        };

        let Some(user) = self.find_by_email(email).await? else {
            verify_password(password, self.decoy_hash)?;
            warn!("login failed");
            return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
        };
        if !verify_password(password, &user.password)? {
            warn!("login failed");
            return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
        }

        let token = self.tokens.issue(&user.id)?;
        Ok((user, token))
    }

    /// Resolve the user a session token belongs to
    pub async fn user_for_token(&self, token: &str) -> Result<User, ApiError> {
        let claims = self.tokens.verify(token)?;
        match self.store.find_by_id(Collection::Users, &claims.sub).await {
            Ok(Some(doc)) => Ok(User::from_document(doc)?),
            Ok(None) | Err(StoreError::InvalidId(_)) => Err(ApiError::not_authorized()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn forgot_password(&self, email: Option<&str>) -> Result<(), ApiError> {
        let email = email.unwrap_or_default();
        let Some(user) = self.find_by_email(email).await? else {
            return Err(ApiError::not_found("There is no user with that email"));
        };

        let reset = ResetToken::generate(self.reset_ttl_minutes);
        let mut changes = Document::new();
        changes.insert("reset_password_token".into(), Value::String(reset.hashed.clone()));
        changes.insert("reset_password_expire".into(), Value::String(reset.expires_at.to_rfc3339()));
        self.store.update(Collection::Users, &user.id, changes).await?;

        let reset_url = format!("{}/api/v1/auth/resetpassword/{}", self.public_base_url, reset.raw);
        let message = EmailMessage {
            to: user.email.clone(),
            subject: "Password reset token".to_string(),
            text: format!(
                "You are receiving this email because you (or someone else) has requested the reset of a password. \
                 Please make a PUT request to: \n\n {}",
                reset_url
            ),
        };

        if let Err(e) = self.mailer.send(&message).await {
            error!("Failed to send reset email to user {}: {}", user.id, e);
            self.store.update(Collection::Users, &user.id, cleared_reset_fields()).await?;
            return Err(ApiError::internal_server_error("Email could not be sent"));
        }
        Ok(())
    }

    pub async fn reset_password(&self, raw_token: &str, password: Option<&str>) -> Result<(User, String), ApiError> {
        let mut errors = Vec::new();
        check_password(password, &mut errors);
        if !errors.is_empty() {
            return Err(ApiError::validation_error(errors));
        }

        let filter = [Condition::eq("reset_password_token", hash_token(raw_token))];
        let user = match self.store.find_one(Collection::Users, &filter).await? {
            Some(doc) => User::from_document(doc)?,
            None => return Err(ApiError::bad_request("Invalid token")),
        };
        let unexpired = user.reset_password_expire.is_some_and(|expires| expires > Utc::now());
        if !unexpired {
            return Err(ApiError::bad_request("Invalid token"));
        }

        // only the request that still finds the token stored may consume it
        let mut changes = cleared_reset_fields();
        changes.insert("password".into(), Value::String(hash_password(password.unwrap_or_default())?));
        let user = match self.store.update_matching(Collection::Users, &user.id, &filter, changes).await? {
            Some(doc) => User::from_document(doc)?,
            None => return Err(ApiError::bad_request("Invalid token")),
        };
        info!("Password reset for user {}", user.id);

        let token = self.tokens.issue(&user.id)?;
        Ok((user, token))
    }

    pub async fn update_password(&self, user: &User, current: Option<&str>, new: Option<&str>) -> Result<String, ApiError> {
        if !verify_password(current.unwrap_or_default(), &user.password)? {
            return Err(ApiError::unauthorized("Password is incorrect"));
        }
        let mut errors = Vec::new();
        check_password(new, &mut errors);
        if !errors.is_empty() {
            return Err(ApiError::validation_error(errors));
        }

        let mut changes = Document::new();
        changes.insert("password".into(), Value::String(hash_password(new.unwrap_or_default())?));
        self.save(&user.id, changes).await?;
        Ok(self.tokens.issue(&user.id)?)
    }

    pub async fn update_details(&self, user: &User, details: UserDetails) -> Result<User, ApiError> {
        details.validate()?;
        self.save(&user.id, details.into_document()?).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let filter = [Condition::eq("email", email.trim())];
        match self.store.find_one(Collection::Users, &filter).await? {
            Some(doc) => Ok(Some(User::from_document(doc)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, id: &str, changes: Document) -> Result<User, ApiError> {
        match self.store.update(Collection::Users, id, changes).await? {
            Some(doc) => Ok(User::from_document(doc)?),
            None => Err(ApiError::resource_not_found("User", id)),
        }
    }
}

fn cleared_reset_fields() -> Document {
    let mut changes = Document::new();
    changes.insert("reset_password_token".into(), Value::Null);
    changes.insert("reset_password_expire".into(), Value::Null);
    changes
}
