//! Persistence of session artifacts after a successful login.

use std::sync::Arc;

use crate::{
    Error,
    clock::{Clock, SystemClock},
    error::StorageError,
    repositories::{StateStore, keys},
    storage::{AuthSession, UserProfile},
    token::is_token_unexpired,
};

/// Service for storing and restoring the authenticated session.
///
/// Session artifacts share the state store with the lockout counter but are
/// managed independently of it.
pub struct SessionService<S: StateStore> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: StateStore> SessionService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Persist a freshly obtained session.
    ///
    /// # Arguments
    ///
    /// * `session` - The session returned by the Authentication API
    /// * `remember_username` - `Some(username)` when "remember me" was ticked.
    ///   The username from the profile is preferred when the server sent one.
    pub async fn save(
        &self,
        session: &AuthSession,
        remember_username: Option<&str>,
    ) -> Result<(), Error> {
        let user_json = serde_json::to_string(&session.user)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        self.store
            .set(keys::ACCESS_TOKEN, &session.access_token)
            .await?;
        match &session.refresh_token {
            Some(refresh) => self.store.set(keys::REFRESH_TOKEN, refresh).await?,
            None => self.store.remove(keys::REFRESH_TOKEN).await?,
        }
        self.store.set(keys::USER, &user_json).await?;
        self.store
            .set(keys::LOGIN_TIME, &self.clock.now().to_rfc3339())
            .await?;

        match remember_username {
            Some(typed) => {
                let username = session.user.username.as_deref().unwrap_or(typed);
                self.store.set(keys::REMEMBER_ME, "true").await?;
                self.store.set(keys::SAVED_USERNAME, username).await?;
            }
            None => {
                self.store.remove(keys::REMEMBER_ME).await?;
                self.store.remove(keys::SAVED_USERNAME).await?;
            }
        }

        tracing::debug!(remember_me = remember_username.is_some(), "Session saved");
        Ok(())
    }

    /// Remove the token, profile and login time. The remembered username is kept.
    pub async fn clear(&self) -> Result<(), Error> {
        for key in keys::SESSION_ARTIFACTS {
            self.store.remove(key).await?;
        }
        Ok(())
    }

    /// The username to prefill, if "remember me" was ticked at the last login.
    pub async fn remembered_username(&self) -> Result<Option<String>, Error> {
        if self.store.get(keys::REMEMBER_ME).await?.as_deref() != Some("true") {
            return Ok(None);
        }
        self.store.get(keys::SAVED_USERNAME).await
    }

    /// The stored session, without checking the token.
    ///
    /// Returns `None` when the token or profile is missing or the profile
    /// cannot be read.
    pub async fn current(&self) -> Result<Option<AuthSession>, Error> {
        let Some(access_token) = self.store.get(keys::ACCESS_TOKEN).await? else {
            return Ok(None);
        };
        let Some(user_json) = self.store.get(keys::USER).await? else {
            return Ok(None);
        };

        let user: UserProfile = match serde_json::from_str(&user_json) {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, "Stored user profile is unreadable");
                return Ok(None);
            }
        };

        Ok(Some(AuthSession {
            access_token,
            refresh_token: self.store.get(keys::REFRESH_TOKEN).await?,
            user,
        }))
    }

    /// The stored session if its token has not expired.
    ///
    /// Anything else (no session, unreadable profile, expired or
    /// undecodable token) clears the artifacts and returns `None`.
    pub async fn existing_login(&self) -> Result<Option<AuthSession>, Error> {
        if let Some(session) = self.current().await? {
            if is_token_unexpired(&session.access_token, self.clock.now()) {
                return Ok(Some(session));
            }
            tracing::info!("Stored session token expired");
        }

        self.clear().await?;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::ManualClock, storage::MemoryStateStore};
    use chrono::{DateTime, Duration, Utc};
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde::Serialize;

    #[derive(Serialize)]
    struct Claims {
        sub: String,
        exp: i64,
    }

    fn token_expiring_at(exp: DateTime<Utc>) -> String {
        encode(
            &Header::default(),
            &Claims {
                sub: "sv01".to_string(),
                exp: exp.timestamp(),
            },
            &EncodingKey::from_secret(b"server-secret"),
        )
        .unwrap()
    }

    fn setup() -> (
        SessionService<MemoryStateStore>,
        Arc<MemoryStateStore>,
        Arc<ManualClock>,
    ) {
        let store = Arc::new(MemoryStateStore::new());
        let clock = Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_750_000_000, 0).unwrap(),
        ));
        let service = SessionService::new(store.clone()).with_clock(clock.clone());
        (service, store, clock)
    }

    fn session(token: String) -> AuthSession {
        AuthSession {
            access_token: token,
            refresh_token: Some("refresh-1".to_string()),
            user: UserProfile::new("sv01", "SINHVIEN"),
        }
    }

    #[tokio::test]
    async fn test_save_and_restore() {
        let (service, store, clock) = setup();
        let token = token_expiring_at(clock.now() + Duration::hours(1));

        service.save(&session(token.clone()), None).await.unwrap();

        assert_eq!(store.get(keys::ACCESS_TOKEN).await.unwrap(), Some(token.clone()));
        assert_eq!(
            store.get(keys::LOGIN_TIME).await.unwrap(),
            Some(clock.now().to_rfc3339())
        );
        let restored = service.current().await.unwrap().unwrap();
        assert_eq!(restored, session(token));
    }

    #[tokio::test]
    async fn test_remember_me_prefers_profile_username() {
        let (service, _store, _clock) = setup();

        service
            .save(&session("t".to_string()), Some("SV01 "))
            .await
            .unwrap();
        assert_eq!(
            service.remembered_username().await.unwrap().as_deref(),
            Some("sv01")
        );

        service.save(&session("t".to_string()), None).await.unwrap();
        assert_eq!(service.remembered_username().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_remember_me_falls_back_to_typed_username() {
        let (service, _store, _clock) = setup();
        let mut s = session("t".to_string());
        s.user.username = None;

        service.save(&s, Some("sv01")).await.unwrap();
        assert_eq!(
            service.remembered_username().await.unwrap().as_deref(),
            Some("sv01")
        );
    }

    #[tokio::test]
    async fn test_clear_keeps_remembered_username() {
        let (service, store, _clock) = setup();
        service
            .save(&session("t".to_string()), Some("sv01"))
            .await
            .unwrap();

        service.clear().await.unwrap();
        for key in keys::SESSION_ARTIFACTS {
            assert!(!store.contains_key(key));
        }
        assert_eq!(
            service.remembered_username().await.unwrap().as_deref(),
            Some("sv01")
        );
    }

    #[tokio::test]
    async fn test_existing_login_with_live_token() {
        let (service, _store, clock) = setup();
        let token = token_expiring_at(clock.now() + Duration::minutes(30));
        service.save(&session(token), None).await.unwrap();

        let existing = service.existing_login().await.unwrap();
        assert!(existing.is_some());
    }

    #[tokio::test]
    async fn test_existing_login_with_expired_token_clears() {
        let (service, store, clock) = setup();
        let token = token_expiring_at(clock.now() + Duration::minutes(30));
        service.save(&session(token), Some("sv01")).await.unwrap();

        clock.advance(Duration::minutes(31));
        assert_eq!(service.existing_login().await.unwrap(), None);
        assert!(!store.contains_key(keys::ACCESS_TOKEN));
        assert!(store.contains_key(keys::SAVED_USERNAME));
    }

    #[tokio::test]
    async fn test_unreadable_profile_is_no_session() {
        let (service, store, _clock) = setup();
        store.set(keys::ACCESS_TOKEN, "a.b.c").await.unwrap();
        store.set(keys::USER, "{not json").await.unwrap();

        assert_eq!(service.current().await.unwrap(), None);
        assert_eq!(service.existing_login().await.unwrap(), None);
        assert!(!store.contains_key(keys::USER));
    }
}
