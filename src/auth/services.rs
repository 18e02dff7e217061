use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::{
    dto::{LoginRequest, LoginResponse, RegisterRequest},
    password::{hash_password_blocking, verify_dummy_blocking, verify_password_blocking},
    repo_types::NewUser,
};
use crate::{
    error::{AppError, StoreError},
    state::AppState,
};

pub(crate) const USER_EXISTS: &str = "user already exists";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Anonymous -> Registered. No token is issued here.
pub async fn register(state: &AppState, req: RegisterRequest) -> Result<(), AppError> {
    let name = req.name.trim().to_string();
    let email = req.email.trim().to_string();

    if name.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "name, email and password are required".into(),
        ));
    }
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::Validation("invalid email".into()));
    }

    if state.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::Duplicate(USER_EXISTS.into()));
    }

    let is_admin = match req.is_admin {
        Some(true) if state.config.allow_admin_self_registration => true,
        Some(true) => {
            warn!(email = %email, "ignoring self-assigned admin flag");
            false
        }
        _ => false,
    };

    let password_hash = hash_password_blocking(req.password).await?;

    let user = match state
        .users
        .create(NewUser {
            name,
            email,
            password_hash,
            is_admin,
        })
        .await
    {
        Ok(u) => u,
        // lost a race with a concurrent registration for the same email
        Err(StoreError::Duplicate) => return Err(AppError::Duplicate(USER_EXISTS.into())),
        Err(e) => return Err(e.into()),
    };

    info!(user_id = %user.id, email = %user.email, is_admin = user.is_admin, "user registered");
    Ok(())
}

/// Registered -> Authenticated. Unknown email and wrong password fail identically.
pub async fn login(state: &AppState, req: LoginRequest) -> Result<LoginResponse, AppError> {
    let email = req.email.trim();
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation("email and password are required".into()));
    }

    let user = match state.users.find_by_email(email).await? {
        Some(u) => u,
        None => {
            verify_dummy_blocking(req.password).await?;
            warn!(email = %email, "login unknown email");
            return Err(AppError::InvalidCredentials);
        }
    };

    if !verify_password_blocking(req.password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let token = state.jwt.issue(user.id, user.is_admin)?;
    info!(user_id = %user.id, is_admin = user.is_admin, "user logged in");
    Ok(LoginResponse {
        token,
        user: user.into(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::auth::{repo::UserStore, repo_types::User};
    use crate::config::AppConfig;
    use crate::contact::repo::MemoryContactStore;
    use crate::products::repo::MemoryProductStore;
    use crate::storage::MemoryStorage;

    /// Sees no existing user, then loses the insert to the unique constraint.
    struct RacingUserStore;

    #[async_trait]
    impl UserStore for RacingUserStore {
        async fn find_by_email(&self, _email: &str) -> Result<Option<User>, StoreError> {
            Ok(None)
        }
        async fn create(&self, _user: NewUser) -> Result<User, StoreError> {
            Err(StoreError::Duplicate)
        }
        async fn set_admin(&self, _email: &str, _is_admin: bool) -> Result<User, StoreError> {
            Err(StoreError::NotFound)
        }
    }

    fn register_req(email: &str, is_admin: Option<bool>) -> RegisterRequest {
        RegisterRequest {
            name: "Ana".into(),
            email: email.into(),
            password: "secret".into(),
            is_admin,
        }
    }

    fn login_req(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("a@x.com"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("a x@y.com"));
        assert!(!is_valid_email(""));
    }

    #[tokio::test]
    async fn register_then_login_round_trip() {
        let state = AppState::in_memory(AppConfig::new("test-secret"));
        register(&state, register_req("a@x.com", None)).await.unwrap();

        let res = login(&state, login_req("a@x.com", "secret")).await.unwrap();
        assert_eq!(res.user.email, "a@x.com");
        assert!(!res.user.is_admin);
        let ctx = state.jwt.verify(&res.token).unwrap();
        assert_eq!(ctx.user_id, res.user.id);
        assert!(!ctx.is_admin);
    }

    #[tokio::test]
    async fn duplicate_registration_keeps_first_user() {
        let state = AppState::in_memory(AppConfig::new("test-secret"));
        register(&state, register_req("a@x.com", None)).await.unwrap();

        let mut second = register_req("a@x.com", None);
        second.password = "other-password".into();
        let err = register(&state, second).await.unwrap_err();
        assert!(matches!(err, AppError::Duplicate(_)));

        // original credentials still work, the second password does not
        assert!(login(&state, login_req("a@x.com", "secret")).await.is_ok());
        assert!(login(&state, login_req("a@x.com", "other-password")).await.is_err());
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let state = AppState::in_memory(AppConfig::new("test-secret"));
        register(&state, register_req("a@x.com", None)).await.unwrap();

        let wrong_pw = login(&state, login_req("a@x.com", "nope")).await.unwrap_err();
        let no_user = login(&state, login_req("b@x.com", "secret")).await.unwrap_err();
        assert_eq!(wrong_pw.to_string(), no_user.to_string());
        assert_eq!(wrong_pw.status(), no_user.status());
    }

    #[tokio::test]
    async fn self_assigned_admin_is_ignored_by_default() {
        let state = AppState::in_memory(AppConfig::new("test-secret"));
        register(&state, register_req("a@x.com", Some(true))).await.unwrap();
        let res = login(&state, login_req("a@x.com", "secret")).await.unwrap();
        assert!(!state.jwt.verify(&res.token).unwrap().is_admin);
    }

    #[tokio::test]
    async fn self_assigned_admin_honoured_when_enabled() {
        let mut cfg = AppConfig::new("test-secret");
        cfg.allow_admin_self_registration = true;
        let state = AppState::in_memory(cfg);
        register(&state, register_req("root@x.com", Some(true))).await.unwrap();
        register(&state, register_req("ana@x.com", Some(false))).await.unwrap();

        let admin = login(&state, login_req("root@x.com", "secret")).await.unwrap();
        assert!(state.jwt.verify(&admin.token).unwrap().is_admin);
        let plain = login(&state, login_req("ana@x.com", "secret")).await.unwrap();
        assert!(!state.jwt.verify(&plain.token).unwrap().is_admin);
    }

    #[tokio::test]
    async fn admin_claim_is_a_snapshot() {
        let state = AppState::in_memory(AppConfig::new("test-secret"));
        register(&state, register_req("a@x.com", None)).await.unwrap();
        let before = login(&state, login_req("a@x.com", "secret")).await.unwrap();

        state.users.set_admin("a@x.com", true).await.unwrap();
        assert!(!state.jwt.verify(&before.token).unwrap().is_admin);

        let after = login(&state, login_req("a@x.com", "secret")).await.unwrap();
        assert!(state.jwt.verify(&after.token).unwrap().is_admin);
    }

    #[tokio::test]
    async fn register_validates_fields() {
        let state = AppState::in_memory(AppConfig::new("test-secret"));
        let mut req = register_req("a@x.com", None);
        req.password.clear();
        assert!(matches!(register(&state, req).await, Err(AppError::Validation(_))));
        assert!(matches!(
            register(&state, register_req("not-an-email", None)).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn unique_violation_on_insert_reports_user_exists() {
        let state = AppState::from_parts(
            AppConfig::new("test-secret"),
            Arc::new(RacingUserStore),
            Arc::new(MemoryProductStore::default()),
            Arc::new(MemoryContactStore::default()),
            Arc::new(MemoryStorage::default()),
        );
        let err = register(&state, register_req("a@x.com", None)).await.unwrap_err();
        assert!(matches!(&err, AppError::Duplicate(m) if m == USER_EXISTS));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_registrations_admit_exactly_one() {
        let state = AppState::in_memory(AppConfig::new("test-secret"));
        let (a, b) = tokio::join!(
            register(&state, register_req("race@x.com", None)),
            register(&state, register_req("race@x.com", None)),
        );
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        let err = a.err().or(b.err()).unwrap();
        assert!(matches!(&err, AppError::Duplicate(m) if m == USER_EXISTS));
    }
}
