//! User accounts: registration, password login and the account lookups behind bearer tokens.
//!
//! Passwords are stored as argon2 PHC strings. Users are never deleted through the API; the
//! admin CLI can disable an account, after which login is refused and outstanding tokens stop
//! working.

use crate::constants::{MIN_PASSWORD_LEN, USER_NAME_MAX_LEN};
use crate::db::unique_violation;
use crate::validation::{
    blank_text, email, FieldErrors, Operation, Resolver, BLANK, NON_FIELD_ERRORS, REQUIRED,
};
use crate::{ClinicError, ClinicResult};
use api_shared::{LoginReq, RegisterReq, UserRes};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, is_active, date_joined";

pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const ACCOUNT_DISABLED: &str = "User account is disabled";
pub const MISSING_CREDENTIALS: &str = "Must include username and password";

#[derive(Clone, Debug, PartialEq, Eq, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl User {
    pub fn to_res(&self) -> UserRes {
        UserRes {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            date_joined: self.date_joined,
        }
    }
}

#[derive(FromRow)]
struct StoredCredentials {
    #[sqlx(flatten)]
    user: User,
    password_hash: String,
}

/// Validated registration, ready to insert.
struct NewUser {
    username: String,
    email: String,
    password: String,
    first_name: String,
    last_name: String,
}

#[derive(Clone, Debug)]
pub struct UserService {
    pool: SqlitePool,
}

impl UserService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// - [`ClinicError::Validation`] for missing or malformed fields, a taken username or email,
    ///   a short password, or a password confirmation that does not match.
    pub async fn register(&self, req: RegisterReq) -> ClinicResult<User> {
        let new_user = self.validate_registration(req).await?;
        let password_hash = hash_password(&new_user.password)?;
        let now = Utc::now();

        let inserted = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, password_hash, first_name, last_name, is_active, date_joined)
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&password_hash)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(now)
        .fetch_one(&self.pool)
        .await;

        let user = match inserted {
            Ok(user) => user,
            Err(err) => return Err(registration_conflict(err)),
        };

        tracing::info!(user_id = user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Check a username and password.
    ///
    /// Every failure is a [`ClinicError::Validation`] with a single non-field message.
    pub async fn authenticate(&self, req: LoginReq) -> ClinicResult<User> {
        let username = req.username.unwrap_or_default();
        let password = req.password.unwrap_or_default();
        if username.is_empty() || password.is_empty() {
            return Err(FieldErrors::non_field(MISSING_CREDENTIALS).into());
        }

        let stored = sqlx::query_as::<_, StoredCredentials>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE username = ?1"
        ))
        .bind(&username)
        .fetch_optional(&self.pool)
        .await?;

        let Some(stored) = stored else {
            tracing::warn!(%username, "login for unknown user");
            return Err(FieldErrors::non_field(INVALID_CREDENTIALS).into());
        };

        if !verify_password(&password, &stored.password_hash)? {
            tracing::warn!(%username, "login with wrong password");
            return Err(FieldErrors::non_field(INVALID_CREDENTIALS).into());
        }
        if !stored.user.is_active {
            tracing::warn!(%username, "login to disabled account");
            return Err(FieldErrors::non_field(ACCOUNT_DISABLED).into());
        }

        Ok(stored.user)
    }

    /// Resolve the user behind a verified token.
    ///
    /// # Errors
    ///
    /// - [`ClinicError::UnknownUser`] if the account no longer exists.
    /// - [`ClinicError::AccountDisabled`] if the account has been disabled.
    pub async fn find_active(&self, id: i64) -> ClinicResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ClinicError::UnknownUser)?;

        if !user.is_active {
            return Err(ClinicError::AccountDisabled);
        }
        Ok(user)
    }

    pub async fn list(&self) -> ClinicResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// Enable or disable an account by username.
    pub async fn set_active(&self, username: &str, active: bool) -> ClinicResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET is_active = ?1 WHERE username = ?2 RETURNING {USER_COLUMNS}"
        ))
        .bind(active)
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ClinicError::NotFound("user"))?;

        tracing::info!(user_id = user.id, active, "user activation changed");
        Ok(user)
    }

    async fn validate_registration(&self, req: RegisterReq) -> ClinicResult<NewUser> {
        let mut r: Resolver<'_, NewUser> = Resolver::new(Operation::Create);

        let username = r.required(
            "username",
            req.username,
            |c| c.username.clone(),
            parse_username,
        );
        let email = r.required("email", req.email, |c| c.email.clone(), email);
        let password = r.required(
            "password",
            req.password,
            |c| c.password.clone(),
            parse_password,
        );
        let first_name = r.optional(
            "first_name",
            req.first_name,
            |c| c.first_name.clone(),
            blank_text(USER_NAME_MAX_LEN),
        );
        let last_name = r.optional(
            "last_name",
            req.last_name,
            |c| c.last_name.clone(),
            blank_text(USER_NAME_MAX_LEN),
        );

        match req.password_confirm {
            None => r.reject("password_confirm", REQUIRED),
            Some(confirm) if confirm != password && !r.has_error("password") => {
                r.reject(NON_FIELD_ERRORS, "Passwords don't match")
            }
            Some(_) => {}
        }

        if !r.has_error("username") && self.username_taken(&username).await? {
            r.reject("username", USERNAME_TAKEN);
        }
        if !r.has_error("email") && self.email_taken(&email).await? {
            r.reject("email", EMAIL_TAKEN);
        }

        Ok(r.finish(NewUser {
            username,
            email,
            password,
            first_name,
            last_name,
        })?)
    }

    async fn username_taken(&self, username: &str) -> ClinicResult<bool> {
        let found: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE username = ?1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn email_taken(&self, email: &str) -> ClinicResult<bool> {
        let found: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }
}

const USERNAME_TAKEN: &str = "A user with that username already exists.";
const EMAIL_TAKEN: &str = "A user with this email already exists.";

fn registration_conflict(err: sqlx::Error) -> ClinicError {
    match unique_violation(&err) {
        Some(msg) if msg.contains("users.username") => {
            FieldErrors::single("username", USERNAME_TAKEN).into()
        }
        Some(msg) if msg.contains("users.email") => FieldErrors::single("email", EMAIL_TAKEN).into(),
        _ => err.into(),
    }
}

fn parse_username(raw: String) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(BLANK.into());
    }
    if trimmed.chars().count() > USER_NAME_MAX_LEN {
        return Err(format!(
            "Ensure this field has no more than {USER_NAME_MAX_LEN} characters."
        ));
    }
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_');
    if !trimmed.chars().all(allowed) {
        return Err("Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.".into());
    }
    Ok(trimmed.to_owned())
}

fn parse_password(raw: String) -> Result<String, String> {
    if raw.is_empty() {
        return Err(BLANK.into());
    }
    if raw.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Ensure this field has at least {MIN_PASSWORD_LEN} characters."
        ));
    }
    Ok(raw)
}

fn hash_password(password: &str) -> ClinicResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ClinicError::PasswordHash(e.to_string()))
}

fn verify_password(password: &str, stored: &str) -> ClinicResult<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| ClinicError::corrupt("password_hash", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::connect_in_memory;

    pub(crate) fn registration(username: &str) -> RegisterReq {
        RegisterReq {
            username: Some(username.into()),
            email: Some(format!("{username}@example.com")),
            password: Some("password123".into()),
            password_confirm: Some("password123".into()),
            first_name: None,
            last_name: None,
        }
    }

    pub(crate) async fn register(pool: &SqlitePool, username: &str) -> User {
        UserService::new(pool.clone())
            .register(registration(username))
            .await
            .expect("registration should succeed")
    }

    fn login(username: &str, password: &str) -> LoginReq {
        LoginReq {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let service = UserService::new(connect_in_memory().await.unwrap());
        let user = service.register(registration("alice")).await.unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.first_name, "");
        assert!(user.is_active);

        let logged_in = service
            .authenticate(login("alice", "password123"))
            .await
            .expect("correct password");
        assert_eq!(logged_in, user);
    }

    #[tokio::test]
    async fn password_is_not_stored_in_clear() {
        let pool = connect_in_memory().await.unwrap();
        register(&pool, "alice").await;
        let (hash,): (String,) = sqlx::query_as("SELECT password_hash FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert!(hash.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let service = UserService::new(connect_in_memory().await.unwrap());
        service.register(registration("alice")).await.unwrap();

        let mut req = registration("alice2");
        req.email = Some("alice@example.com".into());
        let err = service.register(req).await.unwrap_err();
        let errors = err.field_errors().expect("validation error");
        assert_eq!(errors.get("email"), Some(&[EMAIL_TAKEN.to_string()][..]));
    }

    #[tokio::test]
    async fn mismatched_confirmation_is_reported_alongside_field_errors() {
        let service = UserService::new(connect_in_memory().await.unwrap());
        let req = RegisterReq {
            username: Some("bad name!".into()),
            password_confirm: Some("different1".into()),
            ..registration("x")
        };
        let err = service.register(req).await.unwrap_err();
        let errors = err.field_errors().unwrap();
        assert!(errors.has("username"));
        assert_eq!(
            errors.get("non_field_errors"),
            Some(&["Passwords don't match".to_string()][..])
        );
    }

    #[tokio::test]
    async fn missing_fields_and_short_password() {
        let service = UserService::new(connect_in_memory().await.unwrap());
        let req = RegisterReq {
            username: Some("bob".into()),
            password: Some("short".into()),
            password_confirm: Some("short".into()),
            ..RegisterReq::default()
        };
        let errors = service.register(req).await.unwrap_err();
        let errors = errors.field_errors().unwrap();
        assert_eq!(errors.get("email"), Some(&[REQUIRED.to_string()][..]));
        assert!(errors.has("password"));
        assert!(!errors.has("non_field_errors"));
    }

    #[tokio::test]
    async fn login_failures() {
        let service = UserService::new(connect_in_memory().await.unwrap());
        service.register(registration("alice")).await.unwrap();

        let cases = [
            (login("alice", "wrong-password"), INVALID_CREDENTIALS),
            (login("nobody", "password123"), INVALID_CREDENTIALS),
            (login("alice", ""), MISSING_CREDENTIALS),
            (LoginReq::default(), MISSING_CREDENTIALS),
        ];
        for (req, expected) in cases {
            let err = service.authenticate(req).await.unwrap_err();
            assert_eq!(
                err.field_errors().unwrap().get("non_field_errors"),
                Some(&[expected.to_string()][..])
            );
        }
    }

    #[tokio::test]
    async fn disabled_accounts_cannot_login_or_use_tokens() {
        let service = UserService::new(connect_in_memory().await.unwrap());
        let user = service.register(registration("alice")).await.unwrap();
        service.set_active("alice", false).await.unwrap();

        let err = service
            .authenticate(login("alice", "password123"))
            .await
            .unwrap_err();
        assert_eq!(
            err.field_errors().unwrap().get("non_field_errors"),
            Some(&[ACCOUNT_DISABLED.to_string()][..])
        );
        assert!(matches!(
            service.find_active(user.id).await,
            Err(ClinicError::AccountDisabled)
        ));
        assert!(matches!(
            service.find_active(user.id + 1).await,
            Err(ClinicError::UnknownUser)
        ));

        service.set_active("alice", true).await.unwrap();
        assert!(service.find_active(user.id).await.is_ok());
        assert!(matches!(
            service.set_active("nobody", true).await,
            Err(ClinicError::NotFound("user"))
        ));
    }

    #[test]
    fn username_characters() {
        assert_eq!(parse_username(" a.b+c-d_e@f ".into()), Ok("a.b+c-d_e@f".into()));
        assert!(parse_username("has space".into()).is_err());
        assert!(parse_username("semi;colon".into()).is_err());
    }
}
