use crate::error::{AppError, AppResult};
use crate::schemas::{User, UserId, UserRole};
use actix_web::{http::header::HeaderValue, HttpRequest};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;

const ISSUER: &str = "association-manager";
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// A user as listed in the users file.
///
/// Either `passwordHash` (an argon2 PHC string) or a plaintext `password` must
/// be present. A plaintext password is hashed at load and dropped.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub password_hash: Option<String>,
    pub name: String,
    pub role: UserRole,
}

pub fn load_user_records(path: &Path) -> AppResult<Vec<UserRecord>> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::Config(format!("cannot read {}: {err}", path.display())))?;
    serde_json::from_str(&content)
        .map_err(|err| AppError::Config(format!("invalid users file {}: {err}", path.display())))
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AppError::Config(format!("cannot hash password: {err}")))
}

fn password_matches(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Session token payload
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: UserId,
    iat: i64,
    exp: i64,
    iss: String,
}

#[derive(Clone)]
struct StoredUser {
    user: User,
    password_hash: String,
}

/// Verifies passwords against argon2 hashes and signs session tokens.
#[derive(Clone)]
pub struct Credentials {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    session_ttl_secs: i64,
    users: HashMap<UserId, StoredUser>,
}

impl Credentials {
    pub fn from_records(
        secret: &str,
        session_ttl_secs: i64,
        records: Vec<UserRecord>,
    ) -> AppResult<Self> {
        // Signing key is SHA-256(secret), so any secret length yields a 256-bit key.
        let mut sha256_hasher = Sha256::new();
        sha256_hasher.update(secret.as_bytes());
        let key = sha256_hasher.finalize();

        let mut users = HashMap::new();
        for record in records {
            let password_hash = match (record.password_hash, record.password) {
                (Some(hash), _) => {
                    PasswordHash::new(&hash).map_err(|err| {
                        AppError::Config(format!("user {}: invalid password hash: {err}", record.id))
                    })?;
                    hash
                }
                (None, Some(password)) => hash_password(&password)?,
                (None, None) => {
                    return Err(AppError::Config(format!("user {} has no password", record.id)))
                }
            };
            let user = User {
                id: record.id,
                username: record.username,
                name: record.name,
                role: record.role,
            };
            users.insert(
                user.id.clone(),
                StoredUser {
                    user,
                    password_hash,
                },
            );
        }
        Ok(Credentials {
            encoding_key: EncodingKey::from_secret(key.as_slice()),
            decoding_key: DecodingKey::from_secret(key.as_slice()),
            session_ttl_secs,
            users,
        })
    }

    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.get(id).map(|stored| &stored.user)
    }

    /// Checks the password an operator re-enters to confirm a destructive action.
    pub fn verify_password(&self, user_id: &str, password: &str) -> AppResult<()> {
        let stored = self.users.get(user_id).ok_or(AppError::WrongPassword)?;
        if password_matches(password, &stored.password_hash) {
            Ok(())
        } else {
            Err(AppError::WrongPassword)
        }
    }

    pub fn login(&self, username: &str, password: &str, now: i64) -> AppResult<(User, String)> {
        let stored = self
            .users
            .values()
            .find(|stored| stored.user.username == username)
            .ok_or_else(|| AppError::Unauthorized("invalid username or password".to_string()))?;
        self.verify_password(&stored.user.id, password)
            .map_err(|_| AppError::Unauthorized("invalid username or password".to_string()))?;
        let token = self.issue_token(&stored.user.id, now)?;
        Ok((stored.user.clone(), token))
    }

    /// Signs an HS256 JWT for `user_id`, valid for the configured TTL.
    pub fn issue_token(&self, user_id: &str, issued_at: i64) -> AppResult<String> {
        let claims = Claims {
            sub: user_id.to_string(),
            iat: issued_at,
            exp: issued_at + self.session_ttl_secs,
            iss: ISSUER.to_string(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|err| AppError::Config(format!("cannot sign session token: {err}")))
    }

    pub fn authenticate(&self, token: &str, now: i64) -> AppResult<User> {
        let invalid = || AppError::Unauthorized("invalid session token".to_string());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.set_required_spec_claims(&["sub", "exp", "iss"]);
        // Expiry is checked against `now` below.
        validation.validate_exp = false;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|_| invalid())?
            .claims;
        if now > claims.exp || claims.iat - now > MAX_CLOCK_SKEW_SECS {
            return Err(AppError::Unauthorized("session expired".to_string()));
        }
        self.user(&claims.sub).cloned().ok_or_else(invalid)
    }
}

/// Resolves the acting operator from an `Authorization: Bearer <token>` header.
pub fn check_authorization(
    request: &HttpRequest,
    credentials: &Credentials,
    now: i64,
) -> AppResult<User> {
    let missing = || AppError::Unauthorized("missing bearer token".to_string());
    let authorization = request
        .headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .map(HeaderValue::to_str)
        .ok_or_else(missing)?
        .map_err(|_| missing())?;
    let token = authorization.strip_prefix("Bearer ").ok_or_else(missing)?;
    credentials.authenticate(token.trim(), now)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use std::sync::OnceLock;

    fn record(id: &str, username: &str, password: &str, name: &str, role: UserRole) -> UserRecord {
        UserRecord {
            id: id.to_string(),
            username: username.to_string(),
            password: Some(password.to_string()),
            password_hash: None,
            name: name.to_string(),
            role,
        }
    }

    pub(crate) fn sample_records() -> Vec<UserRecord> {
        vec![
            record("u-admin", "admin", "admin123", "Ana Admin", UserRole::Admin),
            record("u-editor", "editor", "editor123", "Edu Editor", UserRole::Editor),
            record("u.viewer", "viewer", "viewer123", "Vera Viewer", UserRole::Viewer),
        ]
    }

    /// Argon2 is slow in debug builds, so the sample users are hashed once.
    pub(crate) fn sample_credentials() -> Credentials {
        static CREDENTIALS: OnceLock<Credentials> = OnceLock::new();
        CREDENTIALS
            .get_or_init(|| Credentials::from_records("test-secret", 3600, sample_records()).unwrap())
            .clone()
    }

    #[test]
    fn password_is_verified_against_the_hash() {
        let credentials = sample_credentials();
        assert!(credentials.verify_password("u-admin", "admin123").is_ok());
        assert!(matches!(
            credentials.verify_password("u-admin", "admin124"),
            Err(AppError::WrongPassword)
        ));
        assert!(matches!(
            credentials.verify_password("nobody", "admin123"),
            Err(AppError::WrongPassword)
        ));
    }

    #[test]
    fn users_file_may_carry_precomputed_hashes() {
        let json = format!(
            r#"[{{"id": "u1", "username": "tesouraria", "passwordHash": "{}", "name": "Tesouraria", "role": "editor"}}]"#,
            hash_password("s3nha").unwrap()
        );
        let records: Vec<UserRecord> = serde_json::from_str(&json).unwrap();
        let credentials = Credentials::from_records("k", 60, records).unwrap();
        assert!(credentials.verify_password("u1", "s3nha").is_ok());
        assert!(credentials.verify_password("u1", "senha").is_err());
    }

    #[test]
    fn users_without_a_usable_password_are_a_config_error() {
        let mut missing = record("u1", "a", "x", "A", UserRole::Viewer);
        missing.password = None;
        assert!(matches!(
            Credentials::from_records("k", 60, vec![missing]),
            Err(AppError::Config(_))
        ));

        let mut garbled = record("u2", "b", "x", "B", UserRole::Viewer);
        garbled.password_hash = Some("not-a-phc-string".to_string());
        assert!(matches!(
            Credentials::from_records("k", 60, vec![garbled]),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn login_issues_a_token_that_authenticates() {
        let credentials = sample_credentials();
        let (user, token) = credentials.login("editor", "editor123", 1_000).unwrap();
        assert_eq!(user.role, UserRole::Editor);
        let resolved = credentials.authenticate(&token, 1_500).unwrap();
        assert_eq!(resolved, user);
    }

    #[test]
    fn login_rejects_a_wrong_password() {
        let credentials = sample_credentials();
        assert!(matches!(
            credentials.login("editor", "nope", 1_000),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn dotted_user_ids_survive_the_token() {
        let credentials = sample_credentials();
        let token = credentials.issue_token("u.viewer", 10).unwrap();
        assert_eq!(credentials.authenticate(&token, 20).unwrap().id, "u.viewer");
    }

    #[test]
    fn tampered_and_expired_tokens_are_rejected() {
        let credentials = sample_credentials();
        let token = credentials.issue_token("u-editor", 1_000).unwrap();
        let admin_token = credentials.issue_token("u-admin", 1_000).unwrap();
        let editor_parts: Vec<&str> = token.split('.').collect();
        let admin_parts: Vec<&str> = admin_token.split('.').collect();
        let forged = format!("{}.{}.{}", editor_parts[0], admin_parts[1], editor_parts[2]);

        assert!(credentials.authenticate(&forged, 1_000).is_err());
        assert!(credentials.authenticate(&token, 1_000 + 3600).is_ok());
        assert!(credentials.authenticate(&token, 1_000 + 3601).is_err());
        assert!(credentials.authenticate(&token, 1_000 - 61).is_err());
        assert!(credentials.authenticate("garbage", 1_000).is_err());
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let other = Credentials::from_records("other", 3600, vec![]).unwrap();
        let token = other.issue_token("u-admin", 5).unwrap();
        assert!(sample_credentials().authenticate(&token, 5).is_err());
    }

    #[test]
    fn bearer_header_resolves_the_operator() {
        let credentials = sample_credentials();
        let token = credentials.issue_token("u-admin", 100).unwrap();
        let request = TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_http_request();
        let user = check_authorization(&request, &credentials, 100).unwrap();
        assert_eq!(user.name, "Ana Admin");

        let anonymous = TestRequest::default().to_http_request();
        assert!(matches!(
            check_authorization(&anonymous, &credentials, 100),
            Err(AppError::Unauthorized(_))
        ));
    }
}
