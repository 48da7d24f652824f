//! Staff accounts and login sessions.
//!
//! Passwords are stored as argon2 PHC strings. A session token is 32 random
//! bytes handed to the client as hex; only its blake3 hash is persisted.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::RngCore;
use rand::rngs::OsRng;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Deserialize;

use crate::clock::LocalClock;
use crate::error::{DeskError, Result};
use crate::model::User;

const TOKEN_BYTES: usize = 32;

/// Registration form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Registration {
    pub email: String,
    pub name: String,
    pub password: String,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DeskError::Internal(format!("password hashing failed: {e}")))
}

fn token_hash(token: &str) -> String {
    blake3::hash(token.as_bytes()).to_hex().to_string()
}

/// Create an account. The email is stored lowercased.
///
/// # Errors
///
/// Returns a validation error for a blank field,
/// [`DeskError::EmailTaken`] for a duplicate email, or a storage error.
pub fn register(conn: &Connection, clock: &LocalClock, form: &Registration) -> Result<User> {
    let email = normalize_email(&form.email);
    let name = form.name.trim();
    if email.is_empty() {
        return Err(DeskError::validation("email", "email is required"));
    }
    if name.is_empty() {
        return Err(DeskError::validation("name", "name is required"));
    }
    if form.password.is_empty() {
        return Err(DeskError::validation("password", "password is required"));
    }

    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
        [&email],
        |row| row.get(0),
    )?;
    if exists {
        return Err(DeskError::EmailTaken(email));
    }

    let password_hash = hash_password(&form.password)?;
    conn.execute(
        "INSERT INTO users (email, name, password_hash, created_at_us) VALUES (?1, ?2, ?3, ?4)",
        params![email, name, password_hash, clock.now_us()],
    )?;
    let user = User {
        id: conn.last_insert_rowid(),
        email,
        name: name.to_string(),
    };
    tracing::info!(user_id = user.id, "registered user");
    Ok(user)
}

/// Check an email/password pair.
///
/// # Errors
///
/// Returns [`DeskError::InvalidCredentials`] for an unknown email or a wrong
/// password.
pub fn verify_credentials(conn: &Connection, email: &str, password: &str) -> Result<User> {
    let row: Option<(User, String)> = conn
        .query_row(
            "SELECT user_id, email, name, password_hash FROM users WHERE email = ?1",
            [normalize_email(email)],
            |row| {
                Ok((
                    User {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        name: row.get(2)?,
                    },
                    row.get(3)?,
                ))
            },
        )
        .optional()?;
    let Some((user, stored)) = row else {
        return Err(DeskError::InvalidCredentials);
    };

    let parsed = PasswordHash::new(&stored)
        .map_err(|e| DeskError::Internal(format!("stored password hash is unreadable: {e}")))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| DeskError::InvalidCredentials)?;
    Ok(user)
}

/// Start a session and return the bearer token.
///
/// # Errors
///
/// Returns a storage error if the insert fails.
pub fn create_session(conn: &Connection, clock: &LocalClock, user_id: i64) -> Result<String> {
    let mut bytes = [0_u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    let token: String = bytes.iter().map(|b| format!("{b:02x}")).collect();

    conn.execute(
        "INSERT INTO sessions (token_hash, user_id, created_at_us) VALUES (?1, ?2, ?3)",
        params![token_hash(&token), user_id, clock.now_us()],
    )?;
    tracing::debug!(user_id, "session created");
    Ok(token)
}

/// Look up the user behind a session token.
///
/// # Errors
///
/// Returns [`DeskError::SessionExpired`] if the token is unknown.
pub fn resolve_session(conn: &Connection, token: &str) -> Result<User> {
    conn.query_row(
        "SELECT u.user_id, u.email, u.name
         FROM sessions s JOIN users u ON u.user_id = s.user_id
         WHERE s.token_hash = ?1",
        [token_hash(token)],
        |row| {
            Ok(User {
                id: row.get(0)?,
                email: row.get(1)?,
                name: row.get(2)?,
            })
        },
    )
    .optional()?
    .ok_or(DeskError::SessionExpired)
}

/// End a session. Returns whether it existed.
///
/// # Errors
///
/// Returns a storage error if the delete fails.
pub fn end_session(conn: &Connection, token: &str) -> Result<bool> {
    let removed = conn.execute(
        "DELETE FROM sessions WHERE token_hash = ?1",
        [token_hash(token)],
    )?;
    Ok(removed > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    fn registration(email: &str) -> Registration {
        Registration {
            email: email.to_string(),
            name: "Olive Ops".to_string(),
            password: "correct horse".to_string(),
        }
    }

    fn clock() -> LocalClock {
        LocalClock::system(chrono_tz::UTC)
    }

    #[test]
    fn register_lowercases_and_rejects_duplicates() {
        let conn = open_in_memory().unwrap();
        let user = register(&conn, &clock(), &registration(" Olive@Example.COM ")).unwrap();
        assert_eq!(user.email, "olive@example.com");

        let err = register(&conn, &clock(), &registration("olive@example.com")).unwrap_err();
        assert!(matches!(err, DeskError::EmailTaken(_)));
    }

    #[test]
    fn credentials_check_password_and_email() {
        let conn = open_in_memory().unwrap();
        let user = register(&conn, &clock(), &registration("olive@example.com")).unwrap();

        let ok = verify_credentials(&conn, "OLIVE@example.com", "correct horse").unwrap();
        assert_eq!(ok, user);
        assert!(matches!(
            verify_credentials(&conn, "olive@example.com", "wrong"),
            Err(DeskError::InvalidCredentials)
        ));
        assert!(matches!(
            verify_credentials(&conn, "nobody@example.com", "correct horse"),
            Err(DeskError::InvalidCredentials)
        ));
    }

    #[test]
    fn sessions_resolve_until_ended() {
        let conn = open_in_memory().unwrap();
        let user = register(&conn, &clock(), &registration("olive@example.com")).unwrap();
        let token = create_session(&conn, &clock(), user.id).unwrap();
        assert_eq!(token.len(), TOKEN_BYTES * 2);

        let stored: String = conn
            .query_row("SELECT token_hash FROM sessions", [], |row| row.get(0))
            .unwrap();
        assert_ne!(stored, token, "raw token must not be stored");

        assert_eq!(resolve_session(&conn, &token).unwrap(), user);
        assert!(end_session(&conn, &token).unwrap());
        assert!(!end_session(&conn, &token).unwrap());
        assert!(matches!(
            resolve_session(&conn, &token),
            Err(DeskError::SessionExpired)
        ));
    }

    #[test]
    fn blank_fields_are_rejected() {
        let conn = open_in_memory().unwrap();
        let mut form = registration("olive@example.com");
        form.password.clear();
        assert!(matches!(
            register(&conn, &clock(), &form),
            Err(DeskError::Validation { field: "password", .. })
        ));
    }
}
