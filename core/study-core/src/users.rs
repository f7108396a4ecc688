//! User directory stored alongside the study logs.
//!
//! Identity only scopes rows; there is no authentication.

use rusqlite::{params, ErrorCode, OptionalExtension};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StudyError};
use crate::sink::StudyDb;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "Light",
            Theme::Dark => "Dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = StudyError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(StudyError::InvalidInput(format!("unknown theme: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub theme: Theme,
}

impl StudyDb {
    /// Registers a new user. A taken username is reported as
    /// [`StudyError::UserExists`].
    pub fn register_user(&self, username: &str, email: Option<&str>) -> Result<User> {
        let username = normalize_username(username)?;
        let email = email.map(str::trim).filter(|value| !value.is_empty());

        let id = self.with_connection(|conn| {
            match conn.execute(
                "INSERT INTO users (username, email) VALUES (?1, ?2)",
                params![username, email],
            ) {
                Ok(_) => Ok(conn.last_insert_rowid()),
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == ErrorCode::ConstraintViolation =>
                {
                    Err(StudyError::UserExists(username.clone()))
                }
                Err(err) => Err(StudyError::Sqlite {
                    context: "registering user".to_string(),
                    source: err,
                }),
            }
        })?;

        tracing::info!(username = %username, user_id = id, "User registered");
        Ok(User {
            id,
            username,
            email: email.map(str::to_string),
            theme: Theme::default(),
        })
    }

    /// Looks a user up by name. Unknown names are `Ok(None)`.
    pub fn login_user(&self, username: &str) -> Result<Option<User>> {
        let username = normalize_username(username)?;
        let user = self.with_connection(|conn| {
            conn.query_row(
                "SELECT id, username, email, theme FROM users WHERE username = ?1",
                params![username],
                |row| {
                    let theme: String = row.get(3)?;
                    Ok(User {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        email: row.get(2)?,
                        theme: theme.parse().unwrap_or_default(),
                    })
                },
            )
            .optional()
            .map_err(StudyError::sqlite("looking up user"))
        })?;

        match &user {
            Some(user) => tracing::info!(username = %user.username, "User logged in"),
            None => tracing::warn!(username = %username, "Login failed; no such user"),
        }
        Ok(user)
    }

    pub fn set_theme(&self, user_id: i64, theme: Theme) -> Result<()> {
        let updated = self.with_connection(|conn| {
            conn.execute(
                "UPDATE users SET theme = ?1 WHERE id = ?2",
                params![theme.as_str(), user_id],
            )
            .map_err(StudyError::sqlite("updating theme"))
        })?;
        if updated == 0 {
            return Err(StudyError::UserNotFound(user_id.to_string()));
        }
        tracing::info!(user_id, theme = %theme, "Theme updated");
        Ok(())
    }
}

fn normalize_username(username: &str) -> Result<String> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(StudyError::InvalidInput(
            "username must not be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> (tempfile::TempDir, StudyDb) {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let db = StudyDb::new(temp_dir.path().join("study.db")).expect("db init");
        (temp_dir, db)
    }

    #[test]
    fn register_then_login_returns_same_user() {
        let (_dir, db) = db();
        let registered = db
            .register_user("  alice ", Some("alice@example.com"))
            .expect("register");
        assert_eq!(registered.username, "alice");
        assert_eq!(registered.theme, Theme::Light);

        let found = db.login_user("alice").expect("login").expect("user exists");
        assert_eq!(found, registered);
    }

    #[test]
    fn duplicate_username_is_reported_as_existing() {
        let (_dir, db) = db();
        db.register_user("bob", None).expect("register");
        let err = db.register_user("bob", Some("b@x")).expect_err("duplicate");
        assert!(matches!(err, StudyError::UserExists(name) if name == "bob"));
    }

    #[test]
    fn login_of_unknown_user_is_none() {
        let (_dir, db) = db();
        assert!(db.login_user("nobody").expect("login").is_none());
    }

    #[test]
    fn empty_username_is_invalid() {
        let (_dir, db) = db();
        assert!(matches!(
            db.register_user("   ", None),
            Err(StudyError::InvalidInput(_))
        ));
    }

    #[test]
    fn theme_updates_persist() {
        let (_dir, db) = db();
        let user = db.register_user("carol", None).expect("register");
        db.set_theme(user.id, Theme::Dark).expect("set theme");

        let found = db.login_user("carol").expect("login").expect("user exists");
        assert_eq!(found.theme, Theme::Dark);
        assert_eq!(found.email, None);

        assert!(matches!(
            db.set_theme(user.id + 100, Theme::Light),
            Err(StudyError::UserNotFound(_))
        ));
    }

    #[test]
    fn theme_parses_case_insensitively() {
        assert_eq!("DARK".parse::<Theme>().expect("theme"), Theme::Dark);
        assert_eq!(" light".parse::<Theme>().expect("theme"), Theme::Light);
        assert!("blue".parse::<Theme>().is_err());
    }
}
