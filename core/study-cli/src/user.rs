//! `user` subcommand. Users always live in the SQLite database, whichever
//! backend holds the study log.

use clap::Subcommand;
use std::path::PathBuf;
use study_core::{load_config, StudyDb, StudyError, Theme, User};

#[derive(Subcommand, Debug)]
pub enum UserAction {
    /// Register a new user
    Register {
        name: String,

        #[arg(long)]
        email: Option<String>,
    },

    /// Check that a user exists and show their settings
    Login { name: String },

    /// Set a user's theme (light or dark)
    Theme {
        name: String,

        #[arg(value_parser = parse_theme)]
        theme: Theme,
    },
}

fn parse_theme(value: &str) -> Result<Theme, String> {
    value.parse::<Theme>().map_err(String::from)
}

pub fn run(config_path: Option<PathBuf>, action: UserAction) -> Result<(), String> {
    let config = load_config(config_path)?;
    let db = StudyDb::new(config.storage.sqlite_path)?;
    println!("{}", apply(&db, action)?);
    Ok(())
}

/// Executes `action` and returns the line to show the user.
fn apply(db: &StudyDb, action: UserAction) -> Result<String, StudyError> {
    match action {
        UserAction::Register { name, email } => {
            let user = db.register_user(&name, email.as_deref())?;
            Ok(format!("Registered {} (id {})", user.username, user.id))
        }
        UserAction::Login { name } => {
            let user = require_user(db, &name)?;
            Ok(format!(
                "Logged in as {} (theme: {})",
                user.username, user.theme
            ))
        }
        UserAction::Theme { name, theme } => {
            let user = require_user(db, &name)?;
            db.set_theme(user.id, theme)?;
            Ok(format!("Theme for {} set to {}", user.username, theme))
        }
    }
}

fn require_user(db: &StudyDb, name: &str) -> Result<User, StudyError> {
    db.login_user(name)?
        .ok_or_else(|| StudyError::UserNotFound(name.trim().to_string()))
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
    fn register_login_and_theme_flow() {
        let (_dir, db) = db();

        let registered = apply(
            &db,
            UserAction::Register {
                name: "alice".to_string(),
                email: Some("alice@example.com".to_string()),
            },
        )
        .expect("register");
        assert_eq!(registered, "Registered alice (id 1)");

        let themed = apply(
            &db,
            UserAction::Theme {
                name: "alice".to_string(),
                theme: Theme::Dark,
            },
        )
        .expect("theme");
        assert_eq!(themed, "Theme for alice set to Dark");

        let login = apply(
            &db,
            UserAction::Login {
                name: "alice".to_string(),
            },
        )
        .expect("login");
        assert_eq!(login, "Logged in as alice (theme: Dark)");
    }

    #[test]
    fn unknown_user_is_an_error() {
        let (_dir, db) = db();
        let err = apply(
            &db,
            UserAction::Login {
                name: "nobody".to_string(),
            },
        )
        .expect_err("missing user");
        assert!(matches!(err, StudyError::UserNotFound(name) if name == "nobody"));
    }

    #[test]
    fn theme_argument_parses_case_insensitively() {
        assert_eq!(parse_theme("Dark"), Ok(Theme::Dark));
        assert!(parse_theme("sepia").is_err());
    }
}
