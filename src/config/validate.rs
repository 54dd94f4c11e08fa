use anyhow::{Result, bail};

use super::{
    AppConfig,
    defaults::{
        MAX_RESET_TTL_MINUTES, MAX_SESSION_TTL_HOURS, MAX_TOKEN_RETENTION_HOURS,
        MAX_VERIFICATION_TTL_HOURS,
    },
};
use crate::auth::password::MIN_PASSWORD_LEN;

pub fn validate(cfg: &AppConfig) -> Result<()> {
    let mut errors: Vec<String> = Vec::new();

    if cfg.general.host.trim().is_empty() {
        errors.push("general.host must not be empty".to_string());
    }

    if let Some(database) = cfg.database.as_ref() {
        if database.url.trim().is_empty() {
            errors.push("database.url must not be empty".to_string());
        }

        if database.max_connections == 0 {
            errors.push("database.max_connections must be > 0".to_string());
        }

        if database.min_idle > database.max_connections {
            errors.push(format!(
                "database.min_idle ({}) must be <= database.max_connections ({})",
                database.min_idle, database.max_connections
            ));
        }
    }

    let auth = &cfg.auth;
    check_range(
        &mut errors,
        "auth.session_ttl_hours",
        auth.session_ttl_hours,
        1,
        MAX_SESSION_TTL_HOURS,
    );
    check_range(
        &mut errors,
        "auth.verification_ttl_hours",
        auth.verification_ttl_hours,
        1,
        MAX_VERIFICATION_TTL_HOURS,
    );
    check_range(
        &mut errors,
        "auth.reset_ttl_minutes",
        auth.reset_ttl_minutes,
        1,
        MAX_RESET_TTL_MINUTES,
    );
    check_range(
        &mut errors,
        "auth.token_retention_hours",
        auth.token_retention_hours,
        0,
        MAX_TOKEN_RETENTION_HOURS,
    );

    match (auth.admin_email.as_deref(), auth.admin_password.as_deref()) {
        (Some(email), Some(password)) => {
            if email.trim().is_empty() || !email.contains('@') {
                errors.push("auth.admin_email must be a valid email address".to_string());
            }

            if password.len() < MIN_PASSWORD_LEN {
                errors.push(format!(
                    "auth.admin_password must be at least {MIN_PASSWORD_LEN} characters"
                ));
            }
        }
        (None, None) => {}
        _ => errors.push(
            "auth.admin_email and auth.admin_password must be set together".to_string(),
        ),
    }

    if errors.is_empty() {
        return Ok(());
    }

    bail!("invalid app config:\n- {}", errors.join("\n- "))
}

fn check_range(errors: &mut Vec<String>, name: &str, value: i64, min: i64, max: i64) {
    if value < min {
        errors.push(format!("{name} must be >= {min}"));
    } else if value > max {
        errors.push(format!("{name} must be <= {max}"));
    }
}
