use crate::{config::AuthConfig, services::auth_service::AuthService};

/// Creates the configured admin account if it does not exist yet.
pub async fn seed_admin(cfg: &AuthConfig, auth: &AuthService) -> anyhow::Result<()> {
    let (Some(email), Some(password)) = (cfg.admin_email.as_deref(), cfg.admin_password.as_deref())
    else {
        tracing::debug!("no admin credentials configured; skipping admin seed");
        return Ok(());
    };

    let created = auth
        .ensure_admin(email, password)
        .await
        .map_err(|err| anyhow::anyhow!("admin seed failed: {err}"))?;

    if created {
        tracing::info!(email = %email, "seeded admin user");
    } else {
        tracing::info!(email = %email, "admin user already present");
    }
    Ok(())
}
