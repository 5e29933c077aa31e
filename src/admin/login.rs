//! SSO login for the admin site (Keycloak, then a Google account)

use super::AdminConsole;
use crate::config::Settings;
use crate::error::{GeoSyncError, Result};
use geo_sync_common::{FieldInput, FieldSelector};
use std::time::Duration;

const SSO_BUTTON: &str = "button.social_btn_2.keycloak_btn_2";
const PASSWORD_INPUT: &str = "Passwd";
const PASSWORD_NEXT: &str = "passwordNext";

pub fn needs_login(url: &str) -> bool {
    url.contains("login")
}

fn account_selector(identifier: &str) -> FieldSelector {
    FieldSelector::Css(format!("div[data-identifier='{}']", identifier))
}

/// Open the admin root and sign in when it redirects to a login page.
/// Returns whether a login was performed.
pub async fn ensure_logged_in(
    console: &mut dyn AdminConsole,
    settings: &Settings,
    poll: Duration,
) -> Result<bool> {
    console.open(&settings.admin_url).await?;
    if !needs_login(&console.current_url().await?) {
        tracing::info!("Already signed in to the admin");
        return Ok(false);
    }

    let identifier = settings.google_account_identifier.as_deref().ok_or_else(|| {
        GeoSyncError::Config("admin login required but GOOGLE_ACCOUNT_IDENTIFIER is not set".into())
    })?;
    let password = settings.google_account_password.as_deref().ok_or_else(|| {
        GeoSyncError::Config("admin login required but GOOGLE_ACCOUNT_PASSWORD is not set".into())
    })?;

    tracing::info!("Admin login required, signing in as {}", identifier);

    let sso = console.locate(&FieldSelector::Css(SSO_BUTTON.into())).await?;
    console.click(&sso).await?;

    let account = console.locate(&account_selector(identifier)).await?;
    console.click(&account).await?;

    let password_input = console
        .locate(&FieldSelector::Name(PASSWORD_INPUT.into()))
        .await?;
    console
        .fill(
            &password_input,
            &FieldInput::Text {
                value: password.to_string(),
            },
        )
        .await?;
    let next = console.locate(&FieldSelector::Id(PASSWORD_NEXT.into())).await?;
    console.click(&next).await?;

    let attempts = (settings.timeout_seconds * 1000 / poll.as_millis().max(1) as u64).max(1);
    for _ in 0..attempts {
        if !needs_login(&console.current_url().await?) {
            tracing::info!("Admin login finished");
            return Ok(true);
        }
        tokio::time::sleep(poll).await;
    }
    Err(GeoSyncError::FormInteractionFailed(
        "still on the login page after submitting the password".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_login() {
        assert!(needs_login("https://content.example/admin/login/?next=/admin/"));
        assert!(!needs_login("https://content.example/admin/geo/region/"));
    }

    #[test]
    fn test_account_selector() {
        assert_eq!(
            account_selector("ops@example.com"),
            FieldSelector::Css("div[data-identifier='ops@example.com']".into())
        );
    }
}
