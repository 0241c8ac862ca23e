//! Transactional email
//!
//! Verification and password reset links are delivered via the Resend API.
//! Raw tokens only ever leave the service inside these emails.

use async_trait::async_trait;

use crate::config::Config;

/// Delivers account lifecycle emails
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_email_verification(&self, to: &str, verification_token: &str);

    async fn send_password_reset(&self, to: &str, reset_token: &str);
}

/// Email configuration
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// Resend API key; empty disables sending
    pub resend_api_key: String,
    pub email_from: String,
    /// Base URL for links in emails
    pub public_url: String,
}

impl EmailConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            resend_api_key: config.resend_api_key.clone(),
            email_from: config.email_from.clone(),
            public_url: config.public_url.clone(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.resend_api_key.is_empty()
    }
}

/// Mailer backed by the Resend HTTP API
#[derive(Clone)]
pub struct ResendMailer {
    config: EmailConfig,
    client: reqwest::Client,
}

impl ResendMailer {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    async fn send_email(&self, to: &str, subject: &str, html: &str) {
        if !self.config.is_enabled() {
            tracing::warn!(subject = %subject, "Email not configured, skipping");
            return;
        }

        let body = serde_json::json!({
            "from": self.config.email_from,
            "to": [to],
            "subject": subject,
            "html": html
        });

        let response = self
            .client
            .post("https://api.resend.com/emails")
            .bearer_auth(&self.config.resend_api_key)
            .json(&body)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!(to = %to, subject = %subject, "Email sent");
            }
            Ok(resp) => {
                tracing::error!(status = %resp.status(), subject = %subject, "Failed to send email");
            }
            Err(e) => {
                tracing::error!(error = %e, subject = %subject, "Failed to send email");
            }
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send_email_verification(&self, to: &str, verification_token: &str) {
        let link = format!(
            "{}/verify-email?token={}",
            self.config.public_url, verification_token
        );
        let html = format!(
            r#"<p>Welcome to RetireZest!</p>
<p>Verify your email to unlock unlimited retirement simulations.</p>
<p><a href="{link}">Verify Email Address</a></p>
<p>This link is only valid for a limited time.</p>"#
        );

        self.send_email(to, "Verify your email - RetireZest", &html)
            .await;
    }

    async fn send_password_reset(&self, to: &str, reset_token: &str) {
        let link = format!(
            "{}/reset-password?token={}",
            self.config.public_url, reset_token
        );
        let html = format!(
            r#"<p>We received a request to reset your RetireZest password.</p>
<p><a href="{link}">Choose a new password</a></p>
<p>If you didn't ask for this, ignore this email.</p>"#
        );

        self.send_email(to, "Reset your password - RetireZest", &html)
            .await;
    }
}
