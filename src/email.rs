use anyhow::bail;
use serde_json::json;

/// Outbound mail, delivered through the Resend HTTP API. Exactly one attempt
/// per call; a non-2xx reply surfaces as an error with the provider's body.
#[derive(Clone)]
pub struct Mailer {
    http: reqwest::Client,
    api_key: Option<String>,
    from: String,
}

impl Mailer {
    pub fn from_env() -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: dotenv::var("RESEND_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            from: dotenv::var("MAIL_FROM")
                .unwrap_or_else(|_| "Whisperbox <onboarding@resend.dev>".to_owned()),
        }
    }

    pub async fn send_verification(
        &self,
        to: &str,
        username: &str,
        code: &str,
    ) -> anyhow::Result<()> {
        let Some(api_key) = &self.api_key else {
            // No provider configured (local development): surface the code in
            // the log instead of failing every registration.
            tracing::warn!("RESEND_API_KEY not set, logging verification code instead");
            tracing::info!("verification code for {username} <{to}>: {code}");
            return Ok(());
        };

        let response = self
            .http
            .post("https://api.resend.com/emails")
            .bearer_auth(api_key)
            .json(&json!({
                "from": self.from,
                "to": [to],
                "subject": "Whisperbox verification code",
                "html": verification_html(username, code),
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("mail provider returned {status}: {body}");
        }

        Ok(())
    }
}

fn verification_html(username: &str, code: &str) -> String {
    format!(
        r#"<html>
  <body style="font-family: sans-serif">
    <h2>Verify your email address</h2>
    <p>Hello <strong>{username}</strong>,</p>
    <p>Thank you for registering! Enter this code on the verification page to
    complete your account setup:</p>
    <p style="font-size: 32px; letter-spacing: 8px; font-family: monospace">{code}</p>
    <p>This code expires in 1 hour.</p>
    <p>If you didn't request this code, please ignore this email.</p>
  </body>
</html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_contains_recipient_and_code() {
        let html = verification_html("abc", "123456");
        assert!(html.contains("abc"));
        assert!(html.contains("123456"));
    }
}
