use anyhow::{Context, bail};
use derive_more::Display;
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::env;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Display)]
pub enum SendError {
    /// The provider rejected our credentials. Fatal for the whole batch.
    #[display(fmt = "authentication failed: {}", _0)]
    Auth(String),
    /// A single delivery failed. Other recipients are unaffected.
    #[display(fmt = "delivery failed: {}", _0)]
    Delivery(String),
}

/// Outbound email capability. Constructed once and passed in explicitly so
/// the dispatch logic can be exercised against a scripted implementation.
pub trait Mailer {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> Result<(), SendError>;
}

pub struct ReminderReport {
    /// False only when the provider rejected credentials (or no recipients).
    pub success: bool,
    pub message: String,
    pub failed_emails: Vec<String>,
}

/// Send the duty reminder to each recipient in turn. One recipient's failure
/// never aborts delivery to the others; an authentication error does, and the
/// remaining recipients are not attempted.
pub async fn send_piket_reminder<M: Mailer>(
    mailer: &M,
    recipients: &[String],
    day_name: &str,
    date_str: &str,
    additional_info: &str,
) -> ReminderReport {
    if recipients.is_empty() {
        return ReminderReport {
            success: false,
            message: "No recipients provided".to_string(),
            failed_emails: Vec::new(),
        };
    }

    let subject = format!("Reminder: Jadwal Piket {day_name}");
    let html_body = build_reminder_html(day_name, date_str, additional_info);
    let text_body = build_reminder_text(day_name, date_str, additional_info);

    let mut failed_emails = Vec::new();
    let mut sent = 0usize;

    for recipient in recipients {
        match mailer.send(recipient, &subject, &html_body, &text_body).await {
            Ok(()) => sent += 1,
            Err(SendError::Auth(msg)) => {
                error!(%recipient, %msg, "email provider rejected credentials");
                return ReminderReport {
                    success: false,
                    message: format!(
                        "Authentication failed when sending reminder emails: {msg}. \
                         Check the provider API key configuration."
                    ),
                    failed_emails: recipients.to_vec(),
                };
            }
            Err(SendError::Delivery(msg)) => {
                warn!(%recipient, %msg, "reminder delivery failed");
                failed_emails.push(recipient.clone());
            }
        }
    }

    if failed_emails.is_empty() {
        ReminderReport {
            success: true,
            message: format!("Successfully sent {sent} emails"),
            failed_emails,
        }
    } else {
        ReminderReport {
            success: true,
            message: format!(
                "Sent {sent}/{} emails. Failed: {}",
                recipients.len(),
                failed_emails.join(", ")
            ),
            failed_emails,
        }
    }
}

#[derive(Clone)]
enum Provider {
    Resend,
    Mailjet,
}

/// Transactional-email client. Prefers Resend, falls back to Mailjet;
/// refuses to construct without credentials for one of them.
#[derive(Clone)]
pub struct EmailService {
    client: Client,
    provider: Provider,
    api_url: String,
    api_key: String,
    api_secret: Option<String>,
    sender_email: String,
    sender_name: String,
}

impl EmailService {
    pub fn from_env() -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build email http client")?;

        let sender_email =
            env::var("SENDER_EMAIL").unwrap_or_else(|_| "rohisdarsa@gmail.com".to_string());
        let sender_name =
            env::var("SENDER_NAME").unwrap_or_else(|_| "Rohis Attendance System".to_string());

        if let Ok(api_key) = env::var("RESEND_API_KEY") {
            info!("EmailService: using Resend provider");
            return Ok(Self {
                client,
                provider: Provider::Resend,
                api_url: "https://api.resend.com/emails".to_string(),
                api_key,
                api_secret: None,
                sender_email,
                sender_name,
            });
        }

        if let (Ok(api_key), Ok(api_secret)) =
            (env::var("MAILJET_API_KEY"), env::var("MAILJET_API_SECRET"))
        {
            info!("EmailService: using Mailjet provider");
            return Ok(Self {
                client,
                provider: Provider::Mailjet,
                api_url: "https://api.mailjet.com/v3.1/send".to_string(),
                api_key,
                api_secret: Some(api_secret),
                sender_email,
                sender_name,
            });
        }

        bail!("No email provider configured. Set RESEND_API_KEY or MAILJET_API_KEY and MAILJET_API_SECRET")
    }

    async fn send_resend(
        &self,
        recipient: &str,
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> Result<(), SendError> {
        let payload = json!({
            "from": { "email": self.sender_email, "name": self.sender_name },
            "to": [ { "email": recipient } ],
            "subject": subject,
            "html": html_body,
            "text": text_body,
        });

        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SendError::Delivery(e.to_string()))?;

        match resp.status() {
            StatusCode::OK | StatusCode::ACCEPTED => Ok(()),
            StatusCode::UNAUTHORIZED => {
                let body = resp.text().await.unwrap_or_default();
                Err(SendError::Auth(format!("Resend returned 401: {body}")))
            }
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(SendError::Delivery(format!("Resend HTTP {status}: {body}")))
            }
        }
    }

    async fn send_mailjet(
        &self,
        recipient: &str,
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> Result<(), SendError> {
        let display_name = recipient
            .split('@')
            .next()
            .unwrap_or(recipient)
            .replace('.', " ");
        let payload = json!({
            "Messages": [{
                "From": { "Email": self.sender_email, "Name": self.sender_name },
                "To": [ { "Email": recipient, "Name": display_name } ],
                "Subject": subject,
                "TextPart": text_body,
                "HTMLPart": html_body,
            }]
        });

        let resp = self
            .client
            .post(&self.api_url)
            .basic_auth(&self.api_key, self.api_secret.as_deref())
            .json(&payload)
            .send()
            .await
            .map_err(|e| SendError::Delivery(e.to_string()))?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            let body = resp.text().await.unwrap_or_default();
            return Err(SendError::Auth(format!("Mailjet returned 401: {body}")));
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(SendError::Delivery(format!(
                "Mailjet HTTP {status}: {body}"
            )));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| SendError::Delivery(e.to_string()))?;
        if body["Messages"][0]["Status"] == "success" {
            Ok(())
        } else {
            Err(SendError::Delivery(format!(
                "Mailjet reported non-success: {body}"
            )))
        }
    }
}

impl Mailer for EmailService {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> Result<(), SendError> {
        match self.provider {
            Provider::Resend => {
                self.send_resend(recipient, subject, html_body, text_body)
                    .await
            }
            Provider::Mailjet => {
                self.send_mailjet(recipient, subject, html_body, text_body)
                    .await
            }
        }
    }
}

fn build_reminder_html(day_name: &str, date_str: &str, additional_info: &str) -> String {
    let extra = if additional_info.is_empty() {
        String::new()
    } else {
        format!(
            r#"<div style="background:#fef3c7;border-left:4px solid #f59e0b;padding:16px;margin:0 30px 20px 30px;border-radius:6px;color:#92400e;">
<strong>Additional Info</strong><br>{additional_info}</div>"#
        )
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="UTF-8"><title>Jadwal Piket Reminder</title></head>
<body style="margin:0;padding:0;background-color:#f8fafc;font-family:Arial,Helvetica,sans-serif;">
<table width="600" cellpadding="0" cellspacing="0" border="0" align="center" style="background:#ffffff;border-radius:10px;overflow:hidden;">
<tr><td align="center" style="background:#059669;color:white;padding:28px;">
<div style="font-size:26px;font-weight:bold;">Reminder</div>
<div style="font-size:15px;opacity:0.9;">Rohis Attendance System</div>
</td></tr>
<tr><td align="center" style="padding:30px 20px 10px 20px;">
<div style="display:inline-block;background:#dcfce7;color:#065f46;padding:10px 18px;border-radius:6px;font-weight:bold;">{day_name} &bull; {date_str}</div>
</td></tr>
<tr><td style="padding:10px 30px;color:#1e293b;font-size:16px;line-height:1.6;">
Assalamu'alaikum,<br><br>
This is a reminder that <strong>you are scheduled for piket duty today ({day_name})</strong>.
</td></tr>
<tr><td style="padding:20px 30px;">
<div style="background:#f1f5f9;border-left:4px solid #059669;border-radius:6px;padding:18px;">
<div style="color:#059669;font-weight:bold;margin-bottom:10px;">Your Responsibilities</div>
<ul style="margin:0;padding-left:18px;color:#475569;line-height:1.7;font-size:15px;">
<li>Arrive 10 minutes before the scheduled time</li>
<li>Clean the designated area thoroughly</li>
<li>Remind members when prayer time is approaching</li>
<li>Maintain order inside the mosque</li>
<li>Report any issues to PIC or admin</li>
</ul>
</div>
</td></tr>
{extra}
<tr><td style="padding:10px 30px 25px 30px;color:#1e293b;font-size:16px;">JazakAllah khair for your cooperation</td></tr>
<tr><td style="border-top:1px solid #e2e8f0;padding:20px 30px;color:#64748b;font-size:13px;text-align:center;">
<em>This is an automated reminder from Rohis Attendance System.</em>
</td></tr>
</table>
</body>
</html>"#
    )
}

fn build_reminder_text(day_name: &str, date_str: &str, additional_info: &str) -> String {
    let mut text = format!(
        "JADWAL PIKET REMINDER\n\
         Rohis Attendance System\n\n\
         {day_name} - {date_str}\n\n\
         Assalamu'alaikum,\n\n\
         This is a friendly reminder that you are scheduled for piket duty today ({day_name}).\n\n\
         YOUR RESPONSIBILITIES:\n\
         - Arrive 10 minutes before the scheduled time\n\
         - Clean the designated area thoroughly\n\
         - Ensure all tasks are completed before leaving\n\
         - Report any issues to your PIC or admin\n"
    );

    if !additional_info.is_empty() {
        text.push_str(&format!("\nADDITIONAL INFO:\n{additional_info}\n"));
    }

    text.push_str(
        "\nJazakAllah khair for your cooperation!\n\n---\nThis is an automated reminder from Rohis Attendance System.\n",
    );
    text
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{Mailer, SendError};
    use std::cell::RefCell;

    /// Mailer with a scripted outcome per recipient, recording every attempt.
    pub(crate) struct ScriptedMailer {
        pub auth_fail: bool,
        pub fail: Vec<String>,
        pub attempts: RefCell<Vec<String>>,
    }

    impl ScriptedMailer {
        pub fn delivering() -> Self {
            Self {
                auth_fail: false,
                fail: Vec::new(),
                attempts: RefCell::new(Vec::new()),
            }
        }

        pub fn failing_for(addresses: &[&str]) -> Self {
            Self {
                auth_fail: false,
                fail: addresses.iter().map(|a| a.to_string()).collect(),
                attempts: RefCell::new(Vec::new()),
            }
        }

        pub fn auth_failing() -> Self {
            Self {
                auth_fail: true,
                fail: Vec::new(),
                attempts: RefCell::new(Vec::new()),
            }
        }
    }

    impl Mailer for ScriptedMailer {
        async fn send(
            &self,
            recipient: &str,
            _subject: &str,
            _html_body: &str,
            _text_body: &str,
        ) -> Result<(), SendError> {
            self.attempts.borrow_mut().push(recipient.to_string());
            if self.auth_fail {
                return Err(SendError::Auth("credentials rejected".to_string()));
            }
            if self.fail.iter().any(|f| f == recipient) {
                return Err(SendError::Delivery("mailbox unavailable".to_string()));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedMailer;
    use super::*;

    fn recipients(addresses: &[&str]) -> Vec<String> {
        addresses.iter().map(|a| a.to_string()).collect()
    }

    #[actix_web::test]
    async fn all_deliveries_succeed() {
        let mailer = ScriptedMailer::delivering();
        let to = recipients(&["a@x.id", "b@x.id"]);

        let report = send_piket_reminder(&mailer, &to, "Monday", "08 February 2026", "").await;

        assert!(report.success);
        assert!(report.failed_emails.is_empty());
        assert_eq!(mailer.attempts.borrow().len(), 2);
    }

    #[actix_web::test]
    async fn per_recipient_failure_does_not_abort_the_rest() {
        let mailer = ScriptedMailer::failing_for(&["b@x.id"]);
        let to = recipients(&["a@x.id", "b@x.id", "c@x.id"]);

        let report = send_piket_reminder(&mailer, &to, "Monday", "08 February 2026", "").await;

        assert!(report.success);
        assert_eq!(report.failed_emails, vec!["b@x.id".to_string()]);
        // every recipient was still attempted
        assert_eq!(mailer.attempts.borrow().len(), 3);
    }

    #[actix_web::test]
    async fn auth_failure_is_terminal_for_the_batch() {
        let mailer = ScriptedMailer::auth_failing();
        let to = recipients(&["a@x.id", "b@x.id", "c@x.id"]);

        let report = send_piket_reminder(&mailer, &to, "Monday", "08 February 2026", "").await;

        assert!(!report.success);
        assert_eq!(report.failed_emails, to);
        // the loop stopped at the first attempt
        assert_eq!(mailer.attempts.borrow().len(), 1);
    }

    #[actix_web::test]
    async fn empty_recipient_list_is_rejected() {
        let mailer = ScriptedMailer::delivering();

        let report = send_piket_reminder(&mailer, &[], "Monday", "08 February 2026", "").await;

        assert!(!report.success);
        assert!(mailer.attempts.borrow().is_empty());
    }

    #[test]
    fn additional_info_lands_in_both_bodies() {
        let html = build_reminder_html("Monday", "08 February 2026", "TEST note");
        let text = build_reminder_text("Monday", "08 February 2026", "TEST note");
        assert!(html.contains("TEST note"));
        assert!(text.contains("TEST note"));
    }
}
