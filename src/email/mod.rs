//! Leave notification e-mails delivered through the Resend HTTP API.
//!
//! Sending happens on a spawned task; failures are logged and never reach the
//! request that triggered them.

pub mod templates;

use serde::Serialize;
use tracing::{error, info};

use crate::config::Config;
use templates::{LeaveEmailData, Rendered};

const RESEND_URL: &str = "https://api.resend.com/emails";

#[derive(Serialize)]
struct ResendMessage<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Clone)]
pub struct Mailer {
    http: reqwest::Client,
    api_key: Option<String>,
    from: String,
    company_name: String,
}

impl Mailer {
    pub fn new(config: &Config, http: reqwest::Client) -> Self {
        Self {
            http,
            api_key: config.resend_api_key.clone(),
            from: config.from_email.clone(),
            company_name: config.company_name.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn send(&self, to: &str, email: &Rendered, kind: &'static str) {
        let Some(api_key) = self.api_key.as_deref() else {
            info!(kind, "Resend not configured, skipping email");
            return;
        };

        let message = ResendMessage {
            from: &self.from,
            to: [to],
            subject: &email.subject,
            html: &email.html,
        };

        let result = self
            .http
            .post(RESEND_URL)
            .bearer_auth(api_key)
            .json(&message)
            .send()
            .await
            .and_then(|resp| resp.error_for_status());

        match result {
            Ok(_) => info!(kind, "Email sent"),
            Err(e) => error!(kind, error = %e, "Failed to send email"),
        }
    }

    fn dispatch(&self, to: String, email: Rendered, kind: &'static str) {
        if !self.is_configured() {
            info!(kind, "Resend not configured, skipping email");
            return;
        }

        let mailer = self.clone();
        actix_web::rt::spawn(async move {
            mailer.send(&to, &email, kind).await;
        });
    }

    /// Confirmation to the requester.
    pub fn leave_submitted(&self, data: &LeaveEmailData, manager_name: &str) {
        let email = templates::submitted(data, manager_name, &self.company_name);
        self.dispatch(data.to.clone(), email, "leave_submitted");
    }

    /// Approval request to the team owner.
    pub fn manager_notification(&self, manager_email: &str, data: &LeaveEmailData, request_id: u64) {
        let email = templates::manager_notification(data, request_id, &self.company_name);
        self.dispatch(manager_email.to_string(), email, "manager_notification");
    }

    pub fn leave_approved(&self, data: &LeaveEmailData, approved_by: &str) {
        let email = templates::approved(data, approved_by, &self.company_name);
        self.dispatch(data.to.clone(), email, "leave_approved");
    }

    pub fn leave_rejected(&self, data: &LeaveEmailData, rejected_by: &str, rejection_reason: &str) {
        let email = templates::rejected(data, rejected_by, rejection_reason, &self.company_name);
        self.dispatch(data.to.clone(), email, "leave_rejected");
    }
}
