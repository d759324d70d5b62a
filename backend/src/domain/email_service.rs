//! Transaction notification email.
//!
//! Notifications are best-effort: callers log send failures and carry on.
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Message, SmtpTransport, Transport};
use tracing::info;

use crate::config::EmailConfig;
use crate::domain::models::User;
use crate::domain::transaction_forms::format_amount;

/// HTML bodies for the notification emails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailTemplate {
    Deposit,
    Withdrawal,
    BookPurchase,
}

impl EmailTemplate {
    pub fn subject(self) -> &'static str {
        match self {
            EmailTemplate::Deposit => "Deposit Message",
            EmailTemplate::Withdrawal => "Withdrawal Message",
            EmailTemplate::BookPurchase => "Book Purchase Confirmation",
        }
    }

    pub fn render(self, user: &User, amount: f64) -> String {
        let name = escape_html(&user.display_name());
        let amount = format_amount(amount);
        let line = match self {
            EmailTemplate::Deposit => format!("{}$ was deposited to your account successfully.", amount),
            EmailTemplate::Withdrawal => format!("{}$ was withdrawn from your account.", amount),
            EmailTemplate::BookPurchase => format!(
                "Thank you for your purchase. {}$ was charged to your account and the book was added to your profile.",
                amount
            ),
        };

        format!(
            "<!DOCTYPE html>\n<html>\n<body>\n<p>Dear {},</p>\n<p>{}</p>\n<p>Best regards,<br>BookBank</p>\n</body>\n</html>\n",
            name, line
        )
    }
}

/// Escape text for inclusion in HTML
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[async_trait]
pub trait TransactionMailer: Send + Sync {
    /// Render `template` for `user` and `amount` and send it to the user's address
    async fn send_transaction_email(&self, user: &User, amount: f64, template: EmailTemplate) -> Result<()>;
}

/// Mailer that delivers through an SMTP relay with STARTTLS
pub struct SmtpMailer {
    from: Mailbox,
    transport: SmtpTransport,
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        info!(
            "📧 Initializing email service for SMTP server: {}:{}",
            config.smtp_server, config.smtp_port
        );

        let tls_params = TlsParameters::new(config.smtp_server.clone())
            .context("Failed to create TLS parameters")?;

        let transport = SmtpTransport::relay(&config.smtp_server)
            .context("Failed to create SMTP relay")?
            .port(config.smtp_port)
            .tls(Tls::Required(tls_params))
            .credentials(Credentials::new(config.username.clone(), config.password.clone()))
            .build();

        let from = config
            .from_email
            .parse::<Mailbox>()
            .context("Failed to parse from email")?;

        Ok(Self { from, transport })
    }
}

#[async_trait]
impl TransactionMailer for SmtpMailer {
    async fn send_transaction_email(&self, user: &User, amount: f64, template: EmailTemplate) -> Result<()> {
        let to = user
            .email
            .parse::<Mailbox>()
            .with_context(|| format!("Failed to parse recipient email for {}", user.username))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(template.subject())
            .header(ContentType::TEXT_HTML)
            .body(template.render(user, amount))
            .context("Failed to build email")?;

        // SmtpTransport is blocking
        let transport = self.transport.clone();
        tokio::task::spawn_blocking(move || transport.send(&email))
            .await
            .map_err(|e| anyhow!("Email task failed: {}", e))?
            .context("Failed to send email")?;

        info!("📧 {} sent to {}", template.subject(), user.email);
        Ok(())
    }
}

/// Used when email is disabled: the notification only goes to the log
pub struct LogMailer;

#[async_trait]
impl TransactionMailer for LogMailer {
    async fn send_transaction_email(&self, user: &User, amount: f64, template: EmailTemplate) -> Result<()> {
        info!(
            "📧 Email disabled, not sending '{}' ({}$) to {}",
            template.subject(),
            format_amount(amount),
            user.email
        );
        Ok(())
    }
}
