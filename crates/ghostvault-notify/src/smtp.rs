//! SMTP email sending

use crate::config::EmailConfig;
use crate::templates::NotificationMessage;
use crate::NotifyError;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// Send a notification to the owner address in `config`.
pub async fn send_email(
    config: &EmailConfig,
    notification: &NotificationMessage,
) -> Result<(), NotifyError> {
    send_email_to_recipient(config, &config.to_address, notification).await
}

/// Send a notification to an arbitrary recipient, reusing the owner's SMTP
/// account. Used for the heir notice.
pub async fn send_email_to_recipient(
    config: &EmailConfig,
    recipient_email: &str,
    notification: &NotificationMessage,
) -> Result<(), NotifyError> {
    let email = build_message(&config.from_address, recipient_email, notification)?;

    let mailer = build_async_transport(config)?;

    mailer
        .send(email)
        .await
        .map_err(|e| NotifyError::EmailFailed(format!("SMTP send failed: {}", e)))?;

    log::info!(
        "Email sent to {} (level: {:?})",
        recipient_email,
        notification.level
    );

    Ok(())
}

fn build_message(
    from: &str,
    to: &str,
    notification: &NotificationMessage,
) -> Result<Message, NotifyError> {
    Message::builder()
        .from(
            from.parse()
                .map_err(|e| NotifyError::EmailFailed(format!("Invalid from address: {}", e)))?,
        )
        .to(to
            .parse()
            .map_err(|e| NotifyError::EmailFailed(format!("Invalid to address: {}", e)))?)
        .subject(&notification.subject)
        .body(notification.body.clone())
        .map_err(|e| NotifyError::EmailFailed(format!("Failed to build email: {}", e)))
}

fn build_async_transport(
    config: &EmailConfig,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, NotifyError> {
    let creds = Credentials::new(config.smtp_user.clone(), config.smtp_password.clone());

    Ok(
        AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| NotifyError::EmailFailed(format!("SMTP relay error: {}", e)))?
            .credentials(creds)
            .port(config.smtp_port)
            .build(),
    )
}
