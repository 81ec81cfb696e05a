use crate::error::Result;
use crate::model::{api::otp::Code, common::email::Email};

/// Log target for PINs written by [`LogMailer`]. Off unless explicitly enabled.
pub const PIN_LOG_TARGET: &str = "campus_ballot::pins";

/// Delivers voter PINs.
#[rocket::async_trait]
pub trait PinMailer: Send + Sync {
    async fn send_pin(&self, to: &Email, code: &Code) -> Result<()>;
}

/// Writes PINs to the [`PIN_LOG_TARGET`] log target, for development without a mail server.
pub struct LogMailer;

#[rocket::async_trait]
impl PinMailer for LogMailer {
    async fn send_pin(&self, to: &Email, code: &Code) -> Result<()> {
        log::debug!(target: PIN_LOG_TARGET, "PIN for {to}: {code}");
        Ok(())
    }
}

#[cfg(test)]
pub use outbox::Outbox;
