use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::config::NotificationConfig;

use super::domain::{ApplicationRecord, RegistrationNumber, RegistrationStatus};

/// Outbound notification payload handed to the channels. Carries enough
/// applicant context for a transport adapter to render its template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub registration_number: RegistrationNumber,
    pub recipient_name: String,
    pub recipient_email: String,
    pub recipient_phone: String,
}

impl Notice {
    pub fn for_record(kind: NoticeKind, record: &ApplicationRecord) -> Self {
        Self {
            kind,
            registration_number: record.registration_number.clone(),
            recipient_name: record.personal.full_name.clone(),
            recipient_email: record.personal.email.clone(),
            recipient_phone: record.personal.phone_number.clone(),
        }
    }

    pub fn template(&self) -> &'static str {
        match self.kind {
            NoticeKind::RegistrationReceived => "registration_received",
            NoticeKind::StatusChanged { .. } => "status_changed",
            NoticeKind::Reminder => "registration_reminder",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum NoticeKind {
    RegistrationReceived,
    StatusChanged {
        status: RegistrationStatus,
        notes: Option<String>,
    },
    Reminder,
}

/// Long-form channel (e-mail style transports).
pub trait MessageChannel: Send + Sync {
    fn deliver(&self, notice: &Notice) -> Result<(), NotificationError>;
}

/// Short-form channel (SMS style transports).
pub trait TextChannel: Send + Sync {
    fn deliver(&self, notice: &Notice) -> Result<(), NotificationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Outcome of one dispatch attempt, recorded on the application for
/// observability only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub message_sent: bool,
    pub text_sent: bool,
}

impl DispatchOutcome {
    pub fn any_sent(self) -> bool {
        self.message_sent || self.text_sent
    }
}

/// Fans a notice out to whichever channels were enabled at construction.
///
/// Channel enablement is decided exactly once, from configuration; a
/// disabled channel is simply absent here. Delivery failures are logged
/// and reported in the outcome but never propagate to the caller.
pub struct NotificationDispatcher {
    message: Option<Arc<dyn MessageChannel>>,
    text: Option<Arc<dyn TextChannel>>,
}

impl NotificationDispatcher {
    pub fn new(
        config: &NotificationConfig,
        message: Arc<dyn MessageChannel>,
        text: Arc<dyn TextChannel>,
    ) -> Self {
        Self {
            message: config.message.enabled.then_some(message),
            text: config.text.enabled.then_some(text),
        }
    }

    /// Dispatcher with every channel switched off.
    pub fn disabled() -> Self {
        Self {
            message: None,
            text: None,
        }
    }

    pub fn text_enabled(&self) -> bool {
        self.text.is_some()
    }

    /// Deliver on the text channel only. Reminder sweeps use this so a
    /// disabled transport silently skips instead of counting failures.
    pub fn dispatch_text(&self, notice: &Notice) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        if let Some(channel) = &self.text {
            match channel.deliver(notice) {
                Ok(()) => outcome.text_sent = true,
                Err(err) => warn!(
                    registration_number = %notice.registration_number,
                    template = notice.template(),
                    error = %err,
                    "text notification failed"
                ),
            }
        }
        outcome
    }

    pub fn dispatch(&self, notice: &Notice) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();

        if let Some(channel) = &self.message {
            match channel.deliver(notice) {
                Ok(()) => outcome.message_sent = true,
                Err(err) => warn!(
                    registration_number = %notice.registration_number,
                    template = notice.template(),
                    error = %err,
                    "message notification failed"
                ),
            }
        }

        if let Some(channel) = &self.text {
            match channel.deliver(notice) {
                Ok(()) => outcome.text_sent = true,
                Err(err) => warn!(
                    registration_number = %notice.registration_number,
                    template = notice.template(),
                    error = %err,
                    "text notification failed"
                ),
            }
        }

        outcome
    }
}
