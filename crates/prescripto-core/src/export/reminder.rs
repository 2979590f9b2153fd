//! Reminder SMS composition and slot dispatch.
//!
//! The provider is abstracted behind [`SmsSender`]; this crate never talks to
//! a network service itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::{Database, DbResult};
use crate::models::{Reminder, ReminderMedicine, ReminderSlot};

/// Shown when a medicine has no timing.
pub const DEFAULT_TIMING_TEXT: &str = "As directed";

/// Errors reported by an SMS provider.
#[derive(Error, Debug)]
pub enum SmsError {
    #[error("Provider rejected message to {to}: {reason}")]
    Rejected { to: String, reason: String },

    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

/// Sends one text message and returns the provider's message ID.
pub trait SmsSender {
    fn send(&self, to: &str, body: &str) -> Result<String, SmsError>;
}

/// Outcome of one dispatch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchReport {
    /// Reminders that were due
    pub reminders: usize,
    /// Messages accepted by the provider
    pub sent: usize,
    /// Messages the provider refused
    pub failed: usize,
}

/// Compose the reminder text for one medicine.
pub fn compose_reminder_sms(medicine: &ReminderMedicine) -> String {
    let timing = match medicine.timing.trim() {
        "" => DEFAULT_TIMING_TEXT,
        timing => timing,
    };

    format!(
        "🏥 Prescripto Reminder\n\nTime to take your medicine:\n💊 {}\n⏰ {}\n🍽️ {}\n\nStay healthy! - Prescripto",
        medicine.name, medicine.frequency, timing
    )
}

/// Delivery status of a single message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmsStatus {
    Sent,
    Failed,
}

impl SmsStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SmsStatus::Sent => "sent",
            SmsStatus::Failed => "failed",
        }
    }
}

/// Result of sending the confirmation for a newly scheduled reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsOutcome {
    pub sms_status: SmsStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sms_error: Option<String>,
}

/// Compose the message sent once a reminder has been scheduled.
///
/// Uses the reminder layout with every medicine name on the medicine line.
pub fn compose_confirmation_sms(reminder: &Reminder) -> String {
    let names = reminder
        .medicines
        .iter()
        .map(|m| m.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    compose_reminder_sms(&ReminderMedicine {
        frequency: format!("You will receive reminders for: {}", names),
        timing: "Reminder set successfully".to_string(),
        name: names,
        dosage: String::new(),
    })
}

/// Tell the patient their reminder is set.
///
/// A provider failure is reported in the outcome; the reminder stays scheduled.
pub fn send_confirmation<S: SmsSender + ?Sized>(sender: &S, reminder: &Reminder) -> SmsOutcome {
    match sender.send(&reminder.phone_number, &compose_confirmation_sms(reminder)) {
        Ok(message_id) => {
            tracing::info!(
                reminder_id = %reminder.reminder_id,
                message_id = %message_id,
                "confirmation SMS sent"
            );
            SmsOutcome {
                sms_status: SmsStatus::Sent,
                message_id: Some(message_id),
                sms_error: None,
            }
        }
        Err(e) => {
            tracing::warn!(
                reminder_id = %reminder.reminder_id,
                error = %e,
                "confirmation SMS failed"
            );
            SmsOutcome {
                sms_status: SmsStatus::Failed,
                message_id: None,
                sms_error: Some(e.to_string()),
            }
        }
    }
}

/// Send one message per medicine for every reminder due in `slot`.
///
/// Provider failures are logged and counted; they never abort the run.
pub fn dispatch_slot<S: SmsSender + ?Sized>(
    db: &Database,
    sender: &S,
    slot: ReminderSlot,
    now: DateTime<Utc>,
) -> DbResult<DispatchReport> {
    let due = db.list_due_reminders(slot, now)?;
    tracing::info!(slot = %slot, reminders = due.len(), "dispatching reminders");

    let mut report = DispatchReport {
        reminders: due.len(),
        ..Default::default()
    };

    for reminder in &due {
        for medicine in &reminder.medicines {
            match sender.send(&reminder.phone_number, &compose_reminder_sms(medicine)) {
                Ok(message_id) => {
                    tracing::debug!(
                        reminder_id = %reminder.reminder_id,
                        message_id = %message_id,
                        "reminder sent"
                    );
                    report.sent += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        reminder_id = %reminder.reminder_id,
                        medicine = %medicine.name,
                        error = %e,
                        "reminder SMS failed"
                    );
                    report.failed += 1;
                }
            }
        }
    }

    Ok(report)
}
