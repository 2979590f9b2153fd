//! SMS reminder models.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::prescription::{PrescriptionRecord, PrescriptionStatus, RecordError, RecordResult};
use crate::normalizer::parse_frequency;

/// Reminders run this many days when the caller gives no duration.
pub const DEFAULT_REMINDER_DAYS: u32 = 7;

static E164: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[1-9]\d{1,14}$").expect("valid phone regex"));

/// Check an E.164 phone number (e.g. "+919876543210").
pub fn validate_phone_number(phone_number: &str) -> bool {
    E164.is_match(phone_number)
}

/// Time-of-day slot a reminder is sent in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderSlot {
    Morning,
    Afternoon,
    Night,
}

impl ReminderSlot {
    pub const ALL: [ReminderSlot; 3] = [
        ReminderSlot::Morning,
        ReminderSlot::Afternoon,
        ReminderSlot::Night,
    ];

    /// Local hour (24h) the slot fires at.
    pub fn send_hour(&self) -> u32 {
        match self {
            ReminderSlot::Morning => 8,
            ReminderSlot::Afternoon => 14,
            ReminderSlot::Night => 21,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderSlot::Morning => "morning",
            ReminderSlot::Afternoon => "afternoon",
            ReminderSlot::Night => "night",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "morning" => Some(ReminderSlot::Morning),
            "afternoon" => Some(ReminderSlot::Afternoon),
            "night" => Some(ReminderSlot::Night),
            _ => None,
        }
    }
}

impl fmt::Display for ReminderSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which slots a reminder fires in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReminderSlots {
    pub morning: bool,
    pub afternoon: bool,
    pub night: bool,
}

impl ReminderSlots {
    /// Morning and night, used when nothing else is known.
    pub fn default_schedule() -> Self {
        Self {
            morning: true,
            afternoon: false,
            night: true,
        }
    }

    /// Derive slots from a frequency (raw or canonical).
    ///
    /// Evening folds into night. As-needed, one-time and as-directed
    /// schedules have no fixed slot.
    pub fn from_frequency(frequency: &str) -> Self {
        let label = parse_frequency(frequency).to_lowercase();
        Self {
            morning: label.contains("morning"),
            afternoon: label.contains("afternoon"),
            night: label.contains("night") || label.contains("evening"),
        }
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            morning: self.morning || other.morning,
            afternoon: self.afternoon || other.afternoon,
            night: self.night || other.night,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.morning || self.afternoon || self.night)
    }

    pub fn contains(&self, slot: ReminderSlot) -> bool {
        match slot {
            ReminderSlot::Morning => self.morning,
            ReminderSlot::Afternoon => self.afternoon,
            ReminderSlot::Night => self.night,
        }
    }
}

/// Medicine details carried by a reminder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderMedicine {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub timing: String,
}

/// A scheduled SMS reminder for one prescription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub reminder_id: String,
    pub session_id: String,
    pub patient_name: String,
    /// E.164 format
    pub phone_number: String,
    pub medicines: Vec<ReminderMedicine>,
    pub slots: ReminderSlots,
    pub is_active: bool,
    pub start_date: String,
    pub end_date: String,
}

impl Reminder {
    /// Build a reminder for a prescription.
    ///
    /// Explicit `slots` win; otherwise slots come from the medicines'
    /// frequencies, falling back to morning and night. A missing or zero
    /// duration means [`DEFAULT_REMINDER_DAYS`].
    pub fn for_prescription(
        record: &PrescriptionRecord,
        phone_number: &str,
        slots: Option<ReminderSlots>,
        duration_days: Option<u32>,
        now: DateTime<Utc>,
    ) -> RecordResult<Self> {
        if record.status == PrescriptionStatus::Rejected {
            return Err(RecordError::InvalidTransition {
                action: "schedule reminders for",
                status: record.status,
            });
        }
        if !validate_phone_number(phone_number) {
            return Err(RecordError::InvalidPhoneNumber(phone_number.to_string()));
        }

        let medicines = &record.extracted_data.medicines;
        let slots = slots.unwrap_or_else(|| {
            let derived = medicines
                .iter()
                .map(|m| ReminderSlots::from_frequency(&m.frequency))
                .fold(ReminderSlots::default(), ReminderSlots::union);
            if derived.is_empty() {
                ReminderSlots::default_schedule()
            } else {
                derived
            }
        });

        let days = duration_days
            .filter(|days| *days > 0)
            .unwrap_or(DEFAULT_REMINDER_DAYS);
        let end = Duration::try_days(i64::from(days))
            .and_then(|span| now.checked_add_signed(span))
            .ok_or(RecordError::InvalidDuration(days))?;

        Ok(Self {
            reminder_id: uuid::Uuid::new_v4().to_string(),
            session_id: record.session_id.clone(),
            patient_name: record.extracted_data.patient_name.clone(),
            phone_number: phone_number.to_string(),
            medicines: medicines
                .iter()
                .map(|m| ReminderMedicine {
                    name: m.name.clone(),
                    dosage: m.dosage.clone(),
                    frequency: m.frequency.clone(),
                    timing: m.timing.clone(),
                })
                .collect(),
            slots,
            is_active: true,
            start_date: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            end_date: end.to_rfc3339_opts(SecondsFormat::Secs, true),
        })
    }

    /// Whether this reminder should fire in `slot` at `now`.
    pub fn is_due(&self, slot: ReminderSlot, now: DateTime<Utc>) -> bool {
        let not_expired = DateTime::parse_from_rfc3339(&self.end_date)
            .map(|end| end.with_timezone(&Utc) >= now)
            .unwrap_or(false);
        self.is_active && self.slots.contains(slot) && not_expired
    }
}
