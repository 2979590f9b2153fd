use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};

use prescripto_core::export::{send_confirmation, SmsError, SmsOutcome};
use prescripto_core::models::ReminderSlots;
use prescripto_core::{
    build_summary, dispatch_slot, Database, ExtractedData, PrescriptionRecord, Reminder,
    ReminderSlot, SafetyAnalysis, SafetyPolicy, SmsSender, Summary,
};
use prescripto_llm::{build_simplification_prompt, parse_extraction_response, Language};

/// Headless CLI for prescription normalization, safety scoring and reminders
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize and score a raw model response
    Process {
        /// File holding the model response (fenced or bare JSON)
        file: PathBuf,

        /// Safety policy JSON (missing fields keep defaults)
        #[arg(long)]
        policy: Option<PathBuf>,

        /// Persist the record to this database
        #[arg(long)]
        db: Option<PathBuf>,

        /// Also emit a patient-instruction prompt in this language
        #[arg(long)]
        language: Option<String>,
    },

    /// Print the canonical label for a frequency
    Frequency {
        text: String,
    },

    /// List prescriptions awaiting verification
    Pending {
        #[arg(long)]
        db: PathBuf,
    },

    /// Confirm a pending prescription
    Confirm {
        #[arg(long)]
        db: PathBuf,

        session_id: String,

        /// Name of the verifying pharmacist
        #[arg(long = "by")]
        verified_by: String,
    },

    /// Reject a pending prescription
    Reject {
        #[arg(long)]
        db: PathBuf,

        session_id: String,
    },

    /// Schedule SMS reminders for a prescription
    Remind {
        #[arg(long)]
        db: PathBuf,

        session_id: String,

        /// E.164 phone number (e.g. +919876543210)
        #[arg(long)]
        phone: String,

        /// Comma-separated slots (morning,afternoon,night); derived when omitted
        #[arg(long)]
        slots: Option<String>,

        /// Days to keep sending (default 7)
        #[arg(long)]
        days: Option<u32>,
    },

    /// Send every reminder due in one slot
    Dispatch {
        #[arg(long)]
        db: PathBuf,

        /// morning, afternoon or night
        slot: String,

        /// Evaluate expiry at this RFC 3339 time instead of now
        #[arg(long)]
        at: Option<String>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
    extracted_data: ExtractedData,
    safety_analysis: SafetyAnalysis,
    summary: Summary,
    #[serde(skip_serializing_if = "Option::is_none")]
    simplification_prompt: Option<String>,
}

#[derive(Serialize)]
struct RemindOutput {
    #[serde(flatten)]
    reminder: Reminder,
    #[serde(flatten)]
    confirmation: SmsOutcome,
}

/// Sender that writes messages to the log instead of a provider.
#[derive(Default)]
struct LoggingSender {
    counter: AtomicUsize,
}

impl SmsSender for LoggingSender {
    fn send(&self, to: &str, body: &str) -> Result<String, SmsError> {
        let id = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        info!(to, id, "SMS (not sent)\n{}", body);
        Ok(format!("log-{}", id))
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging (stderr, so stdout stays machine-readable)
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Command::Process {
            file,
            policy,
            db,
            language,
        } => process(&file, policy.as_deref(), db.as_deref(), language.as_deref()),
        Command::Frequency { text } => {
            println!("{}", prescripto_core::normalizer::parse_frequency(&text));
            Ok(())
        }
        Command::Pending { db } => pending(&db),
        Command::Confirm {
            db,
            session_id,
            verified_by,
        } => transition(&db, &session_id, |record| record.confirm(verified_by)),
        Command::Reject { db, session_id } => {
            transition(&db, &session_id, |record| record.reject())
        }
        Command::Remind {
            db,
            session_id,
            phone,
            slots,
            days,
        } => remind(&db, &session_id, &phone, slots.as_deref(), days),
        Command::Dispatch { db, slot, at } => dispatch(&db, &slot, at.as_deref()),
    }
}

fn load_policy(path: Option<&Path>) -> Result<SafetyPolicy> {
    let Some(path) = path else {
        return Ok(SafetyPolicy::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading policy {}", path.display()))?;
    let policy = serde_json::from_str(&text)
        .with_context(|| format!("parsing policy {}", path.display()))?;
    debug!(?policy, "loaded safety policy");
    Ok(policy)
}

fn open_db(path: &Path) -> Result<Database> {
    Database::open(path).with_context(|| format!("opening database {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn process(
    file: &Path,
    policy: Option<&Path>,
    db: Option<&Path>,
    language: Option<&str>,
) -> Result<()> {
    let policy = load_policy(policy)?;
    let raw_text = std::fs::read_to_string(file)
        .with_context(|| format!("reading response {}", file.display()))?;

    let raw = parse_extraction_response(&raw_text).context("parsing model response")?;
    let record = PrescriptionRecord::from_extraction(raw_text, &raw, &policy);

    let simplification_prompt = language
        .map(|name| {
            let language =
                Language::parse(name).ok_or_else(|| anyhow!("unsupported language: {}", name))?;
            Ok::<_, anyhow::Error>(build_simplification_prompt(&record.extracted_data, language)?)
        })
        .transpose()?;

    let session_id = match db {
        Some(path) => {
            open_db(path)?.insert_prescription(&record)?;
            info!(session_id = %record.session_id, "stored for verification");
            Some(record.session_id.clone())
        }
        None => None,
    };

    let summary = build_summary(&record.extracted_data, &record.safety_analysis);
    print_json(&ProcessOutput {
        session_id,
        extracted_data: record.extracted_data,
        safety_analysis: record.safety_analysis,
        summary,
        simplification_prompt,
    })
}

fn pending(db: &Path) -> Result<()> {
    let db = open_db(db)?;
    for record in db.list_pending_review()? {
        let analysis = &record.safety_analysis;
        println!(
            "{}  {:>3}/100  {:<6}  v{}  {}",
            record.session_id,
            analysis.safety_score,
            analysis.overall_risk.as_str(),
            record.version,
            record.extracted_data.patient_name,
        );
    }
    Ok(())
}

fn transition(
    db: &Path,
    session_id: &str,
    change: impl FnOnce(&mut PrescriptionRecord) -> prescripto_core::models::RecordResult<()>,
) -> Result<()> {
    let db = open_db(db)?;
    let mut record = db
        .get_prescription(session_id)?
        .ok_or_else(|| anyhow!("prescription not found: {}", session_id))?;

    let expected = record.version;
    change(&mut record)?;
    db.update_prescription(&record, expected)?;

    info!(session_id, status = %record.status, version = record.version, "prescription updated");
    println!("{} {}", record.session_id, record.status);
    Ok(())
}

fn parse_slots(text: &str) -> Result<ReminderSlots> {
    let mut slots = ReminderSlots::default();
    for name in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match ReminderSlot::parse(name) {
            Some(ReminderSlot::Morning) => slots.morning = true,
            Some(ReminderSlot::Afternoon) => slots.afternoon = true,
            Some(ReminderSlot::Night) => slots.night = true,
            None => bail!("unknown reminder slot: {}", name),
        }
    }
    if slots.is_empty() {
        bail!("no reminder slots given");
    }
    Ok(slots)
}

fn remind(
    db: &Path,
    session_id: &str,
    phone: &str,
    slots: Option<&str>,
    days: Option<u32>,
) -> Result<()> {
    let slots = slots.map(parse_slots).transpose()?;
    let db = open_db(db)?;
    let record = db
        .get_prescription(session_id)?
        .ok_or_else(|| anyhow!("prescription not found: {}", session_id))?;

    let reminder = Reminder::for_prescription(&record, phone, slots, days, Utc::now())?;
    db.insert_reminder(&reminder)?;

    let confirmation = send_confirmation(&LoggingSender::default(), &reminder);
    print_json(&RemindOutput {
        reminder,
        confirmation,
    })
}

fn dispatch(db: &Path, slot: &str, at: Option<&str>) -> Result<()> {
    let slot = ReminderSlot::parse(slot).ok_or_else(|| anyhow!("unknown reminder slot: {}", slot))?;
    let now = match at {
        Some(at) => DateTime::parse_from_rfc3339(at)
            .with_context(|| format!("parsing --at {}", at))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let db = open_db(db)?;
    let report = dispatch_slot(&db, &LoggingSender::default(), slot, now)?;

    println!(
        "{}: {} reminders, {} sent, {} failed",
        slot, report.reminders, report.sent, report.failed
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_slots() {
        let slots = parse_slots("morning, night").unwrap();
        assert!(slots.morning && slots.night && !slots.afternoon);
        assert!(parse_slots("noon").is_err());
        assert!(parse_slots(",").is_err());
    }

    #[test]
    fn test_logging_sender_ids() {
        let sender = LoggingSender::default();
        assert_eq!(sender.send("+15550000000", "hi").unwrap(), "log-1");
        assert_eq!(sender.send("+15550000000", "hi").unwrap(), "log-2");
    }

    #[test]
    fn test_remind_output_carries_sms_status() {
        let json = r#"{"patientName": "Ravi", "medicines": [{"name": "Metformin", "dosage": "500", "frequency": "BD"}]}"#;
        let raw = prescripto_core::RawExtraction::from_json(json).unwrap();
        let record = PrescriptionRecord::from_extraction(json.into(), &raw, &SafetyPolicy::default());
        let reminder =
            Reminder::for_prescription(&record, "+919876543210", None, None, Utc::now()).unwrap();

        let confirmation = send_confirmation(&LoggingSender::default(), &reminder);
        let output = serde_json::to_value(RemindOutput { reminder, confirmation }).unwrap();

        assert_eq!(output["smsStatus"], "sent");
        assert_eq!(output["messageId"], "log-1");
        assert_eq!(output["patientName"], "Ravi");
        assert!(output.get("smsError").is_none());
    }

    #[test]
    fn test_default_policy_without_path() {
        assert_eq!(load_policy(None).unwrap(), SafetyPolicy::default());
    }
}
