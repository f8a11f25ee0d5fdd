//! Typed Kafka payloads for the loan prequalification pipeline.
//!
//! Every bus message is a fixed-schema struct, serialized as JSON UTF-8 and
//! deserialized exactly once at the consumer edge. The message key is always
//! the application id as an ASCII string, so per-application ordering is
//! preserved by Kafka's per-key partitioning.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod topics {
    //! Topic names shared by producers and consumers.

    pub const LOAN_APPLICATIONS_SUBMITTED: &str = "loan_applications_submitted";
    pub const CREDIT_REPORTS_GENERATED: &str = "credit_reports_generated";

    /// Dead-letter topic for a source topic.
    pub fn dlq_topic(topic: &str) -> String {
        format!("{topic}_dlq")
    }
}

pub mod event_types {
    //! Event-type tags stored on outbox rows.

    pub const APPLICATION_SUBMITTED: &str = "APPLICATION_SUBMITTED";
    pub const CREDIT_REPORT_GENERATED: &str = "CREDIT_REPORT_GENERATED";
}

/// A domain event that travels through the outbox to a Kafka topic.
///
/// The aggregate id doubles as the partition key on every topic.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync {
    fn aggregate_id(&self) -> Uuid;
    fn event_type(&self) -> &'static str;
    fn topic(&self) -> &'static str;

    /// Partition key bytes (the aggregate id as an ASCII string).
    fn partition_key(&self) -> String {
        self.aggregate_id().to_string()
    }
}

/// Application lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "PRE_APPROVED")]
    PreApproved,
    #[serde(rename = "REJECTED")]
    Rejected,
    #[serde(rename = "MANUAL_REVIEW")]
    ManualReview,
}

impl ApplicationStatus {
    /// Whether the decision worker has rendered a final state. Terminal
    /// states are never revised.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "PENDING",
            ApplicationStatus::PreApproved => "PRE_APPROVED",
            ApplicationStatus::Rejected => "REJECTED",
            ApplicationStatus::ManualReview => "MANUAL_REVIEW",
        }
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ApplicationStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ApplicationStatus::Pending),
            "PRE_APPROVED" => Ok(ApplicationStatus::PreApproved),
            "REJECTED" => Ok(ApplicationStatus::Rejected),
            "MANUAL_REVIEW" => Ok(ApplicationStatus::ManualReview),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for ApplicationStatus {
    type Error = UnknownStatus;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown application status: {0}")]
pub struct UnknownStatus(pub String);

/// Published by the intake writer when a loan application is accepted.
///
/// The PAN travels encrypted and base64-encoded; the hash allows duplicate
/// correlation without decryption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationSubmitted {
    pub application_id: Uuid,
    pub pan_number_encrypted: String,
    pub pan_number_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub email: String,
    pub phone_number: String,
    /// Serialized as a JSON number, matching the wire protocol.
    #[serde(with = "rust_decimal::serde::float")]
    pub requested_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub annual_income: Decimal,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
}

impl DomainEvent for ApplicationSubmitted {
    fn aggregate_id(&self) -> Uuid {
        self.application_id
    }

    fn event_type(&self) -> &'static str {
        event_types::APPLICATION_SUBMITTED
    }

    fn topic(&self) -> &'static str {
        topics::LOAN_APPLICATIONS_SUBMITTED
    }
}

/// Published by the scoring worker once a CIBIL score is computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditReportGenerated {
    pub application_id: Uuid,
    /// Wire-safe (base64) encrypted PAN, re-encrypted with a fresh nonce.
    pub pan_number: String,
    pub applicant_name: String,
    pub cibil_score: i32,
    pub credit_report_generated_at: DateTime<Utc>,
}

impl DomainEvent for CreditReportGenerated {
    fn aggregate_id(&self) -> Uuid {
        self.application_id
    }

    fn event_type(&self) -> &'static str {
        event_types::CREDIT_REPORT_GENERATED
    }

    fn topic(&self) -> &'static str {
        topics::CREDIT_REPORTS_GENERATED
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn submitted() -> ApplicationSubmitted {
        ApplicationSubmitted {
            application_id: Uuid::new_v4(),
            pan_number_encrypted: "b64cipher".into(),
            pan_number_hash: "ab".repeat(32),
            first_name: "Rajesh".into(),
            last_name: "Kumar".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1985, 6, 15).unwrap(),
            email: "rajesh.kumar@example.com".into(),
            phone_number: "9876543210".into(),
            requested_amount: dec!(500000.00),
            annual_income: dec!(1200000.00),
            status: ApplicationStatus::Pending,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_submitted_wire_keys() {
        let value = serde_json::to_value(submitted()).unwrap();
        for key in [
            "application_id",
            "pan_number_encrypted",
            "pan_number_hash",
            "first_name",
            "last_name",
            "date_of_birth",
            "email",
            "phone_number",
            "requested_amount",
            "annual_income",
            "status",
            "created_at",
        ] {
            assert!(value.get(key).is_some(), "missing wire key {key}");
        }
        assert_eq!(value["status"], "PENDING");
        assert!(value["requested_amount"].is_number());
        assert!(value["annual_income"].is_number());
    }

    #[test]
    fn test_submitted_round_trip() {
        let event = submitted();
        let json = serde_json::to_string(&event).unwrap();
        let back: ApplicationSubmitted = serde_json::from_str(&json).unwrap();
        assert_eq!(back.application_id, event.application_id);
        assert_eq!(back.requested_amount, event.requested_amount);
        assert_eq!(back.date_of_birth, event.date_of_birth);
        assert_eq!(back.status, ApplicationStatus::Pending);
    }

    #[test]
    fn test_credit_report_round_trip() {
        let event = CreditReportGenerated {
            application_id: Uuid::new_v4(),
            pan_number: "b64cipher".into(),
            applicant_name: "Rajesh Kumar".into(),
            cibil_score: 790,
            credit_report_generated_at: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: CreditReportGenerated = serde_json::from_str(&json).unwrap();
        assert_eq!(back.cibil_score, 790);
        assert_eq!(back.topic(), topics::CREDIT_REPORTS_GENERATED);
        assert_eq!(back.partition_key(), event.application_id.to_string());
    }

    #[test]
    fn test_status_parse_and_display() {
        for status in [
            ApplicationStatus::Pending,
            ApplicationStatus::PreApproved,
            ApplicationStatus::Rejected,
            ApplicationStatus::ManualReview,
        ] {
            assert_eq!(status.as_str().parse::<ApplicationStatus>().unwrap(), status);
        }
        assert!("SHIPPED".parse::<ApplicationStatus>().is_err());
        assert!(ApplicationStatus::Rejected.is_terminal());
        assert!(!ApplicationStatus::Pending.is_terminal());
    }

    #[test]
    fn test_dlq_topic_name() {
        assert_eq!(
            topics::dlq_topic(topics::LOAN_APPLICATIONS_SUBMITTED),
            "loan_applications_submitted_dlq"
        );
    }
}
