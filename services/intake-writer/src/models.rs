//! Request and response envelopes for the intake surface.

use chrono::{DateTime, NaiveDate, Utc};
use event_schema::ApplicationStatus;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A loan application submission. All fields are required; the PAN is
/// encrypted before anything is stored.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitApplication {
    pub pan_number: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub email: String,
    pub phone_number: String,
    /// Requested loan amount in INR.
    pub requested_amount: Decimal,
    /// Annual income in INR; scoring and decision rules derive monthly
    /// income from it.
    pub annual_income: Decimal,
    pub existing_loans_count: Option<i32>,
}

/// Returned on accepted submissions (202 at the HTTP surface).
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    pub application_id: Uuid,
    pub status: ApplicationStatus,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Status view for external observers polling the record. The PAN is
/// masked, never returned in full.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: Uuid,
    pub status: ApplicationStatus,
    pub pan_number_masked: String,
    pub first_name: String,
    pub last_name: String,
    pub requested_amount: Decimal,
    pub credit_score: Option<i32>,
    pub annual_income: Option<Decimal>,
    pub existing_loans_count: Option<i32>,
    pub decision_reason: Option<String>,
    pub max_approved_amount: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
