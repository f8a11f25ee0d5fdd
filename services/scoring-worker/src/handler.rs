//! Scoring worker business logic, run inside the consumer transaction.

use async_trait::async_trait;
use chrono::Utc;
use event_schema::{ApplicationSubmitted, CreditReportGenerated};
use idempotent_consumer::{EventHandler, HandlerError};
use loan_store::audit::{self, AuditOperation};
use loan_store::model::NewOutboxEvent;
use loan_store::outbox;
use pan_crypto::PanCipher;
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use std::sync::Arc;
use tracing::info;

use crate::score::{cibil_score, LoanType};

pub const SERVICE_NAME: &str = "scoring-worker";

/// Consumes submitted applications and emits credit reports.
///
/// The outbound report is written as an outbox row inside the same
/// transaction as the idempotency record; no direct bus publish happens
/// here, so a crash between score and commit leaves nothing behind.
pub struct ScoringHandler {
    cipher: Arc<PanCipher>,
    output_topic: String,
}

impl ScoringHandler {
    pub fn new(cipher: Arc<PanCipher>, output_topic: impl Into<String>) -> Self {
        Self {
            cipher,
            output_topic: output_topic.into(),
        }
    }
}

#[async_trait]
impl EventHandler for ScoringHandler {
    type Event = ApplicationSubmitted;

    async fn handle(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        event: Self::Event,
    ) -> Result<(), HandlerError> {
        // A payload that cannot be decrypted will never succeed on
        // redelivery: the key is right (we are configured with it) and the
        // bytes are wrong
        let pan = self
            .cipher
            .decrypt_pan_from_wire(&event.pan_number_encrypted)
            .map_err(|e| HandlerError::Permanent(format!("PAN decryption failed: {e}")))?;

        audit::append_audit(
            &mut **tx,
            event.application_id,
            SERVICE_NAME,
            AuditOperation::Decrypt,
        )
        .await
        .map_err(HandlerError::from)?;

        let monthly_income = event.annual_income / Decimal::from(12);
        let score = cibil_score(event.application_id, &pan, monthly_income, LoanType::default());

        info!(
            application_id = %event.application_id,
            cibil_score = score,
            "CIBIL score calculated"
        );

        let report = CreditReportGenerated {
            application_id: event.application_id,
            pan_number: self
                .cipher
                .encrypt_pan_for_wire(&pan)
                .map_err(|e| HandlerError::Permanent(format!("PAN encryption failed: {e}")))?,
            applicant_name: format!("{} {}", event.first_name, event.last_name),
            cibil_score: score,
            credit_report_generated_at: Utc::now(),
        };

        let mut outbox_event = NewOutboxEvent::from_event(&report)
            .map_err(|e| HandlerError::Permanent(format!("report serialization failed: {e}")))?;
        outbox_event.topic_name = self.output_topic.clone();

        outbox::insert_outbox_event(tx, &outbox_event)
            .await
            .map_err(HandlerError::from)?;

        Ok(())
    }
}
