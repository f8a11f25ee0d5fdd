//! Application submission and status reads.

use chrono::Utc;
use event_schema::{ApplicationStatus, ApplicationSubmitted};
use loan_store::audit::{self, AuditOperation};
use loan_store::model::{NewApplication, NewOutboxEvent};
use loan_store::{applications, outbox, StoreError};
use pan_crypto::{mask_pan, pan_fingerprint, PanCipher};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::models::{ApplicationStatusView, SubmissionReceipt, SubmitApplication};
use crate::validators::validate_submission;
use crate::{IntakeError, IntakeResult};

pub const SERVICE_NAME: &str = "intake-writer";

/// Service layer for loan application intake.
///
/// `submit` is the single-transaction write path: application row, audit
/// entry, and outbox row commit together or not at all.
pub struct ApplicationService {
    pool: PgPool,
    cipher: Arc<PanCipher>,
}

impl ApplicationService {
    pub fn new(pool: PgPool, cipher: Arc<PanCipher>) -> Self {
        Self { pool, cipher }
    }

    /// Accept a new application.
    ///
    /// Duplicate PAN fingerprints are rejected synchronously; all
    /// asynchronous outcomes are observed through the row's status.
    pub async fn submit(&self, request: SubmitApplication) -> IntakeResult<SubmissionReceipt> {
        validate_submission(&request)?;

        let pan_encrypted = self.cipher.encrypt_pan(&request.pan_number)?;
        let pan_hash = pan_fingerprint(&request.pan_number);

        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;

        if applications::select_application_by_pan_hash(&mut *tx, &pan_hash)
            .await?
            .is_some()
        {
            return Err(IntakeError::DuplicatePan);
        }

        let application_id = Uuid::new_v4();
        let created_at = Utc::now();

        applications::insert_application(
            &mut tx,
            &NewApplication {
                application_id,
                pan_number_encrypted: pan_encrypted,
                pan_number_hash: pan_hash.clone(),
                first_name: request.first_name.clone(),
                last_name: request.last_name.clone(),
                date_of_birth: request.date_of_birth,
                email: request.email.clone(),
                phone_number: request.phone_number.clone(),
                requested_amount: request.requested_amount,
                annual_income: request.annual_income,
                existing_loans_count: request.existing_loans_count,
            },
        )
        .await?;

        audit::append_audit(&mut *tx, application_id, SERVICE_NAME, AuditOperation::Encrypt)
            .await?;

        // The outbox row carries the PAN re-encrypted for transport with
        // its own fresh nonce
        let event = ApplicationSubmitted {
            application_id,
            pan_number_encrypted: self.cipher.encrypt_pan_for_wire(&request.pan_number)?,
            pan_number_hash: pan_hash,
            first_name: request.first_name,
            last_name: request.last_name,
            date_of_birth: request.date_of_birth,
            email: request.email,
            phone_number: request.phone_number,
            requested_amount: request.requested_amount,
            annual_income: request.annual_income,
            status: ApplicationStatus::Pending,
            created_at,
        };
        outbox::insert_outbox_event(
            &mut tx,
            &NewOutboxEvent::from_event(&event).map_err(StoreError::from)?,
        )
        .await?;

        tx.commit().await.map_err(StoreError::from)?;

        info!(
            application_id = %application_id,
            requested_amount = %event.requested_amount,
            "Application accepted"
        );

        Ok(SubmissionReceipt {
            application_id,
            status: ApplicationStatus::Pending,
            message: "Application submitted successfully and is being processed".to_string(),
            created_at,
        })
    }

    /// Status view with masked PAN; every read appends a MASK audit entry.
    pub async fn status(&self, application_id: Uuid) -> IntakeResult<ApplicationStatusView> {
        let app = applications::select_application(&self.pool, application_id)
            .await?
            .ok_or(IntakeError::NotFound(application_id))?;

        let pan = self.cipher.decrypt_pan(&app.pan_number_encrypted)?;
        let pan_number_masked = mask_pan(&pan)?;

        audit::append_audit(&self.pool, application_id, SERVICE_NAME, AuditOperation::Mask)
            .await?;

        Ok(ApplicationStatusView {
            application_id: app.application_id,
            status: app.status,
            pan_number_masked,
            first_name: app.first_name,
            last_name: app.last_name,
            requested_amount: app.requested_amount,
            credit_score: app.credit_score,
            annual_income: app.annual_income,
            existing_loans_count: app.existing_loans_count,
            decision_reason: app.decision_reason,
            max_approved_amount: app.max_approved_amount,
            created_at: app.created_at,
            updated_at: app.updated_at,
        })
    }
}
