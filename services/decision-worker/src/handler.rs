//! Decision worker business logic, run inside the consumer transaction.

use async_trait::async_trait;
use event_schema::CreditReportGenerated;
use idempotent_consumer::{EventHandler, HandlerError};
use loan_store::applications;
use loan_store::model::{DecisionApplied, DecisionUpdate};
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use tracing::{info, warn};

use crate::decision::evaluate;

pub const SERVICE_NAME: &str = "decision-worker";

/// Scores travel as plain integers; anything outside the CIBIL range is a
/// malformed report.
fn validate_score(cibil_score: i32) -> Result<(), HandlerError> {
    if (300..=900).contains(&cibil_score) {
        Ok(())
    } else {
        Err(HandlerError::Validation(format!(
            "cibil_score {cibil_score} outside the 300-900 range"
        )))
    }
}

/// Consumes credit reports and renders the terminal decision on the
/// application row under optimistic locking.
pub struct DecisionHandler {
    max_update_retries: u32,
}

impl DecisionHandler {
    pub fn new(max_update_retries: u32) -> Self {
        Self { max_update_retries }
    }
}

#[async_trait]
impl EventHandler for DecisionHandler {
    type Event = CreditReportGenerated;

    async fn handle(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        event: Self::Event,
    ) -> Result<(), HandlerError> {
        validate_score(event.cibil_score)?;

        let app = applications::select_application(&mut **tx, event.application_id)
            .await
            .map_err(HandlerError::from)?
            .ok_or_else(|| {
                HandlerError::Permanent(format!(
                    "application not found: {}",
                    event.application_id
                ))
            })?;

        if app.status.is_terminal() {
            // A previous delivery (or a concurrent instance) already
            // decided; terminal states are never revised
            info!(
                application_id = %event.application_id,
                status = %app.status,
                "Application already decided, nothing to do"
            );
            return Ok(());
        }

        let annual_income = app.annual_income.unwrap_or(Decimal::ZERO);
        let monthly_income = annual_income / Decimal::from(12);

        let decision = evaluate(monthly_income, app.requested_amount, event.cibil_score);

        info!(
            application_id = %event.application_id,
            cibil_score = event.cibil_score,
            status = %decision.status,
            "Decision rendered"
        );

        let update = DecisionUpdate {
            status: decision.status,
            credit_score: event.cibil_score,
            decision_reason: decision.reason,
            max_approved_amount: decision.max_approved_amount,
        };

        match applications::update_decision_with_retry(
            tx,
            event.application_id,
            &update,
            self.max_update_retries,
        )
        .await
        .map_err(HandlerError::from)?
        {
            DecisionApplied::Updated { new_version } => {
                info!(
                    application_id = %event.application_id,
                    version = new_version,
                    "Application updated"
                );
            }
            DecisionApplied::AlreadyDecided => {
                warn!(
                    application_id = %event.application_id,
                    "Lost the decision race to a concurrent writer"
                );
            }
        }

        Ok(())
    }
}
