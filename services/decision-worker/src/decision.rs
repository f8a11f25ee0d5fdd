//! Decision rules for loan prequalification.
//!
//! Pure function of `(monthly_income, requested_amount, cibil_score)`;
//! reprocessing a redelivered report always renders the same decision.

use event_schema::ApplicationStatus;
use rust_decimal::Decimal;

pub const MINIMUM_CIBIL_SCORE: i32 = 650;

/// Amortization divisor: a 4-year term in months.
pub const LOAN_TERM_MONTHS: i64 = 48;

/// Outcome of the decision rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub status: ApplicationStatus,
    pub reason: String,
    pub max_approved_amount: Option<Decimal>,
}

/// Evaluate an application.
///
/// Rules:
/// 1. Score below 650 rejects outright.
/// 2. Score at or above 650 with monthly income strictly above
///    `requested_amount / 48` pre-approves; equality goes to manual
///    review.
/// 3. Either way the affordable ceiling is `monthly_income * 48`.
pub fn evaluate(
    monthly_income: Decimal,
    requested_amount: Decimal,
    cibil_score: i32,
) -> Decision {
    if cibil_score < MINIMUM_CIBIL_SCORE {
        return Decision {
            status: ApplicationStatus::Rejected,
            reason: format!(
                "CIBIL score {cibil_score} is below minimum threshold of {MINIMUM_CIBIL_SCORE}"
            ),
            max_approved_amount: None,
        };
    }

    let required_monthly_income = requested_amount / Decimal::from(LOAN_TERM_MONTHS);
    let max_approved_amount = (monthly_income * Decimal::from(LOAN_TERM_MONTHS)).round_dp(2);

    if monthly_income > required_monthly_income {
        Decision {
            status: ApplicationStatus::PreApproved,
            reason: format!(
                "CIBIL score {cibil_score} meets threshold and monthly income \u{20b9}{} exceeds required \u{20b9}{} for \u{20b9}{} loan",
                monthly_income.round_dp(2),
                required_monthly_income.round_dp(2),
                requested_amount.round_dp(2),
            ),
            max_approved_amount: Some(max_approved_amount),
        }
    } else {
        Decision {
            status: ApplicationStatus::ManualReview,
            reason: format!(
                "CIBIL score {cibil_score} meets threshold but monthly income \u{20b9}{} does not exceed required \u{20b9}{} for \u{20b9}{} loan",
                monthly_income.round_dp(2),
                required_monthly_income.round_dp(2),
                requested_amount.round_dp(2),
            ),
            max_approved_amount: Some(max_approved_amount),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_score_below_threshold_rejects() {
        let decision = evaluate(dec!(100000), dec!(500000), 649);
        assert_eq!(decision.status, ApplicationStatus::Rejected);
        assert_eq!(decision.max_approved_amount, None);
        assert!(decision.reason.contains("649"));
        assert!(decision.reason.contains("650"));
    }

    #[test]
    fn test_score_at_threshold_with_income_pre_approves() {
        // 500000 / 48 = 10416.67; monthly 100000 clears it
        let decision = evaluate(dec!(100000), dec!(500000), 650);
        assert_eq!(decision.status, ApplicationStatus::PreApproved);
        assert_eq!(decision.max_approved_amount, Some(dec!(4800000.00)));
    }

    #[test]
    fn test_income_equal_to_ratio_goes_to_manual_review() {
        // requested 480000 / 48 = exactly 10000: strict > fails
        let decision = evaluate(dec!(10000), dec!(480000), 700);
        assert_eq!(decision.status, ApplicationStatus::ManualReview);
        assert_eq!(decision.max_approved_amount, Some(dec!(480000.00)));
    }

    #[test]
    fn test_income_just_above_ratio_pre_approves() {
        let decision = evaluate(dec!(10000.01), dec!(480000), 700);
        assert_eq!(decision.status, ApplicationStatus::PreApproved);
    }

    #[test]
    fn test_insufficient_income_goes_to_manual_review() {
        let decision = evaluate(dec!(5000), dec!(500000), 720);
        assert_eq!(decision.status, ApplicationStatus::ManualReview);
        assert_eq!(decision.max_approved_amount, Some(dec!(240000.00)));
        assert!(decision.reason.contains("does not exceed"));
    }

    #[test]
    fn test_reason_carries_score_and_compared_figures() {
        let decision = evaluate(dec!(100000), dec!(500000), 790);
        assert!(decision.reason.contains("790"));
        assert!(decision.reason.contains("100000"));
        assert!(decision.reason.contains("10416.67"));
    }

    #[test]
    fn test_decision_is_deterministic() {
        let first = evaluate(dec!(42000), dec!(999999.99), 651);
        let second = evaluate(dec!(42000), dec!(999999.99), 651);
        assert_eq!(first, second);
    }
}
