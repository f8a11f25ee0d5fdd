//! Submission validation.

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::models::SubmitApplication;
use crate::IntakeError;

const MIN_AGE: i32 = 18;
const MAX_AGE: i32 = 100;

/// Maximum requested amount: 1 crore INR.
const MAX_REQUESTED_AMOUNT: i64 = 10_000_000;

pub fn validate_submission(request: &SubmitApplication) -> Result<(), IntakeError> {
    if !pan_crypto::is_valid_pan(&request.pan_number) {
        return Err(invalid(
            "pan_number must match AAAAA9999A (5 uppercase letters, 4 digits, 1 uppercase letter)",
        ));
    }

    if request.first_name.is_empty() || request.first_name.len() > 100 {
        return Err(invalid("first_name must be 1-100 characters"));
    }

    if request.last_name.is_empty() || request.last_name.len() > 100 {
        return Err(invalid("last_name must be 1-100 characters"));
    }

    validate_email(&request.email)?;
    validate_phone(&request.phone_number)?;
    validate_age(request.date_of_birth)?;

    if request.requested_amount <= Decimal::ZERO {
        return Err(invalid("requested_amount must be positive"));
    }

    if request.requested_amount > Decimal::from(MAX_REQUESTED_AMOUNT) {
        return Err(invalid("requested_amount exceeds the 1 crore limit"));
    }

    if request.annual_income < Decimal::ZERO {
        return Err(invalid("annual_income must not be negative"));
    }

    if request.existing_loans_count.is_some_and(|n| n < 0) {
        return Err(invalid("existing_loans_count must not be negative"));
    }

    Ok(())
}

fn validate_email(email: &str) -> Result<(), IntakeError> {
    let valid = email.len() <= 255
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if valid {
        Ok(())
    } else {
        Err(invalid("email is not a valid address"))
    }
}

fn validate_phone(phone: &str) -> Result<(), IntakeError> {
    if (10..=15).contains(&phone.len()) && phone.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(invalid("phone_number must be 10-15 digits"))
    }
}

fn validate_age(date_of_birth: NaiveDate) -> Result<(), IntakeError> {
    let today = Utc::now().date_naive();
    let mut age = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }

    if age < MIN_AGE {
        return Err(invalid("applicant must be at least 18 years old"));
    }
    if age > MAX_AGE {
        return Err(invalid("date_of_birth is not plausible"));
    }
    Ok(())
}

fn invalid(message: &str) -> IntakeError {
    IntakeError::Validation(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request() -> SubmitApplication {
        SubmitApplication {
            pan_number: "ABCDE1234F".into(),
            first_name: "Rajesh".into(),
            last_name: "Kumar".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1985, 6, 15).unwrap(),
            email: "rajesh.kumar@example.com".into(),
            phone_number: "9876543210".into(),
            requested_amount: dec!(500000.00),
            annual_income: dec!(1200000.00),
            existing_loans_count: None,
        }
    }

    #[test]
    fn test_valid_submission_passes() {
        assert!(validate_submission(&request()).is_ok());
    }

    #[test]
    fn test_bad_pan_rejected() {
        let mut r = request();
        r.pan_number = "abcde1234f".into();
        assert!(matches!(
            validate_submission(&r),
            Err(IntakeError::Validation(_))
        ));
    }

    #[test]
    fn test_bad_phone_rejected() {
        let mut r = request();
        r.phone_number = "98765-4321".into();
        assert!(validate_submission(&r).is_err());

        r.phone_number = "123".into();
        assert!(validate_submission(&r).is_err());
    }

    #[test]
    fn test_bad_email_rejected() {
        let mut r = request();
        r.email = "not-an-email".into();
        assert!(validate_submission(&r).is_err());
    }

    #[test]
    fn test_minor_rejected() {
        let mut r = request();
        let today = Utc::now().date_naive();
        r.date_of_birth = NaiveDate::from_ymd_opt(today.year() - 17, 1, 1).unwrap();
        assert!(validate_submission(&r).is_err());
    }

    #[test]
    fn test_amount_bounds() {
        let mut r = request();
        r.requested_amount = Decimal::ZERO;
        assert!(validate_submission(&r).is_err());

        r.requested_amount = dec!(10000001);
        assert!(validate_submission(&r).is_err());

        r.requested_amount = dec!(10000000);
        assert!(validate_submission(&r).is_ok());
    }

    #[test]
    fn test_negative_income_rejected() {
        let mut r = request();
        r.annual_income = dec!(-1);
        assert!(validate_submission(&r).is_err());
    }
}
