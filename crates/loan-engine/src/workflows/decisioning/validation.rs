use super::domain::DecisionRequest;
use super::policy::DecisionPolicy;
use super::risk::{MAX_CREDIT_SCORE, MIN_CREDIT_SCORE};

/// Reasons a decision request is rejected before any risk work happens.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RequestValidationError {
    #[error("application id is required")]
    MissingApplicationId,
    #[error("user id is required")]
    MissingUserId,
    #[error("loan amount {amount:.2} must lie within [{min:.2}, {max:.2}]")]
    LoanAmountOutOfRange { amount: f64, min: f64, max: f64 },
    #[error("annual income must be positive (found {0:.2})")]
    NonPositiveIncome(f64),
    #[error("{field} must not be negative (found {value:.2})")]
    NegativeAmount { field: &'static str, value: f64 },
    #[error("credit score {0} is outside 300-850")]
    CreditScoreOutOfRange(u16),
    #[error("requested term of {term} months must lie within [{min}, {max}]")]
    TermOutOfRange { term: u16, min: u16, max: u16 },
}

impl RequestValidationError {
    pub const fn code(&self) -> &'static str {
        match self {
            RequestValidationError::MissingApplicationId => "missing_application_id",
            RequestValidationError::MissingUserId => "missing_user_id",
            RequestValidationError::LoanAmountOutOfRange { .. } => "invalid_loan_amount",
            RequestValidationError::NonPositiveIncome(_) => "invalid_annual_income",
            RequestValidationError::NegativeAmount { .. } => "negative_amount",
            RequestValidationError::CreditScoreOutOfRange(_) => "invalid_credit_score",
            RequestValidationError::TermOutOfRange { .. } => "invalid_term",
        }
    }
}

/// Check a request against the structural limits of the policy.
pub fn validate_request(
    request: &DecisionRequest,
    policy: &DecisionPolicy,
) -> Result<(), RequestValidationError> {
    if request.application_id.0.trim().is_empty() {
        return Err(RequestValidationError::MissingApplicationId);
    }

    if request.user_id.0.trim().is_empty() {
        return Err(RequestValidationError::MissingUserId);
    }

    let amount = request.loan_amount;
    if !amount.is_finite()
        || amount <= 0.0
        || amount < policy.min_loan_amount
        || amount > policy.max_loan_amount
    {
        return Err(RequestValidationError::LoanAmountOutOfRange {
            amount,
            min: policy.min_loan_amount,
            max: policy.max_loan_amount,
        });
    }

    if !request.annual_income.is_finite() || request.annual_income <= 0.0 {
        return Err(RequestValidationError::NonPositiveIncome(
            request.annual_income,
        ));
    }

    for (field, value) in [
        ("monthly_income", request.monthly_income),
        ("monthly_debt", request.monthly_debt),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(RequestValidationError::NegativeAmount { field, value });
        }
    }

    if !(MIN_CREDIT_SCORE..=MAX_CREDIT_SCORE).contains(&request.credit_score) {
        return Err(RequestValidationError::CreditScoreOutOfRange(
            request.credit_score,
        ));
    }

    let term = request.requested_term;
    if term < policy.min_term_months || term > policy.max_term_months {
        return Err(RequestValidationError::TermOutOfRange {
            term,
            min: policy.min_term_months,
            max: policy.max_term_months,
        });
    }

    Ok(())
}
