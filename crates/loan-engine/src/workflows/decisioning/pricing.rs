use super::domain::{DecisionRequest, EmploymentType, LoanPurpose};
use super::policy::DecisionPolicy;
use super::risk::RiskAssessment;

pub(crate) fn base_rate(purpose: LoanPurpose) -> f64 {
    match purpose {
        LoanPurpose::Personal => 8.5,
        LoanPurpose::DebtConsolidation => 7.5,
        LoanPurpose::HomeImprovement => 7.0,
        LoanPurpose::Business => 9.0,
        LoanPurpose::Education => 6.5,
        LoanPurpose::Medical => 8.0,
        LoanPurpose::Vacation => 10.0,
        LoanPurpose::Other => 9.5,
    }
}

fn credit_adjustment(credit_score: u16) -> f64 {
    match credit_score {
        750.. => -1.5,
        700..=749 => -0.5,
        650..=699 => 0.0,
        600..=649 => 1.0,
        _ => 2.5,
    }
}

fn dti_adjustment(dti_ratio: f64) -> f64 {
    if dti_ratio <= 0.20 {
        -0.5
    } else if dti_ratio <= 0.35 {
        0.0
    } else if dti_ratio <= 0.40 {
        0.5
    } else {
        1.5
    }
}

fn employment_adjustment(employment: EmploymentType) -> f64 {
    match employment {
        EmploymentType::FullTime => 0.0,
        EmploymentType::Retired => 0.25,
        EmploymentType::PartTime => 0.5,
        EmploymentType::Contract => 1.0,
        EmploymentType::SelfEmployed => 1.5,
        EmploymentType::Unemployed => 5.0,
    }
}

/// Annual percentage rate offered for the request, before rounding is visible to callers.
pub(crate) fn interest_rate(
    request: &DecisionRequest,
    assessment: &RiskAssessment,
    rule_delta: f64,
    policy: &DecisionPolicy,
) -> f64 {
    let rate = base_rate(request.loan_purpose)
        + assessment.overall_score / 100.0 * 5.0
        + credit_adjustment(request.credit_score)
        + dti_adjustment(assessment.dti_ratio)
        + employment_adjustment(request.employment_type)
        + rule_delta;

    policy.bound_rate(rate)
}
