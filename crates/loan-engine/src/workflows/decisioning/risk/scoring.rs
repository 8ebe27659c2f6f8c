use super::super::domain::{
    DecisionRequest, EmploymentType, Impact, LoanPurpose, RiskCategory, RiskDimension, RiskFactor,
};
use super::{CategoryScores, DtiBucket, PaymentHistory, MAX_CREDIT_SCORE, MIN_CREDIT_SCORE};

pub(super) struct Signals<'a> {
    pub request: &'a DecisionRequest,
    pub scores: &'a CategoryScores,
    pub dti_ratio: f64,
    pub dti_bucket: DtiBucket,
    pub loan_to_income: f64,
    pub ltv_ratio: Option<f64>,
    pub payment_history: &'a PaymentHistory,
}

pub(super) fn credit_risk(credit_score: u16) -> f64 {
    let span = f64::from(MAX_CREDIT_SCORE - MIN_CREDIT_SCORE);
    let mut score = f64::from(MAX_CREDIT_SCORE - credit_score) / span * 100.0;

    if credit_score < 600 {
        score += 20.0;
    } else if credit_score < 650 {
        score += 10.0;
    }

    score.min(100.0)
}

pub(super) fn income_risk(request: &DecisionRequest, loan_to_income: f64) -> f64 {
    let mut score: f64 = match loan_to_income {
        ratio if ratio <= 0.5 => 10.0,
        ratio if ratio <= 1.0 => 30.0,
        ratio if ratio <= 2.0 => 60.0,
        ratio if ratio <= 3.0 => 80.0,
        _ => 100.0,
    };

    if request.annual_income < 30_000.0 {
        score += 20.0;
    } else if request.annual_income < 50_000.0 {
        score += 10.0;
    }

    let expected_monthly = request.annual_income / 12.0;
    if expected_monthly > 0.0
        && (expected_monthly - request.monthly_income).abs() / expected_monthly > 0.2
    {
        score += 15.0;
    }

    score.min(100.0)
}

pub(super) fn debt_risk(bucket: DtiBucket) -> f64 {
    match bucket {
        DtiBucket::Excellent => 10.0,
        DtiBucket::Good => 30.0,
        DtiBucket::Fair => 70.0,
        DtiBucket::Poor => 100.0,
    }
}

pub(super) fn employment_risk(employment: EmploymentType) -> f64 {
    match employment {
        EmploymentType::FullTime => 10.0,
        EmploymentType::Retired => 30.0,
        EmploymentType::PartTime => 40.0,
        EmploymentType::Contract => 50.0,
        EmploymentType::SelfEmployed => 70.0,
        EmploymentType::Unemployed => 100.0,
    }
}

pub(super) fn collateral_risk(ltv_ratio: Option<f64>) -> f64 {
    match ltv_ratio {
        None => 0.0,
        Some(ratio) if ratio <= 0.5 => 10.0,
        Some(ratio) if ratio <= 0.8 => 30.0,
        Some(ratio) if ratio <= 1.0 => 60.0,
        Some(_) => 90.0,
    }
}

/// Representative repayment record per credit band, used until bureau data is wired in.
pub(super) fn payment_history(band: RiskCategory) -> PaymentHistory {
    let (on_time, late, defaults, bankruptcies, age, score) = match band {
        RiskCategory::Low => (95, 2, 0, 0, 120, 0.95),
        RiskCategory::Medium => (85, 8, 0, 0, 84, 0.85),
        RiskCategory::High => (65, 20, 2, 0, 48, 0.60),
        RiskCategory::Critical => (50, 30, 5, 1, 36, 0.40),
    };

    PaymentHistory {
        on_time_payments: on_time,
        late_payments: late,
        defaults,
        bankruptcies,
        credit_age_months: age,
        payment_score: score,
    }
}

pub(super) fn risk_factors(signals: &Signals<'_>) -> Vec<RiskFactor> {
    let request = signals.request;
    let scores = signals.scores;
    let mut factors = Vec::new();

    if request.credit_score < 650 {
        factors.push(RiskFactor {
            category: RiskDimension::Credit,
            factor: "Low Credit Score".to_string(),
            impact: if request.credit_score < 600 {
                Impact::High
            } else {
                Impact::Medium
            },
            score: scores.credit,
            description: format!(
                "credit score of {} is below the optimal range",
                request.credit_score
            ),
        });
    }

    match signals.dti_bucket {
        DtiBucket::Fair | DtiBucket::Poor => factors.push(RiskFactor {
            category: RiskDimension::Debt,
            factor: "High Debt-to-Income Ratio".to_string(),
            impact: if signals.dti_bucket == DtiBucket::Poor {
                Impact::High
            } else {
                Impact::Medium
            },
            score: scores.debt,
            description: format!(
                "DTI ratio of {:.2} is {}",
                signals.dti_ratio,
                signals.dti_bucket.label()
            ),
        }),
        DtiBucket::Excellent | DtiBucket::Good => {}
    }

    if request.annual_income < 40_000.0 {
        factors.push(RiskFactor {
            category: RiskDimension::Income,
            factor: "Low Income".to_string(),
            impact: Impact::Medium,
            score: scores.income,
            description: format!(
                "annual income of {:.0} may limit repayment capacity",
                request.annual_income
            ),
        });
    }

    if signals.loan_to_income > 2.0 {
        factors.push(RiskFactor {
            category: RiskDimension::Income,
            factor: "High Loan-to-Income Ratio".to_string(),
            impact: Impact::High,
            score: signals.loan_to_income,
            description: format!(
                "loan amount is {:.1}x annual income",
                signals.loan_to_income
            ),
        });
    }

    match request.employment_type {
        EmploymentType::SelfEmployed => factors.push(RiskFactor {
            category: RiskDimension::Employment,
            factor: "Self-Employment".to_string(),
            impact: Impact::Medium,
            score: scores.employment,
            description: "self-employed income may be less stable".to_string(),
        }),
        EmploymentType::Contract => factors.push(RiskFactor {
            category: RiskDimension::Employment,
            factor: "Contract Employment".to_string(),
            impact: Impact::Medium,
            score: scores.employment,
            description: "contract employment may have limited duration".to_string(),
        }),
        EmploymentType::Unemployed => factors.push(RiskFactor {
            category: RiskDimension::Employment,
            factor: "No Employment Income".to_string(),
            impact: Impact::High,
            score: scores.employment,
            description: "applicant reports no current employment".to_string(),
        }),
        _ => {}
    }

    let payment_score = signals.payment_history.payment_score;
    if payment_score < 0.7 {
        factors.push(RiskFactor {
            category: RiskDimension::Credit,
            factor: "Poor Payment History".to_string(),
            impact: Impact::High,
            score: 1.0 - payment_score,
            description: format!("payment score of {payment_score:.2} indicates past payment issues"),
        });
    }

    if let Some(ltv) = signals.ltv_ratio.filter(|ltv| *ltv > 0.8) {
        factors.push(RiskFactor {
            category: RiskDimension::Collateral,
            factor: "High Loan-to-Value Ratio".to_string(),
            impact: if ltv > 1.0 { Impact::High } else { Impact::Medium },
            score: scores.collateral,
            description: format!("loan covers {:.0}% of collateral value", ltv * 100.0),
        });
    }

    factors
}

pub(super) fn mitigating_factors(signals: &Signals<'_>) -> Vec<String> {
    let request = signals.request;
    let mut factors = Vec::new();

    if request.credit_score >= 750 {
        factors.push("Excellent credit score demonstrates strong credit management".to_string());
    }
    if signals.dti_bucket == DtiBucket::Excellent {
        factors.push("Low debt-to-income ratio indicates strong debt management".to_string());
    }
    if request.annual_income >= 100_000.0 {
        factors.push("High income provides strong repayment capacity".to_string());
    }
    if request.employment_type == EmploymentType::FullTime {
        factors.push("Full-time employment provides income stability".to_string());
    }
    if signals.loan_to_income <= 0.5 {
        factors.push("Conservative loan amount relative to income".to_string());
    }
    if signals.payment_history.payment_score >= 0.9 {
        factors.push("Excellent payment history demonstrates reliability".to_string());
    }
    if request.loan_purpose == LoanPurpose::DebtConsolidation {
        factors.push("Debt consolidation may improve overall financial position".to_string());
    }

    factors
}
