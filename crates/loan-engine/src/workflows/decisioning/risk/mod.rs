mod config;
mod scoring;

pub use config::{DtiThresholds, RiskModelConfig, RiskWeights};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{DecisionRequest, RiskCategory, RiskFactor};

/// Risk score per dimension, each on a 0–100 scale where higher means riskier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryScores {
    pub credit: f64,
    pub income: f64,
    pub debt: f64,
    pub employment: f64,
    #[serde(default)]
    pub collateral: f64,
}

impl CategoryScores {
    /// Weighted overall score, clamped to 0–100 and rounded to two decimals.
    pub fn overall(&self, weights: &RiskWeights) -> f64 {
        let raw = self.credit * weights.credit
            + self.income * weights.income
            + self.debt * weights.debt
            + self.employment * weights.employment
            + self.collateral * weights.collateral;
        let clamped = raw.clamp(0.0, 100.0);
        (clamped * 100.0).round() / 100.0
    }
}

/// Summary of the applicant's repayment track record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaymentHistory {
    pub on_time_payments: u32,
    pub late_payments: u32,
    pub defaults: u32,
    pub bankruptcies: u32,
    pub credit_age_months: u32,
    pub payment_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DtiBucket {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl DtiBucket {
    pub fn classify(dti_ratio: f64, thresholds: &DtiThresholds) -> Self {
        if dti_ratio < thresholds.excellent {
            DtiBucket::Excellent
        } else if dti_ratio < thresholds.good {
            DtiBucket::Good
        } else if dti_ratio < thresholds.fair {
            DtiBucket::Fair
        } else {
            DtiBucket::Poor
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            DtiBucket::Excellent => "excellent",
            DtiBucket::Good => "good",
            DtiBucket::Fair => "fair",
            DtiBucket::Poor => "poor",
        }
    }
}

/// Derived risk analysis for a single request. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub overall_score: f64,
    pub category_scores: CategoryScores,
    pub dti_ratio: f64,
    pub dti_bucket: DtiBucket,
    pub loan_to_income: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ltv_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit_utilization: Option<f64>,
    pub payment_history: PaymentHistory,
    pub credit_band: RiskCategory,
    pub risk_category: RiskCategory,
    pub risk_factors: Vec<RiskFactor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mitigating_factors: Vec<String>,
}

pub const MIN_CREDIT_SCORE: u16 = 300;
pub const MAX_CREDIT_SCORE: u16 = 850;

/// Place a credit score in its band: LOW 740–850, MEDIUM 670–739, HIGH 600–669,
/// CRITICAL 300–599. Scores outside 300–850 have no band.
pub fn credit_band(credit_score: u16) -> Option<RiskCategory> {
    match credit_score {
        740..=850 => Some(RiskCategory::Low),
        670..=739 => Some(RiskCategory::Medium),
        600..=669 => Some(RiskCategory::High),
        300..=599 => Some(RiskCategory::Critical),
        _ => None,
    }
}

/// Map an overall 0–100 score to a category: LOW [0,30], MEDIUM (30,60], HIGH (60,80],
/// CRITICAL (80,100].
pub fn categorize_risk(score: f64) -> RiskCategory {
    if score <= 30.0 {
        RiskCategory::Low
    } else if score <= 60.0 {
        RiskCategory::Medium
    } else if score <= 80.0 {
        RiskCategory::High
    } else {
        RiskCategory::Critical
    }
}

/// Stateless risk model parameterised by weights and DTI thresholds.
#[derive(Debug, Clone, Default)]
pub struct RiskModel {
    config: RiskModelConfig,
}

impl RiskModel {
    pub fn new(config: RiskModelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RiskModelConfig {
        &self.config
    }

    /// Assess a request that already passed validation.
    pub fn assess(&self, request: &DecisionRequest) -> RiskAssessment {
        let dti_ratio = request.dti_ratio();
        let dti_bucket = DtiBucket::classify(dti_ratio, &self.config.dti_thresholds);
        let loan_to_income = request.loan_to_income_ratio();
        let ltv_ratio = request
            .additional_number("collateral_value")
            .filter(|value| *value > 0.0)
            .map(|collateral| request.loan_amount / collateral);
        let credit_utilization = request.additional_number("credit_utilization");

        let clamped_score = request
            .credit_score
            .clamp(MIN_CREDIT_SCORE, MAX_CREDIT_SCORE);
        let credit_band = credit_band(clamped_score).unwrap_or(RiskCategory::Critical);

        let category_scores = CategoryScores {
            credit: scoring::credit_risk(clamped_score),
            income: scoring::income_risk(request, loan_to_income),
            debt: scoring::debt_risk(dti_bucket),
            employment: scoring::employment_risk(request.employment_type),
            collateral: scoring::collateral_risk(ltv_ratio),
        };
        let payment_history = scoring::payment_history(credit_band);

        let overall_score = category_scores.overall(&self.config.weights);
        let risk_category = categorize_risk(overall_score).max(credit_band);

        let signals = scoring::Signals {
            request,
            scores: &category_scores,
            dti_ratio,
            dti_bucket,
            loan_to_income,
            ltv_ratio,
            payment_history: &payment_history,
        };
        let risk_factors = scoring::risk_factors(&signals);
        let mitigating_factors = scoring::mitigating_factors(&signals);

        debug!(
            application_id = %request.application_id,
            overall_score,
            dti_ratio,
            risk_category = risk_category.label(),
            risk_factors = risk_factors.len(),
            "risk assessment completed"
        );

        RiskAssessment {
            overall_score,
            category_scores,
            dti_ratio,
            dti_bucket,
            loan_to_income,
            ltv_ratio,
            credit_utilization,
            payment_history,
            credit_band,
            risk_category,
            risk_factors,
            mitigating_factors,
        }
    }
}
