use serde::{Deserialize, Serialize};

use super::risk::RiskModelConfig;

/// Business limits applied around the risk model and rule outcomes.
///
/// Passed to the service at construction; there is no process-wide mutable copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionPolicy {
    /// Scores below this floor default to DENY before rules run.
    pub min_credit_score: u16,
    /// DTI above this ratio routes credit-extending defaults to manual review.
    pub max_dti_ratio: f64,
    /// Annual income below this amount downgrades APPROVE to CONDITIONAL.
    pub min_annual_income: f64,
    pub min_loan_amount: f64,
    pub max_loan_amount: f64,
    pub min_term_months: u16,
    pub max_term_months: u16,
    pub approval_validity_days: u32,
    pub rate_floor: f64,
    pub rate_ceiling: f64,
    #[serde(default)]
    pub risk_model: RiskModelConfig,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            min_credit_score: 600,
            max_dti_ratio: 0.45,
            min_annual_income: 25_000.0,
            min_loan_amount: 1_000.0,
            max_loan_amount: 1_000_000.0,
            min_term_months: 12,
            max_term_months: 84,
            approval_validity_days: 30,
            rate_floor: 5.0,
            rate_ceiling: 25.0,
            risk_model: RiskModelConfig::default(),
        }
    }
}

impl DecisionPolicy {
    /// Clamp a priced rate into the configured band and round to two decimals.
    pub fn bound_rate(&self, rate: f64) -> f64 {
        let bounded = rate.clamp(self.rate_floor, self.rate_ceiling.max(self.rate_floor));
        (bounded * 100.0).round() / 100.0
    }
}
