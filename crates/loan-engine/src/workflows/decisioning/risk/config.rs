use serde::{Deserialize, Serialize};

/// Contribution of each category score to the overall 0–100 risk score.
///
/// The defaults sum to 1.0 so the overall score stays on the category scale:
/// credit 0.35, debt 0.25, income 0.20, employment 0.15, collateral 0.05.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskWeights {
    pub credit: f64,
    pub income: f64,
    pub debt: f64,
    pub employment: f64,
    pub collateral: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            credit: 0.35,
            income: 0.20,
            debt: 0.25,
            employment: 0.15,
            collateral: 0.05,
        }
    }
}

/// Exclusive upper bounds for the DTI buckets; anything at or above `fair` is poor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DtiThresholds {
    pub excellent: f64,
    pub good: f64,
    pub fair: f64,
}

impl Default for DtiThresholds {
    fn default() -> Self {
        Self {
            excellent: 0.20,
            good: 0.35,
            fair: 0.45,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskModelConfig {
    pub weights: RiskWeights,
    pub dti_thresholds: DtiThresholds,
}
