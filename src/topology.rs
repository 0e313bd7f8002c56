//! The fixed topology provisioned for every stage: one bucket, one gateway,
//! the route table, and one throttling usage plan.

use serde::Serialize;
use std::time::Duration;

use crate::stage::Stage;

/// Steady-state rate and burst capacity for a usage plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Throttle {
    pub rate_per_second: u32,
    pub burst: u32,
}

/// A named throttling policy attached to a deployed gateway stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsagePlan {
    pub name: String,
    pub throttle: Throttle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointType {
    Regional,
    Edge,
    Private,
}

/// Names and fixed settings shared by every stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub app_name: String,
    pub bucket_name: String,
    pub gateway_name: String,
    pub endpoint: EndpointType,
    pub access_log_retention: Duration,
    pub usage_plan: UsagePlan,
}

impl Topology {
    pub fn standard() -> Self {
        Self {
            app_name: "calc-backend".to_string(),
            bucket_name: "calc".to_string(),
            gateway_name: "CalcApiGateway".to_string(),
            endpoint: EndpointType::Regional,
            // two months
            access_log_retention: Duration::from_secs(60 * 24 * 60 * 60),
            usage_plan: UsagePlan {
                name: "calc-plan".to_string(),
                throttle: Throttle {
                    rate_per_second: 100,
                    burst: 100,
                },
            },
        }
    }

    /// Physical bucket name, scoped to the stage so stages never share storage.
    pub fn bucket_name_for(&self, stage: Stage) -> String {
        format!("{}-{}-{}", self.app_name, stage, self.bucket_name)
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::standard()
    }
}
