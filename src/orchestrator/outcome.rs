use serde::Serialize;

use super::UsagePlanAttachmentError;
use crate::stage::Stage;

/// Whether the throttling policy made it onto the deployed stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UsagePlanStatus {
    Attached { plan_id: String, name: String },
    Unthrottled { plan: String, reason: String },
}

/// Binding issued API keys to the usage plan is an operator action outside
/// this system. The run can only report that it is still owed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiKeyBinding {
    /// No deployed route requires an API key.
    NotRequired,
    /// Keys must still be bound to the usage plan by hand.
    PendingManual,
    /// The operator confirmed the keys are bound.
    Confirmed,
}

/// Externally observable result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionedResources {
    pub stage: Stage,
    pub bucket_identifier: String,
    pub gateway_url: String,
    pub usage_plan: UsagePlanStatus,
    pub api_key_binding: ApiKeyBinding,
}

impl ProvisionedResources {
    pub(crate) fn new(
        stage: Stage,
        bucket_identifier: String,
        gateway_url: String,
        usage_plan: UsagePlanStatus,
        requires_api_key: bool,
    ) -> Self {
        Self {
            stage,
            bucket_identifier,
            gateway_url,
            usage_plan,
            api_key_binding: if requires_api_key {
                ApiKeyBinding::PendingManual
            } else {
                ApiKeyBinding::NotRequired
            },
        }
    }

    /// Records that the operator bound the issued keys to the usage plan.
    pub fn confirm_api_key_binding(&mut self) {
        if self.api_key_binding == ApiKeyBinding::PendingManual {
            self.api_key_binding = ApiKeyBinding::Confirmed;
        }
    }

    pub fn is_throttled(&self) -> bool {
        matches!(self.usage_plan, UsagePlanStatus::Attached { .. })
    }

    /// True only once the usage plan is attached and any required API key
    /// binding has been confirmed. A fresh run never reports caller-ready when
    /// its routes require keys.
    pub fn is_caller_ready(&self) -> bool {
        self.is_throttled() && self.api_key_binding != ApiKeyBinding::PendingManual
    }

    /// Conditions that need operator attention.
    pub fn alerts(&self) -> Vec<String> {
        let mut alerts = Vec::new();
        if let UsagePlanStatus::Unthrottled { plan, reason } = &self.usage_plan {
            alerts.push(format!("usage plan '{plan}' not attached: {reason}"));
        }
        if self.api_key_binding == ApiKeyBinding::PendingManual {
            alerts.push("API keys must be bound to the usage plan manually".to_string());
        }
        alerts
    }
}

impl From<&UsagePlanAttachmentError> for UsagePlanStatus {
    fn from(err: &UsagePlanAttachmentError) -> Self {
        UsagePlanStatus::Unthrottled {
            plan: err.plan.clone(),
            reason: err.source.to_string(),
        }
    }
}
