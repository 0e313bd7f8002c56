use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Duration;

use super::{HandlerRef, ResourceLimits, RouteDefinition, RouteKey, RouteTableError};

/// Logical API name for the ESS IRR evaluation endpoint.
pub const ESS_IRR_EVALUATION: &str = "essIrrEvaluation";
/// Logical API name for the simulation endpoint.
pub const RUN_SIMULATION: &str = "runSimulation";

/// Secret holding the datastore connection string.
pub const POSTGRES_URL: &str = "POSTGRES_URL";

const PYTHON_RUNTIME: &str = "python3.11";

/// One registry entry: a route definition under its API name and version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRoute {
    pub api: String,
    pub version: String,
    pub definition: RouteDefinition,
}

impl ApiRoute {
    pub fn new(api: impl Into<String>, version: impl Into<String>, definition: RouteDefinition) -> Self {
        Self {
            api: api.into(),
            version: version.into(),
            definition,
        }
    }
}

/// Static registry of the routes a gateway serves.
///
/// Entries keep registration order. Construction rejects any two entries with
/// the same `(method, path)` identity, so a `RouteTable` value is always safe
/// to register against a single gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    entries: Vec<ApiRoute>,
}

impl RouteTable {
    pub fn new(entries: Vec<ApiRoute>) -> Result<Self, RouteTableError> {
        let mut owners: HashMap<&RouteKey, &str> = HashMap::new();
        let mut apis: HashSet<(&str, &str)> = HashSet::new();

        for entry in &entries {
            if !apis.insert((entry.api.as_str(), entry.version.as_str())) {
                return Err(RouteTableError::DuplicateApi {
                    api: entry.api.clone(),
                    version: entry.version.clone(),
                });
            }
            if let Some(first) = owners.insert(&entry.definition.key, entry.api.as_str()) {
                return Err(RouteTableError::DuplicateRoute {
                    key: entry.definition.key.clone(),
                    first: first.to_string(),
                    second: entry.api.clone(),
                });
            }
        }

        Ok(Self { entries })
    }

    /// The compiled-in route table.
    pub fn standard() -> Result<Self, RouteTableError> {
        let ess_irr_evaluation = RouteDefinition::new(
            "POST /v1/ess-irr-evaluation".parse()?,
            HandlerRef {
                name: "ess-irr-evaluation".to_string(),
                runtime: PYTHON_RUNTIME.to_string(),
                entry_point: "./v1_lambda_ess_irr_evaluation/src/v1_lambda_ess_irr_evaluation/api.handler"
                    .to_string(),
                container: true,
            },
            ResourceLimits {
                timeout: Duration::from_secs(120),
                memory_mb: 512,
            },
        )
        .with_api_key()
        .with_secret(POSTGRES_URL, POSTGRES_URL);

        let run_simulation = RouteDefinition::new(
            "POST /v1/run-simulation".parse()?,
            HandlerRef {
                name: "run-simulation".to_string(),
                runtime: PYTHON_RUNTIME.to_string(),
                entry_point: "./v1_lambda_run_simulation/src/v1_lambda_run_simulation/api.handler"
                    .to_string(),
                container: true,
            },
            ResourceLimits {
                timeout: Duration::from_secs(120),
                memory_mb: 256,
            },
        )
        .with_api_key()
        .with_secret(POSTGRES_URL, POSTGRES_URL);

        Self::new(vec![
            ApiRoute::new(ESS_IRR_EVALUATION, "v1", ess_irr_evaluation),
            ApiRoute::new(RUN_SIMULATION, "v1", run_simulation),
        ])
    }

    /// All versions of `api`, in registration order.
    pub fn routes_for(&self, api: &str) -> Vec<&RouteDefinition> {
        self.entries
            .iter()
            .filter(|entry| entry.api == api)
            .map(|entry| &entry.definition)
            .collect()
    }

    pub fn get(&self, api: &str, version: &str) -> Option<&RouteDefinition> {
        self.entries
            .iter()
            .find(|entry| entry.api == api && entry.version == version)
            .map(|entry| &entry.definition)
    }

    /// Every route, in registration order.
    pub fn routes(&self) -> impl Iterator<Item = &RouteDefinition> {
        self.entries.iter().map(|entry| &entry.definition)
    }

    pub fn entries(&self) -> &[ApiRoute] {
        &self.entries
    }

    /// Distinct secret names referenced by any route.
    pub fn secret_names(&self) -> BTreeSet<&str> {
        self.routes().flat_map(|route| route.secret_names()).collect()
    }

    pub fn any_requires_api_key(&self) -> bool {
        self.routes().any(|route| route.requires_api_key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::HttpMethod;

    fn route(path: &str) -> RouteDefinition {
        RouteDefinition::new(
            RouteKey::new(HttpMethod::Post, path),
            HandlerRef {
                name: path.trim_start_matches('/').replace('/', "-"),
                runtime: PYTHON_RUNTIME.to_string(),
                entry_point: "api.handler".to_string(),
                container: false,
            },
            ResourceLimits {
                timeout: Duration::from_secs(30),
                memory_mb: 128,
            },
        )
    }

    #[test]
    fn test_standard_table_has_unique_identities() {
        let table = RouteTable::standard().unwrap();
        let keys: HashSet<&RouteKey> = table.routes().map(|r| &r.key).collect();
        assert_eq!(keys.len(), table.len());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_standard_table_contract() {
        let table = RouteTable::standard().unwrap();

        let ess = table.get(ESS_IRR_EVALUATION, "v1").unwrap();
        assert_eq!(ess.key.to_string(), "POST /v1/ess-irr-evaluation");
        assert_eq!(ess.limits.memory_mb, 512);
        assert!(ess.requires_api_key);

        let sim = table.get(RUN_SIMULATION, "v1").unwrap();
        assert_eq!(sim.limits.memory_mb, 256);
        assert_eq!(sim.limits.timeout, Duration::from_secs(120));

        assert!(table.any_requires_api_key());
        assert_eq!(table.secret_names(), BTreeSet::from([POSTGRES_URL]));
    }

    #[test]
    fn test_routes_keep_registration_order() {
        let table = RouteTable::new(vec![
            ApiRoute::new("b", "v1", route("/v1/b")),
            ApiRoute::new("a", "v1", route("/v1/a")),
            ApiRoute::new("b", "v2", route("/v2/b")),
        ])
        .unwrap();

        let paths: Vec<&str> = table.routes().map(|r| r.path()).collect();
        assert_eq!(paths, vec!["/v1/b", "/v1/a", "/v2/b"]);

        let b: Vec<&str> = table.routes_for("b").iter().map(|r| r.path()).collect();
        assert_eq!(b, vec!["/v1/b", "/v2/b"]);
        assert!(table.routes_for("missing").is_empty());
    }

    #[test]
    fn test_duplicate_identity_is_rejected() {
        let err = RouteTable::new(vec![
            ApiRoute::new("first", "v1", route("/v1/same")),
            ApiRoute::new("second", "v1", route("/v1/same")),
        ])
        .unwrap_err();

        assert_eq!(
            err,
            RouteTableError::DuplicateRoute {
                key: RouteKey::new(HttpMethod::Post, "/v1/same"),
                first: "first".to_string(),
                second: "second".to_string(),
            }
        );
    }

    #[test]
    fn test_duplicate_api_version_is_rejected() {
        let err = RouteTable::new(vec![
            ApiRoute::new("calc", "v1", route("/v1/a")),
            ApiRoute::new("calc", "v1", route("/v1/b")),
        ])
        .unwrap_err();
        assert!(matches!(err, RouteTableError::DuplicateApi { .. }));
    }
}
