use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::reconcile::{CanonicalNameSet, Reconciliation};
use crate::strip::strip_code;
use crate::types::ObservedValue;

/// Value attached to one canonical region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionValue {
    pub canonical: String,

    /// Observed name the value came from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed: Option<String>,

    /// None when no observed value maps to this region
    pub value: Option<f64>,
}

/// Canonical regions with their values, plus the observed values that found no region
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinResult {
    pub regions: Vec<RegionValue>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dropped: Vec<ObservedValue>,
}

impl JoinResult {
    /// Number of canonical regions that received a value
    pub fn filled(&self) -> usize {
        self.regions.iter().filter(|r| r.value.is_some()).count()
    }
}

/// Attach observed values to canonical regions through the name mapping
pub fn attach_values(
    canonical: &CanonicalNameSet,
    reconciliation: &Reconciliation,
    observed: &[ObservedValue],
) -> JoinResult {
    let mut by_canonical: HashMap<&str, &ObservedValue> = HashMap::new();
    let mut dropped = Vec::new();

    for obs in observed {
        let stripped = strip_code(&obs.name);
        match reconciliation.mapping.get(stripped) {
            Some(target) => {
                if let Some(previous) = by_canonical.insert(target, obs) {
                    warn!(
                        canonical = target,
                        kept = %obs.name,
                        replaced = %previous.name,
                        "several observed rows for one region"
                    );
                }
            }
            None => dropped.push(obs.clone()),
        }
    }

    let regions = canonical
        .iter()
        .map(|name| {
            let hit = by_canonical.get(name);
            RegionValue {
                canonical: name.to_string(),
                observed: hit.map(|obs| obs.name.clone()),
                value: hit.and_then(|obs| obs.value),
            }
        })
        .collect();

    JoinResult { regions, dropped }
}
