use std::collections::{BTreeSet, HashSet};

use tracing::{debug, info};

use crate::aliases::{Alias, AliasTable};
use crate::error::Error;
use crate::strip::strip_code;
use crate::types::{MatchKind, NameMapping, Result, Unresolved, UnresolvedReason};

/// Region names from the geometry source, unique and non-empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalNameSet {
    names: Vec<String>,
}

impl CanonicalNameSet {
    pub fn new(names: Vec<String>) -> Result<Self> {
        if names.is_empty() {
            return Err(Error::InvalidInput(
                "canonical name set is empty".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            // A blank name is a substring of every observed name
            if name.trim().is_empty() {
                return Err(Error::InvalidInput(
                    "canonical name set contains a blank name".to_string(),
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "duplicate canonical name: '{}'",
                    name
                )));
            }
        }

        Ok(Self { names })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|n| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}

/// Outcome of one reconciliation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub mapping: NameMapping,

    /// Observed names left out of the mapping, sorted by name
    pub unresolved: Vec<Unresolved>,

    /// Override entries that applied to an observed name but could not be used
    pub skipped_aliases: Vec<Alias>,
}

impl Reconciliation {
    pub fn unresolved_names(&self) -> BTreeSet<&str> {
        self.unresolved.iter().map(|u| u.name.as_str()).collect()
    }

    /// True when every observed name was mapped
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Maps observed region names onto a canonical name set
#[derive(Debug, Clone)]
pub struct Reconciler {
    aliases: AliasTable,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(AliasTable::spanish_provinces())
    }
}

impl Reconciler {
    pub fn new(aliases: AliasTable) -> Self {
        Self { aliases }
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Run the strip, exact, alias and fuzzy passes over the observed names
    pub fn reconcile<S: AsRef<str>>(
        &self,
        canonical: &CanonicalNameSet,
        observed: &[S],
    ) -> Reconciliation {
        // Strip pass, keeping the first occurrence of each stripped name
        let mut seen = HashSet::new();
        let mut stripped: Vec<&str> = Vec::with_capacity(observed.len());
        for raw in observed {
            let name = strip_code(raw.as_ref());
            if seen.insert(name) {
                stripped.push(name);
            }
        }

        let mut mapping = NameMapping::new();
        let mut unresolved = Vec::new();
        let mut claimed: HashSet<&str> = HashSet::new();
        let mut pending: Vec<&str> = Vec::new();

        // Exact pass
        for name in stripped {
            if name.is_empty() {
                unresolved.push(Unresolved::new(name, UnresolvedReason::Empty));
            } else if canonical.contains(name) {
                mapping.insert(name, name, MatchKind::Exact);
                claimed.insert(name);
            } else {
                pending.push(name);
            }
        }

        // Alias pass
        let mut skipped_aliases = Vec::new();
        let mut alias_hits: Vec<(&str, &str)> = Vec::new();
        for &name in &pending {
            let Some(target) = self.aliases.lookup(name) else {
                continue;
            };
            if canonical.contains(target) && !claimed.contains(target) {
                alias_hits.push((name, target));
            } else {
                debug!(observed = name, canonical = target, "alias target absent or already claimed");
                skipped_aliases.push(Alias::new(name, target));
            }
        }
        for (name, target) in alias_hits {
            mapping.insert(name, target, MatchKind::Alias);
            claimed.insert(target);
        }
        pending.retain(|name| !mapping.contains_key(name));

        // Fuzzy pass over canonical names nobody has claimed yet
        let available: Vec<&str> = canonical.iter().filter(|c| !claimed.contains(c)).collect();
        for name in pending {
            let candidates: Vec<&str> = available
                .iter()
                .copied()
                .filter(|c| c.contains(name) || name.contains(c))
                .collect();
            match candidates.as_slice() {
                [] => unresolved.push(Unresolved::new(name, UnresolvedReason::NoCandidate)),
                [single] => mapping.insert(name, single, MatchKind::Fuzzy),
                _ => unresolved.push(Unresolved::new(
                    name,
                    UnresolvedReason::Ambiguous {
                        candidates: candidates.iter().map(|c| c.to_string()).collect(),
                    },
                )),
            }
        }

        unresolved.sort_by(|a, b| a.name.cmp(&b.name));

        info!(
            exact = mapping.count_kind(MatchKind::Exact),
            alias = mapping.count_kind(MatchKind::Alias),
            fuzzy = mapping.count_kind(MatchKind::Fuzzy),
            unresolved = unresolved.len(),
            "reconciled region names"
        );
        for u in &unresolved {
            debug!(observed = %u.name, reason = ?u.reason, "unresolved region name");
        }

        Reconciliation {
            mapping,
            unresolved,
            skipped_aliases,
        }
    }
}

/// Reconcile with the built-in override list
pub fn reconcile<C: AsRef<str>, O: AsRef<str>>(
    canonical: &[C],
    observed: &[O],
) -> Result<Reconciliation> {
    let set = CanonicalNameSet::new(canonical.iter().map(|c| c.as_ref().to_string()).collect())?;
    Ok(Reconciler::default().reconcile(&set, observed))
}
