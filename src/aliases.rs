use serde::{Deserialize, Serialize};

/*
 * Known spellings that differ between the statistics office tables
 * ("Apellido, Artículo" order, bilingual names in the other order)
 * and the national boundary layer. Neither side is a substring of the
 * other, so the fuzzy pass cannot find these on its own.
 */
pub const DEFAULT_ALIASES: [(&str, &str); 8] = [
    ("Balears, Illes", "Illes Balears"),
    ("Coruña, A", "A Coruña"),
    ("Palmas, Las", "Las Palmas"),
    ("Rioja, La", "La Rioja"),
    ("Alicante/Alacant", "Alacant/Alicante"),
    ("Castellón/Castelló", "Castelló/Castellón"),
    ("Valencia/València", "València/Valencia"),
    ("Bizkaia", "Vizcaya/Bizkaia"),
];

/// Override entry: an observed (stripped) name and the canonical name it stands for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    pub observed: String,
    pub canonical: String,
}

impl Alias {
    pub fn new(observed: &str, canonical: &str) -> Self {
        Self {
            observed: observed.to_string(),
            canonical: canonical.to_string(),
        }
    }
}

/// Ordered override list consulted between the exact and fuzzy passes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    entries: Vec<Alias>,
}

impl AliasTable {
    /// Empty table (no overrides)
    pub fn new() -> Self {
        Self::default()
    }

    /// Table seeded with the built-in Spanish province variants
    pub fn spanish_provinces() -> Self {
        Self {
            entries: DEFAULT_ALIASES
                .iter()
                .map(|(observed, canonical)| Alias::new(observed, canonical))
                .collect(),
        }
    }

    /// Add an entry; a later entry for the same observed name replaces the earlier one
    pub fn push(&mut self, alias: Alias) {
        self.entries.retain(|a| a.observed != alias.observed);
        self.entries.push(alias);
    }

    pub fn extend<I: IntoIterator<Item = Alias>>(&mut self, aliases: I) {
        for alias in aliases {
            self.push(alias);
        }
    }

    /// Canonical target for an observed name, if one is listed
    pub fn lookup(&self, observed: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|a| a.observed == observed)
            .map(|a| a.canonical.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
