//! Allow-list of external module identifiers

use crate::error::PolicyError;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Modules allowed when nothing else is configured
pub const DEFAULT_ALLOWED: &[&str] = &["react", "react-dom", "lodash"];

/// Ordered set of exact module identifiers
///
/// Fixed at construction. Matching is exact: `lodash` does not admit
/// `lodash-es` or `lodash/debounce`; every alias or subpath must be listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct AllowList {
    modules: IndexSet<String>,
}

impl AllowList {
    /// Build from identifiers, keeping first-seen order
    ///
    /// # Errors
    /// Returns error for an empty identifier or one containing whitespace.
    pub fn new<I, S>(modules: I) -> Result<Self, PolicyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = IndexSet::new();
        for (index, module) in modules.into_iter().enumerate() {
            let module = module.into();
            if module.trim().is_empty() {
                return Err(PolicyError::EmptyIdentifier { index });
            }
            if module.chars().any(char::is_whitespace) {
                return Err(PolicyError::Config(format!(
                    "module identifier '{module}' contains whitespace"
                )));
            }
            set.insert(module);
        }
        Ok(Self { modules: set })
    }

    /// Exact-match membership
    #[inline]
    #[must_use]
    pub fn contains(&self, module: &str) -> bool {
        self.modules.contains(module)
    }

    /// Identifiers in configured order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(String::as_str)
    }

    /// Number of identifiers
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether nothing is allowed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl Default for AllowList {
    fn default() -> Self {
        Self {
            modules: DEFAULT_ALLOWED.iter().map(|m| (*m).to_string()).collect(),
        }
    }
}

impl TryFrom<Vec<String>> for AllowList {
    type Error = PolicyError;

    fn try_from(modules: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(modules)
    }
}

impl From<AllowList> for Vec<String> {
    fn from(list: AllowList) -> Self {
        list.modules.into_iter().collect()
    }
}

impl std::fmt::Display for AllowList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined: Vec<&str> = self.iter().collect();
        f.write_str(&joined.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_list() {
        let list = AllowList::default();
        assert_eq!(list.to_string(), "react, react-dom, lodash");
        assert!(list.contains("react-dom"));
    }

    #[test]
    fn exact_match_only() {
        let list = AllowList::new(["lodash"]).unwrap();
        assert!(list.contains("lodash"));
        assert!(!list.contains("lodash-es"));
        assert!(!list.contains("lodash/debounce"));
        assert!(!list.contains("Lodash"));
    }

    #[test]
    fn duplicates_collapse_in_first_seen_order() {
        let list = AllowList::new(["b", "a", "b"]).unwrap();
        assert_eq!(list.iter().collect::<Vec<_>>(), ["b", "a"]);
    }

    #[test]
    fn rejects_blank_entries() {
        assert_eq!(
            AllowList::new(["react", " "]),
            Err(PolicyError::EmptyIdentifier { index: 1 })
        );
        assert!(matches!(
            AllowList::new(["react dom"]),
            Err(PolicyError::Config(_))
        ));
    }
}
