//! Diff computation for resources

use crate::types::Attributes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// What applying a diff does to the real-world entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Nothing to do
    NoOp,
    /// Entity does not exist yet
    Create,
    /// Entity exists and some declared attributes differ
    Update,
    /// Entity must be removed
    Destroy,
}

impl Action {
    /// Symbol used when rendering plans
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::NoOp => " ",
            Self::Create => "+",
            Self::Update => "~",
            Self::Destroy => "-",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoOp => "no-op",
            Self::Create => "create",
            Self::Update => "update",
            Self::Destroy => "destroy",
        };
        f.write_str(name)
    }
}

/// Old and new value of one attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDiff {
    pub old: Option<String>,
    pub new: Option<String>,
}

/// Difference between declared and current attributes of one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff {
    pub action: Action,
    /// Attribute-level changes, keyed by attribute name
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeDiff>,
}

impl Diff {
    /// A diff with nothing to do
    pub fn empty() -> Self {
        Self {
            action: Action::NoOp,
            attributes: BTreeMap::new(),
        }
    }

    /// Compare declared attributes with the refreshed ones.
    ///
    /// Only declared attributes are compared; attributes that exist only in
    /// the current set (ids and other computed values) are left alone.
    pub fn compute(declared: &Attributes, current: Option<&Attributes>) -> Self {
        let Some(current) = current else {
            return Self {
                action: Action::Create,
                attributes: declared
                    .iter()
                    .map(|(k, v)| {
                        (
                            k.clone(),
                            AttributeDiff {
                                old: None,
                                new: Some(v.clone()),
                            },
                        )
                    })
                    .collect(),
            };
        };

        let attributes: BTreeMap<String, AttributeDiff> = declared
            .iter()
            .filter(|(k, v)| current.get(*k) != Some(*v))
            .map(|(k, v)| {
                (
                    k.clone(),
                    AttributeDiff {
                        old: current.get(k).cloned(),
                        new: Some(v.clone()),
                    },
                )
            })
            .collect();

        let action = if attributes.is_empty() {
            Action::NoOp
        } else {
            Action::Update
        };
        Self { action, attributes }
    }

    /// Diff that removes the entity, whatever its attributes are
    pub fn destroy(current: Option<&Attributes>) -> Self {
        Self {
            action: Action::Destroy,
            attributes: current
                .into_iter()
                .flatten()
                .map(|(k, v)| {
                    (
                        k.clone(),
                        AttributeDiff {
                            old: Some(v.clone()),
                            new: None,
                        },
                    )
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.action == Action::NoOp
    }

    pub fn is_destroy(&self) -> bool {
        self.action == Action::Destroy
    }

    /// Attributes after applying this diff on top of `current`.
    ///
    /// Convenience for providers whose apply is a pure attribute update.
    pub fn apply_to(&self, current: Option<&Attributes>) -> Attributes {
        if self.is_destroy() {
            return Attributes::new();
        }
        let mut result = current.cloned().unwrap_or_default();
        for (key, change) in &self.attributes {
            match &change.new {
                Some(value) => {
                    result.insert(key.clone(), value.clone());
                }
                None => {
                    result.remove(key);
                }
            }
        }
        result
    }
}

impl Default for Diff {
    fn default() -> Self {
        Self::empty()
    }
}

/// A planned or applied change to one addressable entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceChange {
    /// Fully qualified address (`module.network.aws_subnet.a`)
    pub address: String,
    pub diff: Diff,
}

impl ResourceChange {
    pub fn action(&self) -> Action {
        self.diff.action
    }
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Number of entities to create
    pub additions: usize,
    /// Number of entities to destroy
    pub removals: usize,
    /// Number of entities to update in place
    pub modifications: usize,
}

impl DiffSummary {
    /// Create a summary from a list of changes
    pub fn from_changes<'a, I>(changes: I) -> Self
    where
        I: IntoIterator<Item = &'a ResourceChange>,
    {
        let mut summary = Self::default();
        for change in changes {
            match change.action() {
                Action::Create => summary.additions += 1,
                Action::Destroy => summary.removals += 1,
                Action::Update => summary.modifications += 1,
                Action::NoOp => {}
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_compute_create_when_absent() {
        let diff = Diff::compute(&attrs(&[("ami", "ami-1")]), None);
        assert_eq!(diff.action, Action::Create);
        assert_eq!(diff.attributes["ami"].new.as_deref(), Some("ami-1"));

        // Creating with no declared attributes is still a change
        let diff = Diff::compute(&Attributes::new(), None);
        assert_eq!(diff.action, Action::Create);
        assert!(!diff.is_empty());
    }

    #[test]
    fn test_compute_ignores_computed_attributes() {
        let current = attrs(&[("ami", "ami-1"), ("id", "i-123")]);
        let diff = Diff::compute(&attrs(&[("ami", "ami-1")]), Some(&current));
        assert!(diff.is_empty());
    }

    #[test]
    fn test_compute_update() {
        let current = attrs(&[("ami", "ami-1"), ("id", "i-123")]);
        let diff = Diff::compute(&attrs(&[("ami", "ami-2")]), Some(&current));
        assert_eq!(diff.action, Action::Update);
        assert_eq!(diff.attributes["ami"].old.as_deref(), Some("ami-1"));

        let updated = diff.apply_to(Some(&current));
        assert_eq!(updated, attrs(&[("ami", "ami-2"), ("id", "i-123")]));
    }

    #[test]
    fn test_destroy_lists_old_values() {
        let current = attrs(&[("id", "i-123")]);
        let diff = Diff::destroy(Some(&current));
        assert!(diff.is_destroy());
        assert_eq!(diff.attributes["id"].new, None);
        assert!(diff.apply_to(Some(&current)).is_empty());
        assert!(Diff::destroy(None).is_destroy());
    }

    #[test]
    fn test_summary_counts_actions() {
        let changes = vec![
            ResourceChange {
                address: "a".into(),
                diff: Diff::compute(&Attributes::new(), None),
            },
            ResourceChange {
                address: "b".into(),
                diff: Diff::destroy(None),
            },
            ResourceChange {
                address: "c".into(),
                diff: Diff::empty(),
            },
        ];
        let summary = DiffSummary::from_changes(&changes);
        assert_eq!(summary.additions, 1);
        assert_eq!(summary.removals, 1);
        assert_eq!(summary.modifications, 0);
        assert_eq!(summary.total(), 2);
        assert!(summary.has_changes());
    }
}
