//! Module paths and vertex addressing

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the first element of every module path
pub const ROOT_MODULE: &str = "root";

/// Location of a module in the configuration or state tree.
///
/// Always starts with [`ROOT_MODULE`]; `root.network` is the `network` child
/// of the root module.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ModulePath(Vec<String>);

impl ModulePath {
    /// The root module path
    pub fn root() -> Self {
        Self(vec![ROOT_MODULE.to_string()])
    }

    /// Build a path from its segments, rejecting anything not rooted at `root`
    pub fn from_segments<I, S>(segments: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        match segments.first() {
            Some(first) if first == ROOT_MODULE && segments.iter().all(|s| !s.is_empty()) => {
                Some(Self(segments))
            }
            _ => None,
        }
    }

    /// Path of a direct child module
    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.to_string());
        Self(segments)
    }

    /// Parent module path, `None` for the root
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    /// Name of the module itself (last segment)
    pub fn name(&self) -> &str {
        self.0.last().map_or(ROOT_MODULE, String::as_str)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Nesting depth, zero for the root
    pub fn depth(&self) -> usize {
        self.0.len() - 1
    }

    /// True if `self` is `other` or nested below it
    pub fn starts_with(&self, other: &ModulePath) -> bool {
        self.0.starts_with(&other.0)
    }

    /// True if `self` is a direct child of `other`
    pub fn is_child_of(&self, other: &ModulePath) -> bool {
        self.0.len() == other.0.len() + 1 && self.starts_with(other)
    }

    /// Address prefix for names declared in this module.
    ///
    /// Empty for the root, `module.network.` for `root.network`.
    pub fn address_prefix(&self) -> String {
        self.0[1..]
            .iter()
            .map(|name| format!("module.{name}."))
            .collect()
    }

    /// Fully qualified address of a name declared in this module
    pub fn qualify(&self, name: &str) -> String {
        format!("{}{}", self.address_prefix(), name)
    }

    /// Address of the module vertex representing this module.
    ///
    /// The root module has no vertex; its address is `root`.
    pub fn module_address(&self) -> String {
        match self.parent() {
            Some(parent) => parent.qualify(&format!("module.{}", self.name())),
            None => ROOT_MODULE.to_string(),
        }
    }
}

impl Default for ModulePath {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl TryFrom<Vec<String>> for ModulePath {
    type Error = String;

    fn try_from(segments: Vec<String>) -> Result<Self, Self::Error> {
        let display = segments.join(".");
        Self::from_segments(segments)
            .ok_or_else(|| format!("module path must start with '{ROOT_MODULE}': {display:?}"))
    }
}

impl From<ModulePath> for Vec<String> {
    fn from(path: ModulePath) -> Self {
        path.0
    }
}

/// Resource kind: text before the first `.` of a resource name
pub fn resource_kind(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}

/// Provider name: text before the first `_` of a resource kind
pub fn provider_name(kind: &str) -> &str {
    kind.split('_').next().unwrap_or(kind)
}
