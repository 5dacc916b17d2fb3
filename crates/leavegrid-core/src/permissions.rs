use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A dotted permission code such as `vacation.approve`, stored trimmed and lowercase.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PermissionCode(String);

impl PermissionCode {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PermissionCode {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl From<PermissionCode> for String {
    fn from(value: PermissionCode) -> Self {
        value.0
    }
}

impl From<&str> for PermissionCode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet {
    codes: BTreeSet<PermissionCode>,
}

impl PermissionSet {
    pub fn new<I, C>(codes: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<PermissionCode>,
    {
        Self {
            codes: codes
                .into_iter()
                .map(Into::into)
                .filter(|code: &PermissionCode| !code.as_str().is_empty())
                .collect(),
        }
    }

    pub fn has(&self, code: &PermissionCode) -> bool {
        self.codes.contains(code)
    }

    pub fn has_any<'c>(&self, codes: impl IntoIterator<Item = &'c PermissionCode>) -> bool {
        codes.into_iter().any(|code| self.has(code))
    }

    /// Vacuously true for an empty query.
    pub fn has_all<'c>(&self, codes: impl IntoIterator<Item = &'c PermissionCode>) -> bool {
        codes.into_iter().all(|code| self.has(code))
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PermissionCode> {
        self.codes.iter()
    }
}

/// Role name to granted permissions. Role names are matched case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleTable {
    roles: BTreeMap<String, PermissionSet>,
}

impl RoleTable {
    pub fn from_config(raw: &BTreeMap<String, Vec<String>>) -> Self {
        let roles = raw
            .iter()
            .map(|(role, codes)| {
                (
                    role.trim().to_ascii_lowercase(),
                    PermissionSet::new(codes.iter().map(String::as_str)),
                )
            })
            .collect::<BTreeMap<_, _>>();
        debug!(roles = roles.len(), "built role table");
        Self { roles }
    }

    /// Unknown roles hold no permissions.
    pub fn permissions(&self, role: &str) -> PermissionSet {
        self.roles
            .get(&role.trim().to_ascii_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    pub fn role_names(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(String::as_str)
    }
}
