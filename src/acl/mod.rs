//! ACL specification parsing.
//!
//! A specification is a comma separated list of `scheme:id:permissions`
//! entries, e.g. `world:anyone:r,sasl:solr:cdrwa`. Permissions are single
//! letters combined into a bitmask.


use std::fmt;

use crate::AclError;

/// Permission bits, matching the coordination service's wire values
pub mod perms {
    pub const READ: u32 = 1;
    pub const WRITE: u32 = 1 << 1;
    pub const CREATE: u32 = 1 << 2;
    pub const DELETE: u32 = 1 << 3;
    pub const ADMIN: u32 = 1 << 4;
    pub const ALL: u32 = READ | WRITE | CREATE | DELETE | ADMIN;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Acl {
    pub scheme: String,
    pub id: String,
    pub perms: u32,
}

impl Acl {
    pub fn new(
        scheme: impl Into<String>,
        id: impl Into<String>,
        perms: u32,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            id: id.into(),
            perms,
        }
    }

    /// Every permission for any identity
    pub fn open_unsafe() -> Vec<Acl> {
        vec![Acl::new("world", "anyone", perms::ALL)]
    }

    pub fn allows(
        &self,
        perm: u32,
    ) -> bool {
        self.perms & perm == perm
    }
}

impl fmt::Display for Acl {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}:{}:{}", self.scheme, self.id, format_permissions(self.perms))
    }
}

/// Parses an ACL specification.
///
/// Blank input yields [`Acl::open_unsafe`]. Empty entries between commas are
/// skipped.
///
/// # Errors
/// - [`AclError::FieldCount`] if an entry does not have exactly 3 fields
/// - [`AclError::UnknownPermission`] for letters outside `rwcda`
pub fn parse_acls(spec: &str) -> std::result::Result<Vec<Acl>, AclError> {
    if spec.trim().is_empty() {
        return Ok(Acl::open_unsafe());
    }

    spec.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(parse_entry)
        .collect()
}

fn parse_entry(entry: &str) -> std::result::Result<Acl, AclError> {
    let parts: Vec<&str> = entry.split(':').collect();
    if parts.len() != 3 {
        return Err(AclError::FieldCount {
            entry: entry.to_string(),
            found: parts.len(),
        });
    }
    Ok(Acl::new(parts[0], parts[1], parse_permissions(parts[2])?))
}

/// Folds permission letters into a bitmask, case-insensitive
pub fn parse_permissions(permissions: &str) -> std::result::Result<u32, AclError> {
    permissions.chars().try_fold(0u32, |code, letter| {
        let bit = match letter.to_ascii_lowercase() {
            'r' => perms::READ,
            'w' => perms::WRITE,
            'c' => perms::CREATE,
            'd' => perms::DELETE,
            'a' => perms::ADMIN,
            _ => {
                return Err(AclError::UnknownPermission {
                    letter,
                    permissions: permissions.to_string(),
                })
            }
        };
        Ok(code | bit)
    })
}

/// Inverse of [`parse_permissions`], in `cdrwa` order
pub fn format_permissions(code: u32) -> String {
    [
        (perms::CREATE, 'c'),
        (perms::DELETE, 'd'),
        (perms::READ, 'r'),
        (perms::WRITE, 'w'),
        (perms::ADMIN, 'a'),
    ]
    .iter()
    .filter(|(bit, _)| code & bit != 0)
    .map(|(_, letter)| *letter)
    .collect()
}
