//! NTFS-style folder permissions and their cascade rules
//!
//! Granting a permission also grants everything it implies; revoking one
//! also revokes everything that depends on it. Both directions are closed
//! over in a single call so an ACL never holds a half-applied cascade.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single permission bit on an access control entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    FullControl,
    Modify,
    ReadExecute,
    List,
    Read,
    Write,
}

impl Permission {
    /// Display order, strongest first
    pub const ALL: [Permission; 6] = [
        Permission::FullControl,
        Permission::Modify,
        Permission::ReadExecute,
        Permission::List,
        Permission::Read,
        Permission::Write,
    ];

    fn bit(self) -> u8 {
        1 << (self as u8)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Permission::FullControl => "Full Control",
            Permission::Modify => "Modify",
            Permission::ReadExecute => "Read & Execute",
            Permission::List => "List folder contents",
            Permission::Read => "Read",
            Permission::Write => "Write",
        }
    }

    /// Permissions granted alongside this one
    fn grants(self) -> &'static [Permission] {
        match self {
            Permission::FullControl => &[
                Permission::Modify,
                Permission::ReadExecute,
                Permission::List,
                Permission::Read,
                Permission::Write,
            ],
            Permission::Modify => &[
                Permission::ReadExecute,
                Permission::List,
                Permission::Read,
                Permission::Write,
            ],
            Permission::ReadExecute => &[Permission::List, Permission::Read],
            Permission::List => &[Permission::Read],
            Permission::Read | Permission::Write => &[],
        }
    }

    /// Permissions revoked alongside this one
    fn revokes(self) -> &'static [Permission] {
        match self {
            // Nothing is meaningful without Read
            Permission::Read => &Permission::ALL,
            Permission::ReadExecute | Permission::Write => {
                &[Permission::Modify, Permission::FullControl]
            }
            Permission::Modify => &[Permission::FullControl],
            Permission::FullControl | Permission::List => &[],
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "full control" | "full" | "fc" => Ok(Permission::FullControl),
            "modify" | "m" => Ok(Permission::Modify),
            "read & execute" | "read execute" | "rx" => Ok(Permission::ReadExecute),
            "list folder contents" | "list" => Ok(Permission::List),
            "read" | "r" => Ok(Permission::Read),
            "write" | "w" => Ok(Permission::Write),
            _ => Err(format!("unknown permission '{}'", s.trim())),
        }
    }
}

/// Compact set of permissions held by one ACL entry
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Permission>", into = "Vec<Permission>")]
pub struct PermissionSet(u8);

impl PermissionSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Permission::ALL.into_iter().collect()
    }

    pub fn contains(&self, permission: Permission) -> bool {
        self.0 & permission.bit() != 0
    }

    pub fn insert(&mut self, permission: Permission) {
        self.0 |= permission.bit();
    }

    pub fn remove(&mut self, permission: Permission) {
        self.0 &= !permission.bit();
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Held permissions in display order
    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        Permission::ALL.into_iter().filter(|p| self.contains(*p))
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        let mut set = PermissionSet::empty();
        for permission in iter {
            set.insert(permission);
        }
        set
    }
}

impl From<Vec<Permission>> for PermissionSet {
    fn from(permissions: Vec<Permission>) -> Self {
        permissions.into_iter().collect()
    }
}

impl From<PermissionSet> for Vec<Permission> {
    fn from(set: PermissionSet) -> Self {
        set.iter().collect()
    }
}

impl fmt::Debug for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("(none)");
        }
        let labels: Vec<&str> = self.iter().map(|p| p.label()).collect();
        f.write_str(&labels.join(", "))
    }
}

/// Grant or revoke `permission`, closing over the cascade rules
pub fn apply_permission_toggle(
    current: PermissionSet,
    permission: Permission,
    grant: bool,
) -> PermissionSet {
    let mut affected = PermissionSet::empty();
    let mut pending = vec![permission];

    while let Some(next) = pending.pop() {
        if affected.contains(next) {
            continue;
        }
        affected.insert(next);
        let cascade = if grant { next.grants() } else { next.revokes() };
        pending.extend(cascade.iter().copied());
    }

    if grant {
        PermissionSet(current.0 | affected.0)
    } else {
        PermissionSet(current.0 & !affected.0)
    }
}

/// Flip `permission`: grant it when absent, revoke it when held
pub fn toggle_permission(current: PermissionSet, permission: Permission) -> PermissionSet {
    apply_permission_toggle(current, permission, !current.contains(permission))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(permissions: &[Permission]) -> PermissionSet {
        permissions.iter().copied().collect()
    }

    #[test]
    fn test_full_control_grants_everything() {
        let result = apply_permission_toggle(PermissionSet::empty(), Permission::FullControl, true);
        assert_eq!(result, PermissionSet::all());
    }

    #[test]
    fn test_modify_grants_dependents_but_not_full_control() {
        let result = apply_permission_toggle(PermissionSet::empty(), Permission::Modify, true);
        assert_eq!(
            result,
            set(&[
                Permission::Modify,
                Permission::ReadExecute,
                Permission::List,
                Permission::Read,
                Permission::Write,
            ])
        );
    }

    #[test]
    fn test_list_grants_read() {
        let result = apply_permission_toggle(PermissionSet::empty(), Permission::List, true);
        assert_eq!(result, set(&[Permission::List, Permission::Read]));
    }

    #[test]
    fn test_revoking_read_clears_everything() {
        let result = apply_permission_toggle(PermissionSet::all(), Permission::Read, false);
        assert!(result.is_empty());
    }

    #[test]
    fn test_revoking_write_drops_modify_and_full_control() {
        let result = apply_permission_toggle(PermissionSet::all(), Permission::Write, false);
        assert_eq!(
            result,
            set(&[Permission::ReadExecute, Permission::List, Permission::Read])
        );
    }

    #[test]
    fn test_revoking_modify_keeps_lesser_permissions() {
        let result = apply_permission_toggle(PermissionSet::all(), Permission::Modify, false);
        assert!(!result.contains(Permission::FullControl));
        assert!(!result.contains(Permission::Modify));
        assert!(result.contains(Permission::Write));
        assert!(result.contains(Permission::ReadExecute));
    }

    #[test]
    fn test_toggle_flips_direction() {
        let granted = toggle_permission(PermissionSet::empty(), Permission::ReadExecute);
        assert_eq!(
            granted,
            set(&[Permission::ReadExecute, Permission::List, Permission::Read])
        );
        let revoked = toggle_permission(granted, Permission::ReadExecute);
        assert_eq!(revoked, set(&[Permission::List, Permission::Read]));
    }

    #[test]
    fn test_parse_accepts_labels_and_short_names() {
        assert_eq!("Read & Execute".parse(), Ok(Permission::ReadExecute));
        assert_eq!("full_control".parse(), Ok(Permission::FullControl));
        assert_eq!("List folder contents".parse(), Ok(Permission::List));
        assert!("delete".parse::<Permission>().is_err());
    }

    #[test]
    fn test_serde_as_permission_list() {
        let original = set(&[Permission::Read, Permission::List]);
        let json = serde_json::to_string(&original).unwrap();
        assert_eq!(json, r#"["list","read"]"#);
        let parsed: PermissionSet = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, original);
    }
}
