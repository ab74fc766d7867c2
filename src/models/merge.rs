// Ethernet Bundle - Config Merge
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Field-by-field merge of partial updates into configuration records.
//!
//! A partial update carries `Some` for every field it wants to set. Merging
//! copies those values into the destination, leaves equal values untouched
//! and never clears a destination field the update does not mention. Applying
//! the same update twice yields the same record as applying it once.

/// Merge a partial value into `self`.
pub trait Merge<P: ?Sized> {
    /// Merge `patch` into `self` and return the names of the fields that changed.
    fn merge(&mut self, patch: &P) -> Vec<&'static str>;
}

/// Overwrite `dest` with `src` if `src` is present and differs.
///
/// Returns `true` if `dest` changed.
pub fn merge_field<T>(dest: &mut T, src: Option<&T>) -> bool
where
    T: PartialEq + Clone,
{
    match src {
        Some(value) if dest != value => {
            *dest = value.clone();
            true
        }
        _ => false,
    }
}

/// Like [`merge_field`] for destination fields that may be unset.
pub fn merge_optional<T>(dest: &mut Option<T>, src: Option<&T>) -> bool
where
    T: PartialEq + Clone,
{
    match src {
        Some(value) if dest.as_ref() != Some(value) => {
            *dest = Some(value.clone());
            true
        }
        _ => false,
    }
}

/// Collects the names of changed fields while merging.
#[derive(Debug, Default)]
pub struct ChangeSet(Vec<&'static str>);

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name` if `changed` is true.
    pub fn track(&mut self, name: &'static str, changed: bool) -> &mut Self {
        if changed {
            self.0.push(name);
        }
        self
    }

    pub fn into_fields(self) -> Vec<&'static str> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_field_overwrites_different_value() {
        let mut dest = String::from("192.168.31.36");
        assert!(merge_field(&mut dest, Some(&"192.168.31.37".to_string())));
        assert_eq!(dest, "192.168.31.37");
    }

    #[test]
    fn test_merge_field_equal_value_is_untouched() {
        let mut dest = true;
        assert!(!merge_field(&mut dest, Some(&true)));
        assert!(dest);
    }

    #[test]
    fn test_merge_field_absent_keeps_dest() {
        let mut dest = vec!["8.8.8.8".to_string()];
        assert!(!merge_field(&mut dest, None));
        assert_eq!(dest, vec!["8.8.8.8".to_string()]);
    }

    #[test]
    fn test_merge_optional_fills_and_keeps() {
        let mut dest: Option<String> = None;
        assert!(merge_optional(&mut dest, Some(&"255.255.255.0".to_string())));
        assert!(!merge_optional(&mut dest, None));
        assert_eq!(dest.as_deref(), Some("255.255.255.0"));
    }

    #[test]
    fn test_change_set_tracks_only_changes() {
        let mut changes = ChangeSet::new();
        changes.track("ip", true).track("enable", false).track("dns", true);
        assert_eq!(changes.into_fields(), vec!["ip", "dns"]);
    }
}
