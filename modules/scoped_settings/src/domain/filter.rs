//! Scope filter narrowing every storage operation

use crate::contract::{OwnerRef, SettingsError, DEFAULT_GROUP};
use std::collections::BTreeSet;

/// An entity that can own settings entries
pub trait Settingable {
    /// Stable type identifier stored alongside owned entries
    fn owner_type(&self) -> &str;

    /// Identity key of this entity, `None` while it has no persistent identity
    fn owner_key(&self) -> Option<String>;
}

impl Settingable for OwnerRef {
    fn owner_type(&self) -> &str {
        &self.owner_type
    }

    fn owner_key(&self) -> Option<String> {
        Some(self.owner_id.clone())
    }
}

impl OwnerRef {
    /// Capture the back-reference of `owner`, rejecting entities without identity
    pub fn of<O: Settingable + ?Sized>(owner: &O) -> Result<Self, SettingsError> {
        let owner_type = owner.owner_type();
        if owner_type.is_empty() {
            return Err(SettingsError::invalid_owner("owner type identifier is empty"));
        }

        match owner.owner_key() {
            Some(id) if !id.is_empty() => Ok(Self::new(owner_type, id)),
            _ => Err(SettingsError::invalid_owner(format!(
                "{owner_type} has no identity key"
            ))),
        }
    }
}

/// Scope of one settings operation: group, optional owner and excluded keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFilter {
    group: String,
    owner: Option<OwnerRef>,
    excepts: BTreeSet<String>,
}

impl Default for EntryFilter {
    fn default() -> Self {
        Self {
            group: DEFAULT_GROUP.to_string(),
            owner: None,
            excepts: BTreeSet::new(),
        }
    }
}

impl EntryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_group(&mut self, name: impl Into<String>) {
        self.group = name.into();
    }

    /// Scope to `owner`; fails before touching the filter if the owner has no identity
    pub fn set_owner<O: Settingable + ?Sized>(&mut self, owner: &O) -> Result<(), SettingsError> {
        self.owner = Some(OwnerRef::of(owner)?);
        Ok(())
    }

    pub fn set_owner_ref(&mut self, owner: OwnerRef) {
        self.owner = Some(owner);
    }

    /// Replace the excluded keys
    pub fn set_excepts<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excepts = keys.into_iter().map(Into::into).collect();
    }

    /// Reset every field to its default
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn owner(&self) -> Option<&OwnerRef> {
        self.owner.as_ref()
    }

    pub fn excepts(&self) -> &BTreeSet<String> {
        &self.excepts
    }

    pub fn is_excepted(&self, key: &str) -> bool {
        self.excepts.contains(key)
    }

    /// Whether an entry stored under `group`/`owner` belongs to this scope.
    ///
    /// No owner on the filter matches only global entries, never all owners.
    pub fn matches(&self, group: &str, owner: Option<&OwnerRef>) -> bool {
        self.group == group && self.owner.as_ref() == owner
    }
}
