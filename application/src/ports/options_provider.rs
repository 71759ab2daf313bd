//! Options lookup port
//!
//! Defines how the settings holder reads the option groups of the current
//! command. The option-parsing subsystem of the hosting process implements it.

use phasepool_domain::{OptionGroup, OptionGroupId};
use std::collections::HashMap;

/// Port for looking up typed option groups by identifier.
///
/// `None` means the current command does not define the group; this is a
/// normal signal, not a failure.
pub trait OptionsProvider {
    /// Look up a single option group
    fn lookup(&self, id: OptionGroupId) -> Option<OptionGroup>;
}

impl<T: OptionsProvider + ?Sized> OptionsProvider for &T {
    fn lookup(&self, id: OptionGroupId) -> Option<OptionGroup> {
        (**self).lookup(id)
    }
}

/// Fixed, in-memory set of option groups.
///
/// Useful when the groups are already known (tests, command-line overrides).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticOptions {
    groups: HashMap<OptionGroupId, OptionGroup>,
}

impl StaticOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a group.
    pub fn with(mut self, group: impl Into<OptionGroup>) -> Self {
        self.insert(group);
        self
    }

    pub fn insert(&mut self, group: impl Into<OptionGroup>) {
        let group = group.into();
        self.groups.insert(group.id(), group);
    }

    pub fn remove(&mut self, id: OptionGroupId) -> Option<OptionGroup> {
        self.groups.remove(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl OptionsProvider for StaticOptions {
    fn lookup(&self, id: OptionGroupId) -> Option<OptionGroup> {
        self.groups.get(&id).copied()
    }
}
