use super::Mechanism;
use crate::{
    account::Account,
    consts::{FRAME_LEN, MECHANISM_NAME_LEN},
};
use std::sync::Arc;

/// The table of available mechanisms, in registration order.
#[derive(Default)]
pub struct Registry {
    mechanisms: Vec<Arc<dyn Mechanism>>,
    mechlist: String,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Registry::default()
    }

    /// Returns the number of registered mechanisms.
    pub fn len(&self) -> usize {
        self.mechanisms.len()
    }

    /// Returns `true` if no mechanisms are registered.
    pub fn is_empty(&self) -> bool {
        self.mechanisms.is_empty()
    }

    /// Adds a mechanism.
    ///
    /// Returns `false` without changing anything if a mechanism with the same name
    /// is already registered, or if the name is longer than [`MECHANISM_NAME_LEN`].
    pub fn register(&mut self, mechanism: Arc<dyn Mechanism>) -> bool {
        let name = mechanism.name();
        if name.len() > MECHANISM_NAME_LEN {
            tracing::warn!(target: "saslserv", "mechanism name {name:?} is too long");
            return false;
        }
        if self.find(name).is_some() {
            tracing::warn!(target: "saslserv", "mechanism {name} is already registered");
            return false;
        }
        tracing::debug!(target: "saslserv", "registering {}", mechanism.name());
        self.mechanisms.push(mechanism);
        self.rebuild();
        true
    }

    /// Removes the named mechanism.
    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn Mechanism>> {
        let idx = self.mechanisms.iter().position(|m| m.name() == name)?;
        tracing::debug!(target: "saslserv", "unregistering {name}");
        let mechanism = self.mechanisms.remove(idx);
        self.rebuild();
        Some(mechanism)
    }

    /// Looks up a mechanism by exact name.
    pub fn find(&self, name: &str) -> Option<Arc<dyn Mechanism>> {
        self.mechanisms.iter().find(|m| m.name() == name).cloned()
    }

    /// Iterates over the names of the registered mechanisms.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.mechanisms.iter().map(|m| m.name())
    }

    /// Returns the comma-delimited list of every registered mechanism.
    pub fn mechlist(&self) -> &str {
        &self.mechlist
    }

    /// Returns the comma-delimited list of mechanisms suitable for an account.
    pub fn mechlist_for(&self, account: &Account, avoid: &[&str]) -> String {
        let no_password = account.flags.no_password;
        build_list(
            self.mechanisms
                .iter()
                .filter(|m| !(no_password && m.password_based()))
                .map(|m| m.name())
                .filter(|n| !avoid.contains(n)),
        )
    }

    fn rebuild(&mut self) {
        let list = build_list(self.names());
        self.mechlist = list;
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Joins names with commas, leaving out whole names that would not fit in one frame.
fn build_list<'a>(names: impl Iterator<Item = &'a str>) -> String {
    let mut list = String::new();
    for name in names {
        let sep = usize::from(!list.is_empty());
        if list.len() + sep + name.len() >= FRAME_LEN {
            break;
        }
        if sep != 0 {
            list.push(',');
        }
        list.push_str(name);
    }
    list
}
