//! SASL negotiation and mechanisms.
//!
//! The [`Engine`] consumes [`Inbound`] frames from the uplink and produces [`Outbound`] ones.
//! Mechanisms are registered with it as [`Mechanism`] trait objects.
//! Each session's mechanism-private state is owned by the session
//! and handed to the mechanism through a [`Context`].

mod engine;
mod external;
mod message;
mod plain;
mod registry;
mod scram;
mod session;
#[cfg(feature = "tokio")]
pub mod sweeper;
#[cfg(test)]
mod tests;

pub use engine::*;
pub use external::External;
pub use message::*;
pub use plain::Plain;
pub use registry::*;
pub use scram::Scram;
pub use session::*;

use crate::{
    account::{AccountDirectory, AccountId, Admission},
    credential::{CredentialStore, ScramCredential},
    error::CredentialError,
};
use std::any::Any;
use zeroize::Zeroizing;

/// Mechanism-private state of one session.
///
/// Exists if and only if a mechanism has stored something in it.
pub type MechState = Option<Box<dyn Any + Send>>;

/// The result of one step of a mechanism.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Step {
    /// More rounds are needed. The data, which may be empty, is sent to the client.
    Continue(Zeroizing<Vec<u8>>),
    /// The client has authenticated.
    Success,
    /// The client failed to authenticate.
    ///
    /// The authentication identity, if resolved, is penalized.
    /// Non-empty data is sent to the client before the outcome.
    Failure(Vec<u8>),
    /// The client sent something malformed. No penalty applies.
    ///
    /// Non-empty data is sent to the client before the outcome.
    Error(Vec<u8>),
}

impl Step {
    /// Returns a [`Step::Continue`] with the provided data.
    pub fn more(data: impl Into<Vec<u8>>) -> Self {
        Step::Continue(Zeroizing::new(data.into()))
    }
}

/// A SASL mechanism.
///
/// Mechanisms are shared between all sessions that use them
/// and keep per-session data in the session's [`MechState`].
pub trait Mechanism: Send + Sync {
    /// The name of this mechanism, as clients request it.
    fn name(&self) -> &str;

    /// Whether this mechanism authenticates using the account's password.
    ///
    /// Such mechanisms are hidden from accounts with password authentication disabled.
    fn password_based(&self) -> bool {
        false
    }

    /// Called when a client selects this mechanism.
    fn start(&self, _ctx: &mut Context<'_>) -> Step {
        Step::Continue(Zeroizing::default())
    }

    /// Handles one complete message from the client.
    fn step(&self, ctx: &mut Context<'_>, data: &[u8]) -> Step;

    /// Releases any state held for a session.
    fn finish(&self, state: MechState) {
        std::mem::drop(state);
    }
}

impl std::fmt::Debug for dyn Mechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Mechanism").field(&self.name()).finish()
    }
}

/// A mechanism's view of a session and the services around it.
pub struct Context<'a> {
    session: &'a mut Session,
    accounts: &'a mut dyn AccountDirectory,
    credentials: &'a dyn CredentialStore,
    registry: &'a Registry,
    mechlist: Option<String>,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        session: &'a mut Session,
        accounts: &'a mut dyn AccountDirectory,
        credentials: &'a dyn CredentialStore,
        registry: &'a Registry,
    ) -> Self {
        Context { session, accounts, credentials, registry, mechlist: None }
    }

    pub(crate) fn take_mechlist(&mut self) -> Option<String> {
        self.mechlist.take()
    }

    /// Returns information about the client.
    pub fn info(&self) -> &SessionInfo {
        &self.session.info
    }

    /// Returns the account directory.
    pub fn accounts(&self) -> &dyn AccountDirectory {
        &*self.accounts
    }

    /// Returns the credential store.
    pub fn credentials(&self) -> &dyn CredentialStore {
        self.credentials
    }

    /// Returns `true` if this session has mechanism-private state.
    pub fn has_state(&self) -> bool {
        self.session.state.is_some()
    }

    /// Returns the mechanism-private state if it is of type `T`.
    pub fn state_mut<T: Any + Send>(&mut self) -> Option<&mut T> {
        self.session.state.as_mut()?.downcast_mut::<T>()
    }

    /// Replaces the mechanism-private state.
    pub fn set_state<T: Any + Send>(&mut self, state: T) {
        self.session.state = Some(Box::new(state));
    }

    /// Returns the resolved authentication identity, if any.
    pub fn authcid(&self) -> Option<&Identity> {
        self.session.authc.as_ref()
    }

    /// Returns the resolved authorization identity, if any.
    pub fn authzid(&self) -> Option<&Identity> {
        self.session.authz.as_ref()
    }

    /// Resolves the authentication identity.
    ///
    /// Succeeds if the account exists and may be logged into.
    pub fn authcid_can_login(&mut self, name: &str) -> Option<AccountId> {
        let other = self.session.authz.as_ref().map(|i| i.id);
        let identity = self.can_login(name, other)?;
        let id = identity.id;
        self.session.authc = Some(identity);
        Some(id)
    }

    /// Resolves the authorization identity.
    ///
    /// Always fails if the authentication identity has not been resolved yet.
    pub fn authzid_can_login(&mut self, name: &str) -> Option<AccountId> {
        let Some(other) = self.session.authc.as_ref().map(|i| i.id) else {
            tracing::debug!(target: "saslserv", "{}: authzid before authcid", self.info().source());
            return None;
        };
        let identity = self.can_login(name, Some(other))?;
        let id = identity.id;
        self.session.authz = Some(identity);
        Some(id)
    }

    fn can_login(&self, name: &str, other: Option<AccountId>) -> Option<Identity> {
        let account = self.accounts.find_by_name(name)?;
        let identity = Identity { name: account.name.clone(), id: account.id };
        if other == Some(account.id) {
            // Already checked as the other identity.
            return Some(identity);
        }
        match self.accounts.login_admission(account) {
            Admission::Allow => Some(identity),
            Admission::Deny(reason) => {
                tracing::info!(
                    target: "saslserv",
                    "{}: failed LOGIN to {} ({})",
                    self.info().source(),
                    account.name,
                    reason
                );
                None
            }
        }
    }

    /// Sends the client a list of mechanisms tailored to an account.
    ///
    /// Password-based mechanisms are left out if the account has password authentication
    /// disabled, as is every mechanism named in `avoid`.
    pub fn recalc_mechlist(&mut self, account: AccountId, avoid: &[&str]) {
        let list = match self.accounts.find_by_id(account) {
            Some(account) => self.registry.mechlist_for(account, avoid),
            None => self.registry.mechlist().to_owned(),
        };
        self.mechlist = Some(list);
    }

    /// Writes a credential back to an account in the SCRAM-native layout.
    pub fn rewrite_credential(
        &mut self,
        id: AccountId,
        credential: &ScramCredential,
    ) -> Result<bool, CredentialError> {
        self.credentials.rewrite(&mut *self.accounts, id, credential)
    }
}
