use super::{MechState, Mechanism};
use crate::{
    account::AccountId,
    consts::{BUFFER_LEN, FRAME_LEN},
    string::base64::ChunkDecoder,
};
use std::{borrow::Borrow, collections::HashMap, sync::Arc};

/// The transport-assigned identifier of a session, usually the client's UID.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct SessionId(pub String);

impl SessionId {
    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SessionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        SessionId(value.to_owned())
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        SessionId(value)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What is known about the client behind a session.
#[derive(Clone, Debug, Default)]
pub struct SessionInfo {
    /// The session identifier.
    pub uid: String,
    /// The name of the server the client is connected to.
    pub server: String,
    /// The client's hostname, once known.
    pub host: Option<String>,
    /// The client's IP address, once known.
    pub ip: Option<String>,
    /// The client's TLS certificate fingerprint, if one was presented.
    pub certfp: Option<String>,
    /// Whether the client's connection is known to be secure.
    pub secure: bool,
}

impl SessionInfo {
    /// Returns a full description of the session for logging.
    pub fn source(&self) -> String {
        format!(
            "SASL/{}:{}[{}]:{}",
            self.uid,
            self.host.as_deref().unwrap_or("?"),
            self.ip.as_deref().unwrap_or("?"),
            self.server
        )
    }

    /// Returns the name under which the client appears before it is on the network.
    pub fn source_name(&self, hide_server_names: bool) -> String {
        if hide_server_names || self.server.is_empty() {
            "Unknown user (via SASL)".to_owned()
        } else {
            format!("Unknown user on {} (via SASL)", self.server)
        }
    }
}

/// A resolved identity: the name the client gave, canonicalized, and the account's id.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Identity {
    /// The account's name.
    pub name: String,
    /// The account's identifier.
    pub id: AccountId,
}

/// A login that succeeded before the client arrived on the network.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PendingLogin {
    /// The account the client will be logged into.
    pub account: Identity,
    /// The mechanism that authenticated the client.
    pub mechanism: String,
}

/// One in-flight negotiation.
pub struct Session {
    pub(crate) info: SessionInfo,
    pub(crate) mechanism: Option<Arc<dyn Mechanism>>,
    pub(crate) state: MechState,
    pub(crate) decoder: ChunkDecoder,
    pub(crate) authc: Option<Identity>,
    pub(crate) authz: Option<Identity>,
    pub(crate) pending: Option<PendingLogin>,
    pub(crate) need_log: bool,
    pub(crate) marked: bool,
}

impl Session {
    fn new(uid: &str, server: &str) -> Self {
        Session {
            info: SessionInfo { uid: uid.to_owned(), server: server.to_owned(), ..Default::default() },
            mechanism: None,
            state: None,
            decoder: ChunkDecoder::new(FRAME_LEN, BUFFER_LEN),
            authc: None,
            authz: None,
            pending: None,
            need_log: false,
            marked: false,
        }
    }

    /// Returns information about the client.
    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    /// Returns the name of the selected mechanism, if any.
    pub fn mechanism(&self) -> Option<&str> {
        self.mechanism.as_ref().map(|m| m.name())
    }

    /// Returns `true` if the session has mechanism-private state.
    pub fn has_state(&self) -> bool {
        self.state.is_some()
    }

    /// Returns the number of bytes of client data waiting for the end of a message.
    pub fn buffered(&self) -> usize {
        self.decoder.len()
    }

    /// Returns the resolved authentication identity, if any.
    pub fn authcid(&self) -> Option<&Identity> {
        self.authc.as_ref()
    }

    /// Returns the resolved authorization identity, if any.
    pub fn authzid(&self) -> Option<&Identity> {
        self.authz.as_ref()
    }

    /// Returns the login waiting for the client to arrive on the network, if any.
    pub fn pending(&self) -> Option<&PendingLogin> {
        self.pending.as_ref()
    }

    /// Returns `true` if the next sweep will destroy this session.
    pub fn is_marked(&self) -> bool {
        self.marked
    }

    /// Deselects the mechanism, releasing its state and any buffered data.
    pub(crate) fn finish_mechanism(&mut self) {
        let state = self.state.take();
        if let Some(mech) = self.mechanism.take() {
            mech.finish(state);
        }
        self.decoder.clear();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("info", &self.info)
            .field("mechanism", &self.mechanism())
            .field("authc", &self.authc)
            .field("authz", &self.authz)
            .field("pending", &self.pending)
            .field("marked", &self.marked)
            .finish_non_exhaustive()
    }
}

/// The set of in-flight sessions.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<SessionId, Session>,
}

impl SessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        SessionStore::default()
    }

    /// Returns the number of sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if there are no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Looks up a session. Never creates one.
    pub fn find(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub(crate) fn find_mut(&mut self, id: &str) -> Option<&mut Session> {
        self.sessions.get_mut(id)
    }

    /// Returns the session with the given id, creating it if needed.
    pub fn find_or_create(&mut self, id: &str, server: &str) -> &mut Session {
        self.sessions.entry(SessionId::from(id)).or_insert_with(|| {
            tracing::debug!(target: "saslserv", "new session {id} from {server}");
            Session::new(id, server)
        })
    }

    /// Destroys a session, letting its mechanism release its state.
    ///
    /// Returns `false` if there was no such session.
    pub fn destroy(&mut self, id: &str) -> bool {
        let Some(mut session) = self.sessions.remove(id) else {
            return false;
        };
        if session.need_log {
            if let Some(pending) = &session.pending {
                tracing::info!(
                    target: "saslserv",
                    "{}: LOGIN to {} (session timed out)",
                    session.info.source(),
                    pending.account.name
                );
            }
        }
        session.finish_mechanism();
        true
    }

    /// Destroys every session marked by the previous sweep and marks all others.
    ///
    /// Returns the number of sessions destroyed.
    pub fn sweep(&mut self) -> usize {
        let stale: Vec<SessionId> =
            self.sessions.iter().filter(|(_, s)| s.marked).map(|(k, _)| k.clone()).collect();
        for session in self.sessions.values_mut() {
            session.marked = true;
        }
        for id in &stale {
            tracing::debug!(target: "saslserv", "destroying stale session {id}");
            self.destroy(id.as_str());
        }
        stale.len()
    }

    /// Returns the ids of every session using the named mechanism.
    pub fn bound_to(&self, mechanism: &str) -> Vec<SessionId> {
        self.sessions
            .iter()
            .filter(|(_, s)| s.mechanism() == Some(mechanism))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Iterates over every session.
    pub fn iter(&self) -> impl Iterator<Item = (&SessionId, &Session)> + '_ {
        self.sessions.iter()
    }
}
