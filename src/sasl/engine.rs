use super::{
    Context, Identity, Inbound, Mechanism, Outbound, Outcome, PendingLogin, Registry, Scram,
    Session, SessionId, SessionStore, Step,
};
use crate::{
    account::{AccountDirectory, Admission},
    config::{Options, Pbkdf2Options},
    consts::{CYRUS_ITERATIONS_MAX, FRAME_LEN, MECHANISM_NAME_LEN},
    credential::CredentialStore,
    digest::DigestAlgorithm,
    error::{ConfigError, CredentialError},
    string::base64::{ChunkEncoder, Decoded},
};
use std::sync::Arc;

/// The SASL negotiation engine.
///
/// Owns every in-flight session and the mechanism registry.
/// All methods run to completion and return the frames to send to the uplink, in order.
pub struct Engine<D, C> {
    options: Options,
    accounts: D,
    credentials: C,
    registry: Registry,
    sessions: SessionStore,
    connected: bool,
}

impl<D: AccountDirectory, C: CredentialStore> Engine<D, C> {
    /// Creates an engine with no mechanisms registered after validating `options`.
    pub fn new(options: Options, accounts: D, credentials: C) -> Result<Self, ConfigError> {
        options.validate()?;
        Ok(Engine {
            options,
            accounts,
            credentials,
            registry: Registry::new(),
            sessions: SessionStore::new(),
            connected: false,
        })
    }

    /// Returns the engine's options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Returns the account directory.
    pub fn accounts(&self) -> &D {
        &self.accounts
    }

    /// Returns the account directory mutably.
    pub fn accounts_mut(&mut self) -> &mut D {
        &mut self.accounts
    }

    /// Returns the credential store.
    pub fn credentials(&self) -> &C {
        &self.credentials
    }

    /// Returns the mechanism registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns the in-flight sessions.
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Looks up a session.
    pub fn session(&self, id: &str) -> Option<&Session> {
        self.sessions.find(id)
    }

    /// Returns `true` if the uplink has finished bursting.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Called when a server finishes bursting. Pushes the mechanism list to the network.
    pub fn server_eob(&mut self) -> Vec<Outbound> {
        self.connected = true;
        vec![Outbound::NetworkMechanismList(self.registry.mechlist().to_owned())]
    }

    fn publish(&self) -> Vec<Outbound> {
        if self.connected {
            vec![Outbound::NetworkMechanismList(self.registry.mechlist().to_owned())]
        } else {
            Vec::new()
        }
    }

    fn remove(&mut self, name: &str) -> bool {
        if self.registry.find(name).is_none() {
            return false;
        }
        for id in self.sessions.bound_to(name) {
            tracing::debug!(target: "saslserv", "destroying session {id} using {name}");
            self.sessions.destroy(id.as_str());
        }
        self.registry.unregister(name).is_some()
    }

    /// Registers a mechanism.
    ///
    /// Registering a name twice is a no-op that logs a warning.
    pub fn register(&mut self, mechanism: Arc<dyn Mechanism>) -> Vec<Outbound> {
        if self.registry.register(mechanism) {
            self.publish()
        } else {
            Vec::new()
        }
    }

    /// Unregisters a mechanism, first destroying every session using it.
    pub fn unregister(&mut self, name: &str) -> Vec<Outbound> {
        if self.remove(name) {
            self.publish()
        } else {
            Vec::new()
        }
    }

    /// Registers the SCRAM mechanism for the configured digest and unregisters the others.
    pub fn configure_scram(
        &mut self,
        options: &Pbkdf2Options,
    ) -> Result<Vec<Outbound>, CredentialError> {
        if options.exceeds_cyrus_limit() {
            tracing::warn!(
                target: "saslserv",
                "iteration count {} is higher than {}, which Cyrus SASL clients will refuse",
                options.iterations,
                CYRUS_ITERATIONS_MAX
            );
        }
        let mut changed = false;
        for digest in DigestAlgorithm::ALL {
            let name = digest.scram_name();
            if digest != options.digest {
                changed |= self.remove(name);
            } else if self.registry.find(name).is_none() {
                let scram = Scram::new(digest, options.iterations, options.salt_len)?;
                changed |= self.registry.register(Arc::new(scram));
            }
        }
        Ok(if changed { self.publish() } else { Vec::new() })
    }

    /// Handles one frame from the uplink, received from `server`.
    ///
    /// Only `HostInfo` and `StartAuth` create sessions. Other frames for unknown sessions
    /// are ignored.
    pub fn handle(&mut self, server: &str, msg: Inbound) -> Vec<Outbound> {
        let mut out = Vec::new();
        let session = match &msg {
            Inbound::HostInfo { session, .. } | Inbound::StartAuth { session, .. } => {
                self.sessions.find_or_create(session.as_str(), server)
            }
            Inbound::ClientData { session, .. } | Inbound::Done { session } => {
                let Some(found) = self.sessions.find_mut(session.as_str()) else {
                    tracing::debug!(target: "saslserv", "{session}: frame for unknown session");
                    return out;
                };
                found
            }
        };
        session.marked = false;
        match msg {
            Inbound::HostInfo { host, ip, secure, .. } => {
                if session.info.host.is_none() {
                    session.info.host = Some(host);
                    session.info.ip = Some(ip);
                }
                session.info.secure |= secure;
            }
            Inbound::StartAuth { session, mechanism, certfp } => {
                self.start_auth(&session, &mechanism, certfp, &mut out);
            }
            Inbound::ClientData { session, data } => self.client_data(&session, &data, &mut out),
            Inbound::Done { session } => self.reset_or_destroy(&session),
        }
        out
    }

    fn start_auth(
        &mut self,
        id: &SessionId,
        name: &str,
        certfp: Option<String>,
        out: &mut Vec<Outbound>,
    ) {
        let Some(session) = self.sessions.find_mut(id.as_str()) else {
            return;
        };
        if let Some(certfp) = certfp {
            session.info.certfp = Some(certfp);
            session.info.secure = true;
        }
        if name.len() > MECHANISM_NAME_LEN {
            tracing::debug!(target: "saslserv", "{}: mechanism name too long", session.info.source());
            self.abort(id, out);
            return;
        }
        if session.mechanism.is_some() {
            tracing::debug!(
                target: "saslserv",
                "{}: mechanism requested while using {}",
                session.info.source(),
                session.mechanism().unwrap_or_default()
            );
            self.abort(id, out);
            return;
        }
        let Some(mechanism) = self.registry.find(name) else {
            tracing::debug!(target: "saslserv", "{}: no mechanism {name:?}", session.info.source());
            let mechanisms = self.registry.mechlist().to_owned();
            out.push(Outbound::MechanismList { session: id.clone(), mechanisms });
            return;
        };
        session.mechanism = Some(mechanism);
        self.run(id, None, out);
    }

    fn client_data(&mut self, id: &SessionId, data: &str, out: &mut Vec<Outbound>) {
        let Some(session) = self.sessions.find_mut(id.as_str()) else {
            return;
        };
        if session.mechanism.is_none() {
            tracing::debug!(target: "saslserv", "{}: data without a mechanism", session.info.source());
            self.abort(id, out);
            return;
        }
        match session.decoder.add(data) {
            Ok(Decoded::Partial) => (),
            Ok(Decoded::Complete(msg)) => self.run(id, Some(&msg), out),
            Ok(Decoded::Abort) => {
                tracing::debug!(target: "saslserv", "{}: client aborted", session.info.source());
                self.abort(id, out);
            }
            Err(e) => {
                tracing::debug!(target: "saslserv", "{}: {e}", session.info.source());
                self.abort(id, out);
            }
        }
    }

    /// Runs the session's mechanism, starting it if `data` is `None`.
    fn run(&mut self, id: &SessionId, data: Option<&[u8]>, out: &mut Vec<Outbound>) {
        let Some(session) = self.sessions.find_mut(id.as_str()) else {
            return;
        };
        let Some(mechanism) = session.mechanism.clone() else {
            tracing::error!(target: "saslserv", "{}: session has no mechanism (BUG)", session.info.source());
            self.abort(id, out);
            return;
        };
        let mut ctx = Context::new(session, &mut self.accounts, &self.credentials, &self.registry);
        let step = match data {
            None => mechanism.start(&mut ctx),
            Some(data) => mechanism.step(&mut ctx, data),
        };
        if let Some(mechanisms) = ctx.take_mechlist() {
            out.push(Outbound::MechanismList { session: id.clone(), mechanisms });
        }
        match step {
            Step::Continue(data) => {
                for chunk in ChunkEncoder::new(data.as_slice(), FRAME_LEN) {
                    out.push(Outbound::ServerData { session: id.clone(), chunk });
                }
            }
            Step::Success => self.succeed(id, mechanism.name(), out),
            Step::Failure(reply) => {
                self.reply(id, &reply, out);
                self.penalize(id, mechanism.name());
                self.fail(id, out);
            }
            Step::Error(reply) => {
                self.reply(id, &reply, out);
                self.fail(id, out);
            }
        }
    }

    fn reply(&self, id: &SessionId, reply: &[u8], out: &mut Vec<Outbound>) {
        if reply.is_empty() {
            return;
        }
        for chunk in ChunkEncoder::new(reply, FRAME_LEN) {
            out.push(Outbound::ServerData { session: id.clone(), chunk });
        }
    }

    fn penalize(&mut self, id: &SessionId, mechanism: &str) {
        let Some(session) = self.sessions.find(id.as_str()) else {
            return;
        };
        let Some(authc) = &session.authc else {
            return;
        };
        if self.accounts.find_by_id(authc.id).is_none() {
            return;
        }
        tracing::info!(
            target: "saslserv",
            "{}: failed LOGIN ({mechanism}) to {} (bad password)",
            session.info.source(),
            authc.name
        );
        let account = authc.id;
        self.accounts.bad_password(account);
    }

    /// Fails the negotiation: sends the outcome, then destroys or resets the session.
    fn fail(&mut self, id: &SessionId, out: &mut Vec<Outbound>) {
        out.push(Outbound::Outcome { session: id.clone(), outcome: Outcome::Failure });
        self.reset_or_destroy(id);
    }

    /// Aborts the negotiation: sends the outcome, then destroys the session.
    fn abort(&mut self, id: &SessionId, out: &mut Vec<Outbound>) {
        out.push(Outbound::Outcome { session: id.clone(), outcome: Outcome::Failure });
        self.sessions.destroy(id.as_str());
    }

    /// Destroys the session unless a login is waiting for its client,
    /// in which case only the mechanism and identities are cleared.
    fn reset_or_destroy(&mut self, id: &SessionId) {
        let Some(session) = self.sessions.find_mut(id.as_str()) else {
            return;
        };
        if session.pending.is_some() {
            session.finish_mechanism();
            session.authc = None;
            session.authz = None;
        } else {
            self.sessions.destroy(id.as_str());
        }
    }

    fn succeed(&mut self, id: &SessionId, mechanism: &str, out: &mut Vec<Outbound>) {
        let Some(target) = self.login_user(id) else {
            self.fail(id, out);
            return;
        };
        out.push(Outbound::Login { session: id.clone(), account: target.name.clone() });
        out.push(Outbound::Outcome { session: id.clone(), outcome: Outcome::Success });
        if self.accounts.user_online(id.as_str()) {
            self.sessions.destroy(id.as_str());
            self.apply_login(id, &target, mechanism);
            return;
        }
        let Some(session) = self.sessions.find_mut(id.as_str()) else {
            return;
        };
        session.finish_mechanism();
        session.need_log = true;
        session.pending = Some(PendingLogin { account: target, mechanism: mechanism.to_owned() });
    }

    /// Checks that the authenticated identity may log in as the authorization identity.
    fn login_user(&mut self, id: &SessionId) -> Option<Identity> {
        let session = self.sessions.find_mut(id.as_str())?;
        let source_desc = session.info.source_name(self.options.hide_server_names);
        let authc = session.authc.clone()?;
        let source = self.accounts.find_by_id(authc.id)?;
        let target = match session.authz.as_ref().map(|i| i.id) {
            Some(authz) => self.accounts.find_by_id(authz)?,
            None => {
                session.authz = Some(authc);
                source
            }
        };
        if let Admission::Deny(reason) = self.accounts.login_admission(source) {
            tracing::info!(
                target: "saslserv",
                "<{source_desc}> failed LOGIN to {} ({reason})",
                source.name
            );
            return None;
        }
        if target.id != source.id {
            if !self.accounts.can_impersonate(source, target) {
                tracing::info!(
                    target: "saslserv",
                    "<{source_desc}> denied IMPERSONATE by {} to {}",
                    source.name,
                    target.name
                );
                return None;
            }
            if let Admission::Deny(reason) = self.accounts.login_admission(target) {
                tracing::info!(
                    target: "saslserv",
                    "<{source_desc}> failed LOGIN to {} ({reason})",
                    target.name
                );
                return None;
            }
            tracing::info!(
                target: "saslserv",
                "<{source_desc}> allowed IMPERSONATE by {} to {}",
                source.name,
                target.name
            );
        }
        Some(Identity { name: target.name.clone(), id: target.id })
    }

    fn apply_login(&mut self, uid: &SessionId, account: &Identity, mechanism: &str) {
        if self.accounts.login(uid.as_str(), account.id) {
            tracing::info!(target: "saslserv", "{uid}: LOGIN ({mechanism}) to {}", account.name);
        } else {
            tracing::info!(target: "saslserv", "{uid}: account {} vanished before login", account.name);
        }
    }

    /// Called when a client arrives on the network.
    ///
    /// Applies any login waiting for the client and destroys its session.
    pub fn user_introduced(&mut self, uid: &str) -> Vec<Outbound> {
        let Some(session) = self.sessions.find_mut(uid) else {
            return Vec::new();
        };
        session.need_log = false;
        let pending = session.pending.take();
        self.sessions.destroy(uid);
        let Some(pending) = pending else {
            return Vec::new();
        };
        let id = SessionId::from(uid);
        if self.accounts.find_by_id(pending.account.id).is_none() {
            let text = format!("Account {} dropped, login cancelled", pending.account.name);
            return vec![Outbound::Notice { session: id, text }];
        }
        self.apply_login(&id, &pending.account, &pending.mechanism);
        Vec::new()
    }

    /// Destroys sessions that have been idle since the previous sweep and marks the rest.
    ///
    /// Returns the number of sessions destroyed.
    pub fn sweep(&mut self) -> usize {
        self.sessions.sweep()
    }
}

impl<D: std::fmt::Debug, C> std::fmt::Debug for Engine<D, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("options", &self.options)
            .field("accounts", &self.accounts)
            .field("registry", &self.registry)
            .field("sessions", &self.sessions.len())
            .field("connected", &self.connected)
            .finish_non_exhaustive()
    }
}
