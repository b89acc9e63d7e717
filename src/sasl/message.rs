use super::SessionId;

/// A frame received from the uplink.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Inbound {
    /// Information about the client's connection.
    HostInfo {
        /// The session the frame belongs to.
        session: SessionId,
        /// The client's hostname.
        host: String,
        /// The client's IP address.
        ip: String,
        /// Whether the connection is secure.
        secure: bool,
    },
    /// The client selects a mechanism.
    StartAuth {
        /// The session the frame belongs to.
        session: SessionId,
        /// The name of the requested mechanism.
        mechanism: String,
        /// The client's TLS certificate fingerprint, if the uplink knows one.
        certfp: Option<String>,
    },
    /// One frame of base64-encoded client data.
    ClientData {
        /// The session the frame belongs to.
        session: SessionId,
        /// The frame, or `"+"` for no data, or `"*"` to abort.
        data: String,
    },
    /// The client has stopped authenticating.
    Done {
        /// The session the frame belongs to.
        session: SessionId,
    },
}

impl Inbound {
    /// Returns the session this frame belongs to.
    pub fn session(&self) -> &SessionId {
        match self {
            Inbound::HostInfo { session, .. }
            | Inbound::StartAuth { session, .. }
            | Inbound::ClientData { session, .. }
            | Inbound::Done { session } => session,
        }
    }
}

/// How a negotiation ended.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Outcome {
    /// The client is authenticated.
    Success,
    /// The client is not authenticated.
    Failure,
}

/// A frame to send to the uplink.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Outbound {
    /// The list of mechanisms available to one client.
    MechanismList {
        /// The session the frame belongs to.
        session: SessionId,
        /// Comma-delimited mechanism names.
        mechanisms: String,
    },
    /// The list of mechanisms, announced to the whole network.
    NetworkMechanismList(String),
    /// One frame of base64-encoded server data.
    ServerData {
        /// The session the frame belongs to.
        session: SessionId,
        /// The frame, or `"+"` for no data.
        chunk: String,
    },
    /// The result of a negotiation.
    Outcome {
        /// The session the frame belongs to.
        session: SessionId,
        /// The result.
        outcome: Outcome,
    },
    /// Tells the client's server which account the client is logging into.
    Login {
        /// The session the frame belongs to.
        session: SessionId,
        /// The account name.
        account: String,
    },
    /// A notice for the client.
    Notice {
        /// The session the frame belongs to.
        session: SessionId,
        /// The text of the notice.
        text: String,
    },
}
