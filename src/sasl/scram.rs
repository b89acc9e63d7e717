//! SCRAM-SHA-* (RFC 5802, RFC 7677) without channel binding.

mod attr;

use self::attr::AttrList;
use super::{Context, Mechanism, Step};
use crate::{
    account::AccountId,
    consts::{scram::*, ACCOUNT_NAME_LEN},
    credential::ScramCredential,
    digest::DigestAlgorithm,
    error::CredentialError,
    string::{decode_saslname, prep_name, IrcCasemap},
};
use base64::engine::{general_purpose::STANDARD as ENGINE, Engine};
use ring::rand::{SecureRandom, SystemRandom};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

const LOG: &str = "saslserv::scram";

/// The SCRAM mechanism for one digest algorithm.
///
/// Clients naming an unknown account are given a credential derived from
/// a per-instance secret and the name, so that they fail at the proof
/// the same way a wrong password does.
/// Mock salts and iteration counts look like those of freshly hashed passwords.
pub struct Scram {
    digest: DigestAlgorithm,
    mock_key: Zeroizing<Vec<u8>>,
    mock_iterations: u32,
    mock_salt_len: usize,
    rng: SystemRandom,
}

struct ScramState {
    credential: ScramCredential,
    // `None` for unknown accounts.
    account: Option<AccountId>,
    client_first: Zeroizing<Vec<u8>>,
    server_first: String,
    gs2_b64: String,
    nonce: String,
    complete: bool,
}

fn error_token(token: &str) -> Vec<u8> {
    format!("e={token}").into_bytes()
}

fn error(token: &str) -> Step {
    Step::Error(error_token(token))
}

impl Scram {
    /// Creates the mechanism for `digest`.
    ///
    /// `iterations` and `salt_len` are advertised for unknown accounts
    /// and should match the options new hashes are created with.
    pub fn new(
        digest: DigestAlgorithm,
        iterations: u32,
        salt_len: usize,
    ) -> Result<Self, CredentialError> {
        let rng = SystemRandom::new();
        let mut mock_key = Zeroizing::new(vec![0u8; digest.output_len()]);
        rng.fill(&mut mock_key).map_err(|_| CredentialError::Random)?;
        Ok(Scram { digest, mock_key, mock_iterations: iterations, mock_salt_len: salt_len, rng })
    }

    /// Returns the digest this instance authenticates with.
    pub fn digest(&self) -> DigestAlgorithm {
        self.digest
    }

    fn mock_credential(&self, name: &str) -> ScramCredential {
        let name = IrcCasemap::default().fold(name);
        let mut salt = Vec::with_capacity(self.mock_salt_len);
        let mut block = 0u8;
        while salt.len() < self.mock_salt_len {
            let part = self.digest.hmac(&self.mock_key, &[b"salt", &[block], name.as_bytes()]);
            salt.extend_from_slice(&part);
            block = block.wrapping_add(1);
        }
        salt.truncate(self.mock_salt_len);
        let salt64 = ENGINE.encode(&salt);
        let sp = self.digest.hmac(&self.mock_key, &[b"key", name.as_bytes()]);
        ScramCredential::from_salted_password(self.digest, self.mock_iterations, salt64, &sp)
    }

    fn server_nonce(&self) -> Option<String> {
        let mut raw = Zeroizing::new([0u8; NONCE_LEN / 4 * 3]);
        self.rng.fill(&mut raw[..]).ok()?;
        Some(ENGINE.encode(&raw[..]))
    }

    fn client_first(&self, ctx: &mut Context<'_>, data: &[u8]) -> Step {
        let source = ctx.info().source();
        if data.is_empty() {
            tracing::debug!(target: LOG, "{source}: no data received from client");
            return error("other-error");
        }
        if data.contains(&0) {
            tracing::debug!(target: LOG, "{source}: NUL byte in data received from client");
            return error("other-error");
        }
        let rest = match data {
            [b'n' | b'y', b',', rest @ ..] => rest,
            [b'p', ..] => {
                tracing::debug!(target: LOG, "{source}: channel binding requested but unsupported");
                return error("channel-binding-not-supported");
            }
            _ => {
                tracing::debug!(target: LOG, "{source}: malformed GS2 header");
                return error("other-error");
            }
        };
        let (authzid, message) = match rest {
            [b'a', b'=', rest @ ..] => {
                let Some(end) = rest.iter().position(|b| *b == b',') else {
                    tracing::debug!(target: LOG, "{source}: malformed GS2 header (no end to authzid)");
                    return error("other-error");
                };
                if end > ACCOUNT_NAME_LEN {
                    tracing::debug!(target: LOG, "{source}: unacceptable authzid length {end}");
                    return error("authzid-too-long");
                }
                let Some(authzid) = decode_saslname(&rest[..end]).as_deref().and_then(prep_name) else {
                    tracing::debug!(target: LOG, "{source}: invalid authzid");
                    return error("invalid-username-encoding");
                };
                (Some(authzid), &rest[end + 1..])
            }
            [b',', rest @ ..] => (None, rest),
            _ => {
                tracing::debug!(target: LOG, "{source}: malformed GS2 header (bad authzid section)");
                return error("other-error");
            }
        };
        let gs2_b64 = ENGINE.encode(&data[..data.len() - message.len()]);

        let attrs = match AttrList::parse(message) {
            Ok(attrs) => attrs,
            Err(e) => {
                tracing::debug!(target: LOG, "{source}: {e}");
                return error("other-error");
            }
        };
        if attrs.contains(b'm') {
            tracing::debug!(target: LOG, "{source}: extensions are not supported");
            return error("extensions-not-supported");
        }
        let (Some(authcid), Some(cnonce)) = (attrs.get(b'n'), attrs.get(b'r')) else {
            tracing::debug!(target: LOG, "{source}: required attribute missing");
            return error("other-error");
        };
        if !(CLIENT_NONCE_MIN..=CLIENT_NONCE_MAX).contains(&cnonce.len())
            || cnonce.iter().any(|c| *c <= 0x20 || *c == b',' || *c >= 0x7F)
        {
            tracing::debug!(target: LOG, "{source}: client nonce unacceptable");
            return error("nonce-unacceptable");
        }
        if authcid.len() > ACCOUNT_NAME_LEN {
            tracing::debug!(target: LOG, "{source}: unacceptable authcid length {}", authcid.len());
            return error("authcid-too-long");
        }
        let Some(authcid) = decode_saslname(authcid).as_deref().and_then(prep_name) else {
            tracing::debug!(target: LOG, "{source}: invalid authcid");
            return error("invalid-username-encoding");
        };
        tracing::debug!(target: LOG, "{source}: parsed authcid {authcid:?}, authzid {authzid:?}");

        let (credential, account) = if ctx.accounts().find_by_name(&authcid).is_none() {
            tracing::debug!(target: LOG, "{source}: no account {authcid}, using a mock credential");
            (self.mock_credential(&authcid), None)
        } else {
            let Some(id) = ctx.authcid_can_login(&authcid) else {
                tracing::debug!(target: LOG, "{source}: authcid_can_login failed");
                return error("other-error");
            };
            if let Some(authzid) = &authzid {
                if ctx.authzid_can_login(authzid).is_none() {
                    tracing::debug!(target: LOG, "{source}: authzid_can_login failed");
                    return error("other-error");
                }
            }
            match self.credential_for(ctx, id, &source) {
                Ok(credential) => (credential, Some(id)),
                Err(step) => return step,
            }
        };

        let Some(snonce) = self.server_nonce() else {
            tracing::error!(target: LOG, "{source}: random number generator failed (BUG?)");
            return error("other-error");
        };
        // The client nonce was checked to be printable ASCII.
        let nonce = format!("{}{snonce}", String::from_utf8_lossy(cnonce));
        let server_first =
            format!("r={nonce},s={},i={}", credential.salt64, credential.iterations);
        ctx.set_state(ScramState {
            credential,
            account,
            client_first: Zeroizing::new(message.to_vec()),
            server_first: server_first.clone(),
            gs2_b64,
            nonce,
            complete: false,
        });
        Step::more(server_first)
    }

    fn credential_for(
        &self,
        ctx: &mut Context<'_>,
        id: AccountId,
        source: &str,
    ) -> Result<ScramCredential, Step> {
        let Some(account) = ctx.accounts().find_by_id(id) else {
            tracing::error!(target: LOG, "{source}: resolved account is missing (BUG)");
            return Err(error("other-error"));
        };
        if account.flags.no_password {
            tracing::debug!(target: LOG, "{source}: password authentication disabled for {}", account.name);
            return Err(error("other-error"));
        }
        if !account.flags.crypt {
            tracing::debug!(target: LOG, "{source}: password of {} is not encrypted", account.name);
            return Err(error("other-error"));
        }
        let Some(credential) = account.password.as_deref().and_then(|p| ctx.credentials().extract(p))
        else {
            tracing::debug!(target: LOG, "{source}: hash of {} is not SCRAM-compatible", account.name);
            return Err(error("other-error"));
        };
        if credential.digest != self.digest {
            tracing::debug!(
                target: LOG,
                "{source}: digest mismatch: server({}) != client({})",
                credential.digest,
                self.digest
            );
            ctx.recalc_mechlist(id, &credential.digest.avoid_list());
            return Err(error("digest-algorithm-mismatch"));
        }
        Ok(credential)
    }

    fn client_final(&self, ctx: &mut Context<'_>, data: &[u8]) -> Step {
        let source = ctx.info().source();
        if data.is_empty() {
            tracing::debug!(target: LOG, "{source}: no data received from client");
            return error("other-error");
        }
        if data.contains(&0) {
            tracing::debug!(target: LOG, "{source}: NUL byte in data received from client");
            return error("other-error");
        }
        if !self.account_exists(ctx) {
            tracing::debug!(target: LOG, "{source}: account dropped during negotiation");
            return error("other-error");
        }
        let Some(state) = ctx.state_mut::<ScramState>() else {
            return error("other-error");
        };
        let attrs = match AttrList::parse(data) {
            Ok(attrs) => attrs,
            Err(e) => {
                tracing::debug!(target: LOG, "{source}: {e}");
                return error("other-error");
            }
        };
        if attrs.contains(b'm') {
            tracing::debug!(target: LOG, "{source}: extensions are not supported");
            return error("extensions-not-supported");
        }
        let (Some(cbind), Some(proof64), Some(nonce)) =
            (attrs.get(b'c'), attrs.get(b'p'), attrs.get(b'r'))
        else {
            tracing::debug!(target: LOG, "{source}: required attribute missing");
            return error("other-error");
        };
        if nonce != state.nonce.as_bytes() {
            tracing::debug!(target: LOG, "{source}: nonce sent by client doesn't match nonce we sent");
            return error("nonce-unacceptable");
        }
        if cbind != state.gs2_b64.as_bytes() {
            tracing::debug!(target: LOG, "{source}: GS2 header mismatch");
            return error("other-error");
        }
        let digest = state.credential.digest;
        let proof = match ENGINE.decode(proof64) {
            Ok(proof) if proof.len() == digest.output_len() => Zeroizing::new(proof),
            _ => {
                tracing::debug!(target: LOG, "{source}: ClientProof is malformed");
                return error("other-error");
            }
        };

        let auth_message: [&[u8]; 7] = [
            state.client_first.as_slice(),
            b",",
            state.server_first.as_bytes(),
            b",c=",
            state.gs2_b64.as_bytes(),
            b",r=",
            state.nonce.as_bytes(),
        ];
        let client_sig = digest.hmac(&state.credential.stored_key, &auth_message);
        let client_key: Zeroizing<Vec<u8>> =
            Zeroizing::new(proof.iter().zip(client_sig.iter()).map(|(p, s)| p ^ s).collect());
        let stored_key = digest.hash(&client_key);
        if !bool::from(stored_key.as_slice().ct_eq(state.credential.stored_key.as_slice())) {
            tracing::debug!(target: LOG, "{source}: StoredKey mismatch; incorrect password?");
            return Step::Failure(error_token("invalid-proof"));
        }
        tracing::debug!(target: LOG, "{source}: authentication successful");

        let server_sig = digest.hmac(&state.credential.server_key, &auth_message);
        let reply = format!("v={}", ENGINE.encode(server_sig.as_slice()));
        state.complete = true;
        Step::Continue(Zeroizing::new(reply.into_bytes()))
    }

    fn account_exists(&self, ctx: &mut Context<'_>) -> bool {
        match ctx.state_mut::<ScramState>().map(|s| s.account) {
            Some(Some(id)) => ctx.accounts().find_by_id(id).is_some(),
            Some(None) => true,
            None => false,
        }
    }

    fn success(&self, ctx: &mut Context<'_>) -> Step {
        let source = ctx.info().source();
        if !self.account_exists(ctx) {
            tracing::debug!(target: LOG, "{source}: account dropped during negotiation");
            return Step::Error(Vec::new());
        }
        let Some(state) = ctx.state_mut::<ScramState>() else {
            return Step::Error(Vec::new());
        };
        let Some(id) = state.account else {
            tracing::error!(target: LOG, "{source}: unknown account passed verification (BUG)");
            return Step::Error(Vec::new());
        };
        if state.credential.native {
            return Step::Success;
        }
        // Replace the stored SaltedPassword, which is enough to impersonate the client,
        // with the keys derived from it.
        tracing::info!(target: LOG, "{source}: login succeeded, converting hash to SCRAM format");
        let credential = ScramCredential { native: true, ..state.credential.clone() };
        match ctx.rewrite_credential(id, &credential) {
            Ok(true) => {
                tracing::debug!(target: LOG, "{source}: hash converted");
                if let Some(state) = ctx.state_mut::<ScramState>() {
                    state.credential.native = true;
                }
                Step::Success
            }
            Ok(false) => {
                tracing::debug!(target: LOG, "{source}: account dropped during negotiation");
                Step::Error(Vec::new())
            }
            Err(e) => {
                tracing::error!(target: LOG, "{source}: could not encode SCRAM hash: {e} (BUG)");
                Step::Success
            }
        }
    }
}

impl Mechanism for Scram {
    fn name(&self) -> &str {
        self.digest.scram_name()
    }

    fn password_based(&self) -> bool {
        true
    }

    fn step(&self, ctx: &mut Context<'_>, data: &[u8]) -> Step {
        if !ctx.has_state() {
            return self.client_first(ctx, data);
        }
        let Some(complete) = ctx.state_mut::<ScramState>().map(|s| s.complete) else {
            tracing::error!(target: LOG, "{}: foreign mechanism state (BUG)", ctx.info().source());
            return error("other-error");
        };
        if complete {
            self.success(ctx)
        } else {
            self.client_final(ctx, data)
        }
    }
}

impl std::fmt::Debug for Scram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scram")
            .field("digest", &self.digest)
            .field("mock_iterations", &self.mock_iterations)
            .field("mock_salt_len", &self.mock_salt_len)
            .finish_non_exhaustive()
    }
}
