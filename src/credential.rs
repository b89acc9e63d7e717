//! Stored password credentials and their SCRAM decomposition.
//!
//! Hashes are stored in one of two layouts:
//! * `$z$<prf>$<iterations>$<salt>$<SaltedPassword>`, the legacy layout;
//! * `$z$<prf>$<iterations>$<salt>$<ServerKey>$<StoredKey>`, the SCRAM-native layout.
//!
//! All binary fields are base64-encoded, and `<prf>` is a [`DigestAlgorithm::prf_id`].
//! A legacy hash can be upgraded to the SCRAM-native layout without knowing the password,
//! and plaintext passwords can still be verified against either layout.


use crate::{
    account::{AccountDirectory, AccountId},
    config::Pbkdf2Options,
    digest::DigestAlgorithm,
    error::{ConfigError, CredentialError},
    string::prep_password,
};
use base64::engine::{general_purpose::STANDARD as ENGINE, Engine};
use ring::rand::{SecureRandom, SystemRandom};
use std::num::NonZeroU32;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

const PREFIX: &str = "$z$";

/// A stored credential decomposed into the values SCRAM needs.
#[derive(Clone)]
pub struct ScramCredential {
    /// The digest the credential was derived with.
    pub digest: DigestAlgorithm,
    /// The PBKDF2 iteration count.
    pub iterations: u32,
    /// The salt, base64-encoded exactly as it is sent to clients.
    pub salt64: String,
    /// `HMAC(SaltedPassword, "Server Key")`.
    pub server_key: Zeroizing<Vec<u8>>,
    /// `H(HMAC(SaltedPassword, "Client Key"))`.
    pub stored_key: Zeroizing<Vec<u8>>,
    /// Whether the stored hash is already in the SCRAM-native layout.
    pub native: bool,
}

impl ScramCredential {
    /// Derives a credential from a `SaltedPassword`.
    ///
    /// The result is marked as not native.
    pub fn from_salted_password(
        digest: DigestAlgorithm,
        iterations: u32,
        salt64: String,
        salted_password: &[u8],
    ) -> Self {
        let server_key = digest.hmac(salted_password, &[b"Server Key"]);
        let client_key = digest.hmac(salted_password, &[b"Client Key"]);
        let stored_key = digest.hash(&client_key);
        ScramCredential { digest, iterations, salt64, server_key, stored_key, native: false }
    }

    /// Encodes this credential in the SCRAM-native layout.
    pub fn encode(&self) -> Result<String, CredentialError> {
        if self.iterations == 0 {
            return Err(CredentialError::ZeroIterations);
        }
        let len = self.digest.output_len();
        if self.server_key.len() != len || self.stored_key.len() != len {
            return Err(CredentialError::KeyLength);
        }
        Ok(format!(
            "{PREFIX}{}${}${}${}${}",
            self.digest.prf_id(),
            self.iterations,
            self.salt64,
            ENGINE.encode(self.server_key.as_slice()),
            ENGINE.encode(self.stored_key.as_slice())
        ))
    }
}

impl std::fmt::Debug for ScramCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScramCredential")
            .field("digest", &self.digest)
            .field("iterations", &self.iterations)
            .field("salt64", &self.salt64)
            .field("native", &self.native)
            .finish_non_exhaustive()
    }
}

/// A store of password hashes that SCRAM can authenticate against.
pub trait CredentialStore {
    /// Decomposes a stored hash into a [`ScramCredential`].
    ///
    /// Returns `None` if the hash is not in a SCRAM-compatible format.
    fn extract(&self, hash: &str) -> Option<ScramCredential>;

    /// Checks a plaintext password against a stored hash.
    fn verify(&self, password: &[u8], hash: &str) -> bool;

    /// Writes a credential back to an account in the SCRAM-native layout.
    ///
    /// Returns `Ok(false)` if the account no longer exists.
    fn rewrite(
        &self,
        accounts: &mut dyn AccountDirectory,
        id: AccountId,
        credential: &ScramCredential,
    ) -> Result<bool, CredentialError> {
        let hash = credential.encode()?;
        Ok(accounts.set_password(id, hash))
    }
}

/// PBKDF2-based password hashing.
///
/// Passwords are prepared with SASLprep before hashing and verification.
pub struct Pbkdf2v2 {
    options: Pbkdf2Options,
    rng: SystemRandom,
}

impl Pbkdf2v2 {
    /// Creates a new hasher after validating `options`.
    pub fn new(options: Pbkdf2Options) -> Result<Self, ConfigError> {
        options.validate()?;
        Ok(Pbkdf2v2 { options, rng: SystemRandom::new() })
    }

    /// Returns the options new hashes are created with.
    pub fn options(&self) -> &Pbkdf2Options {
        &self.options
    }

    fn salted_password(&self, password: &[u8]) -> Result<(String, Zeroizing<Vec<u8>>), CredentialError> {
        let iterations =
            NonZeroU32::new(self.options.iterations).ok_or(CredentialError::ZeroIterations)?;
        let mut salt = vec![0u8; self.options.salt_len];
        self.rng.fill(&mut salt).map_err(|_| CredentialError::Random)?;
        let password = prep_password(password);
        let sp = self.options.digest.pbkdf2(iterations, &salt, &password);
        Ok((ENGINE.encode(salt), sp))
    }

    /// Hashes a password into the SCRAM-native layout.
    pub fn crypt(&self, password: &[u8]) -> Result<String, CredentialError> {
        let (salt64, sp) = self.salted_password(password)?;
        let opts = &self.options;
        ScramCredential::from_salted_password(opts.digest, opts.iterations, salt64, &sp).encode()
    }

    /// Hashes a password into the legacy layout.
    pub fn crypt_legacy(&self, password: &[u8]) -> Result<String, CredentialError> {
        let (salt64, sp) = self.salted_password(password)?;
        let opts = &self.options;
        Ok(format!(
            "{PREFIX}{}${}${salt64}${}",
            opts.digest.prf_id(),
            opts.iterations,
            ENGINE.encode(sp.as_slice())
        ))
    }
}

impl std::fmt::Debug for Pbkdf2v2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pbkdf2v2").field("options", &self.options).finish_non_exhaustive()
    }
}

fn decode_key(digest: DigestAlgorithm, field: &str) -> Option<Zeroizing<Vec<u8>>> {
    let key = Zeroizing::new(ENGINE.decode(field).ok()?);
    (key.len() == digest.output_len()).then_some(key)
}

impl CredentialStore for Pbkdf2v2 {
    fn extract(&self, hash: &str) -> Option<ScramCredential> {
        let rest = hash.strip_prefix(PREFIX)?;
        let mut fields = rest.split('$');
        let digest = DigestAlgorithm::from_prf_id(fields.next()?.parse().ok()?)?;
        let iterations: u32 = fields.next()?.parse().ok()?;
        if iterations == 0 {
            return None;
        }
        let salt64 = fields.next()?;
        if salt64.is_empty() || ENGINE.decode(salt64).is_err() {
            return None;
        }
        let first = decode_key(digest, fields.next()?)?;
        let credential = match fields.next() {
            None => ScramCredential::from_salted_password(digest, iterations, salt64.to_owned(), &first),
            Some(stored) => ScramCredential {
                digest,
                iterations,
                salt64: salt64.to_owned(),
                server_key: first,
                stored_key: decode_key(digest, stored)?,
                native: true,
            },
        };
        if fields.next().is_some() {
            return None;
        }
        Some(credential)
    }

    fn verify(&self, password: &[u8], hash: &str) -> bool {
        let Some(credential) = self.extract(hash) else {
            return false;
        };
        let Some(iterations) = NonZeroU32::new(credential.iterations) else {
            return false;
        };
        let Ok(salt) = ENGINE.decode(&credential.salt64) else {
            return false;
        };
        let sp = credential.digest.pbkdf2(iterations, &salt, &prep_password(password));
        let server_key = credential.digest.hmac(&sp, &[b"Server Key"]);
        bool::from(server_key.as_slice().ct_eq(credential.server_key.as_slice()))
    }
}
