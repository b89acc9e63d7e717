//! The account directory that authentication is checked against.
//!
//! The negotiation engine never stores references to accounts between events.
//! It keeps [`AccountId`]s and resolves them again when they are needed,
//! so an account that disappears mid-negotiation is noticed instead of used.

mod memory;

pub use memory::*;

/// Privilege allowing impersonation of any account.
pub const PRIV_IMPERSONATE_ANY: &str = "impersonate:any";
/// Prefix of privileges allowing impersonation of accounts of a given oper class.
pub const PRIV_IMPERSONATE_CLASS: &str = "impersonate:class:";
/// Prefix of privileges allowing impersonation of one named account.
pub const PRIV_IMPERSONATE_ENTITY: &str = "impersonate:entity:";

/// A stable identifier for an account.
///
/// Unlike names, these never change or get reused.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct AccountId(pub u64);

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:09}", self.0)
    }
}

/// Flags on an account that matter for authentication.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
#[non_exhaustive]
pub struct AccountFlags {
    /// The account has been frozen by staff.
    pub frozen: bool,
    /// Password-based authentication is disabled for this account.
    pub no_password: bool,
    /// The password field holds a hash rather than plaintext.
    pub crypt: bool,
}

/// A registered account.
#[derive(Clone, Debug)]
pub struct Account {
    /// The account's stable identifier.
    pub id: AccountId,
    /// The account's name as registered.
    pub name: String,
    /// The stored password or password hash, if any.
    pub password: Option<String>,
    /// Flags on the account.
    pub flags: AccountFlags,
    /// The oper class of the account, if the account is an oper.
    pub class: Option<String>,
    /// Privileges granted to the account.
    pub privileges: Vec<String>,
    /// TLS client certificate fingerprints associated with the account.
    pub certfps: Vec<String>,
    /// How many clients are currently logged in to the account.
    pub logins: usize,
}

impl Account {
    /// Creates a new account with no password and no privileges.
    pub fn new(id: AccountId, name: impl Into<String>) -> Self {
        Account {
            id,
            name: name.into(),
            password: None,
            flags: AccountFlags::default(),
            class: None,
            privileges: Vec::new(),
            certfps: Vec::new(),
            logins: 0,
        }
    }

    /// Returns `true` if this account has the named privilege.
    pub fn has_priv(&self, privilege: &str) -> bool {
        self.privileges.iter().any(|p| p == privilege)
    }

    /// Returns the oper class name used for impersonation checks.
    pub fn class_name(&self) -> &str {
        self.class.as_deref().unwrap_or("user")
    }
}

/// The result of checking whether an account may be logged into.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Admission {
    /// The login may proceed.
    Allow,
    /// The login is refused for the given reason.
    Deny(String),
}

impl Admission {
    /// Returns `true` if this is [`Admission::Allow`].
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allow)
    }
}

/// The directory of accounts that clients authenticate as.
pub trait AccountDirectory {
    /// Looks up an account by name, applying SASLprep and the directory's casemapping.
    fn find_by_name(&self, name: &str) -> Option<&Account>;

    /// Looks up an account by identifier.
    fn find_by_id(&self, id: AccountId) -> Option<&Account>;

    /// Looks up the account owning a TLS client certificate fingerprint.
    fn find_by_certfp(&self, _certfp: &str) -> Option<&Account> {
        None
    }

    /// Returns `true` if `source` may log in as `target`.
    ///
    /// Only called when the two accounts differ.
    fn can_impersonate(&self, source: &Account, target: &Account) -> bool;

    /// Checks whether `account` may be logged into right now.
    fn login_admission(&self, account: &Account) -> Admission;

    /// Applies the penalty for a failed authentication attempt against an account.
    fn bad_password(&mut self, id: AccountId);

    /// Replaces the stored password hash of an account.
    ///
    /// Returns `false` if the account no longer exists.
    fn set_password(&mut self, id: AccountId, hash: String) -> bool;

    /// Returns `true` if the user with this UID is already on the network.
    fn user_online(&self, _uid: &str) -> bool {
        false
    }

    /// Logs the user with this UID into an account.
    ///
    /// Returns `false` if the account no longer exists.
    fn login(&mut self, uid: &str, id: AccountId) -> bool;
}

/// Checks the impersonation privileges `source` holds over `target`.
///
/// Does not consider whether the accounts are the same.
pub fn has_impersonate_priv(source: &Account, target: &Account) -> bool {
    if source.has_priv(PRIV_IMPERSONATE_ANY) {
        return true;
    }
    let class = format!("{PRIV_IMPERSONATE_CLASS}{}", target.class_name());
    if source.has_priv(&class) {
        return true;
    }
    let entity = format!("{PRIV_IMPERSONATE_ENTITY}{}", target.name);
    source.has_priv(&entity)
}
