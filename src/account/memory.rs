use super::*;
use crate::string::{prep_name, IrcCasemap};
use std::collections::{BTreeMap, HashMap, HashSet};

type ImpersonateHook = Box<dyn Fn(&Account, &Account) -> bool + Send + Sync>;
type AdmissionHook = Box<dyn Fn(&Account) -> Admission + Send + Sync>;

/// An [`AccountDirectory`] that keeps everything in memory.
///
/// Names are looked up after SASLprep and casemapping.
/// Besides the built-in impersonation privileges, hooks can grant impersonation
/// or refuse logins.
pub struct MemoryDirectory {
    casemap: IrcCasemap,
    accounts: BTreeMap<AccountId, Account>,
    names: HashMap<String, AccountId>,
    next_id: u64,
    max_logins: usize,
    impersonate_hooks: Vec<ImpersonateHook>,
    admission_hooks: Vec<AdmissionHook>,
    online: HashSet<String>,
    logged_in: HashMap<String, AccountId>,
    bad_passwords: HashMap<AccountId, u32>,
}

impl MemoryDirectory {
    /// Creates an empty directory using the default casemapping.
    pub fn new() -> Self {
        MemoryDirectory::with_casemap(IrcCasemap::default())
    }

    /// Creates an empty directory using the provided casemapping.
    pub fn with_casemap(casemap: IrcCasemap) -> Self {
        MemoryDirectory {
            casemap,
            accounts: BTreeMap::new(),
            names: HashMap::new(),
            next_id: 1,
            max_logins: 5,
            impersonate_hooks: Vec::new(),
            admission_hooks: Vec::new(),
            online: HashSet::new(),
            logged_in: HashMap::new(),
            bad_passwords: HashMap::new(),
        }
    }

    /// Registers a new account.
    ///
    /// Returns `None` if the name is already taken or SASLprep rejects it.
    pub fn register(&mut self, name: &str, password: Option<String>) -> Option<AccountId> {
        let folded = self.key(name)?;
        if self.names.contains_key(&folded) {
            return None;
        }
        let id = AccountId(self.next_id);
        self.next_id += 1;
        let mut account = Account::new(id, name);
        account.flags.crypt = password.as_deref().is_some_and(|p| p.starts_with('$'));
        account.password = password;
        self.names.insert(folded, id);
        self.accounts.insert(id, account);
        Some(id)
    }

    /// Drops an account.
    pub fn drop_account(&mut self, id: AccountId) -> Option<Account> {
        let account = self.accounts.remove(&id)?;
        if let Some(key) = self.key(&account.name) {
            self.names.remove(&key);
        }
        self.logged_in.retain(|_, v| *v != id);
        self.bad_passwords.remove(&id);
        Some(account)
    }

    fn key(&self, name: &str) -> Option<String> {
        prep_name(name).map(|name| self.casemap.fold(&name))
    }

    /// Returns a mutable reference to an account.
    pub fn account_mut(&mut self, id: AccountId) -> Option<&mut Account> {
        self.accounts.get_mut(&id)
    }

    /// Sets how many clients may be logged into one account at once.
    pub fn set_max_logins(&mut self, max: usize) {
        self.max_logins = max;
    }

    /// Adds a check that may grant impersonation beyond the built-in privileges.
    pub fn add_impersonate_hook(
        &mut self,
        hook: impl Fn(&Account, &Account) -> bool + Send + Sync + 'static,
    ) {
        self.impersonate_hooks.push(Box::new(hook));
    }

    /// Adds a check that may refuse logins.
    pub fn add_admission_hook(&mut self, hook: impl Fn(&Account) -> Admission + Send + Sync + 'static) {
        self.admission_hooks.push(Box::new(hook));
    }

    /// Marks a user as being on the network.
    pub fn set_online(&mut self, uid: impl Into<String>) {
        self.online.insert(uid.into());
    }

    /// Returns the account a user is logged into, if any.
    pub fn logged_in(&self, uid: &str) -> Option<AccountId> {
        self.logged_in.get(uid).copied()
    }

    /// Returns how many failed authentication attempts an account has accumulated.
    pub fn bad_password_count(&self, id: AccountId) -> u32 {
        self.bad_passwords.get(&id).copied().unwrap_or_default()
    }

    /// Returns the number of accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Returns `true` if there are no accounts.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        MemoryDirectory::new()
    }
}

impl std::fmt::Debug for MemoryDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDirectory")
            .field("casemap", &self.casemap)
            .field("accounts", &self.accounts.len())
            .field("max_logins", &self.max_logins)
            .finish_non_exhaustive()
    }
}

impl AccountDirectory for MemoryDirectory {
    fn find_by_name(&self, name: &str) -> Option<&Account> {
        let id = self.names.get(&self.key(name)?)?;
        self.accounts.get(id)
    }

    fn find_by_id(&self, id: AccountId) -> Option<&Account> {
        self.accounts.get(&id)
    }

    fn find_by_certfp(&self, certfp: &str) -> Option<&Account> {
        self.accounts.values().find(|a| a.certfps.iter().any(|fp| fp.eq_ignore_ascii_case(certfp)))
    }

    fn can_impersonate(&self, source: &Account, target: &Account) -> bool {
        has_impersonate_priv(source, target) || self.impersonate_hooks.iter().any(|h| h(source, target))
    }

    fn login_admission(&self, account: &Account) -> Admission {
        if account.flags.frozen {
            return Admission::Deny("frozen".into());
        }
        if account.logins >= self.max_logins {
            return Admission::Deny("too many logins".into());
        }
        for hook in &self.admission_hooks {
            let result = hook(account);
            if !result.is_allowed() {
                return result;
            }
        }
        Admission::Allow
    }

    fn bad_password(&mut self, id: AccountId) {
        if self.accounts.contains_key(&id) {
            *self.bad_passwords.entry(id).or_default() += 1;
        }
    }

    fn set_password(&mut self, id: AccountId, hash: String) -> bool {
        let Some(account) = self.accounts.get_mut(&id) else {
            return false;
        };
        account.password = Some(hash);
        account.flags.crypt = true;
        true
    }

    fn user_online(&self, uid: &str) -> bool {
        self.online.contains(uid)
    }

    fn login(&mut self, uid: &str, id: AccountId) -> bool {
        let Some(account) = self.accounts.get_mut(&id) else {
            return false;
        };
        account.logins += 1;
        if let Some(old) = self.logged_in.insert(uid.to_owned(), id) {
            if let Some(old) = self.accounts.get_mut(&old) {
                old.logins = old.logins.saturating_sub(1);
            }
        }
        true
    }
}
