use super::{Context, Mechanism, Step};
use crate::{consts::ACCOUNT_NAME_LEN, string::prep_password};
use subtle::ConstantTimeEq;

/// The PLAIN mechanism (RFC 4616).
///
/// The client's one message is `authzid NUL authcid NUL password`.
/// An empty authzid means the client wants to act as the authcid.
#[derive(Clone, Copy, Default, Debug)]
pub struct Plain;

fn parse(data: &[u8]) -> Option<(&str, &str, &[u8])> {
    let mut fields = data.splitn(3, |b| *b == 0);
    let authzid = std::str::from_utf8(fields.next()?).ok()?;
    let authcid = std::str::from_utf8(fields.next()?).ok()?;
    let password = fields.next()?;
    if authcid.is_empty() || password.is_empty() || password.contains(&0) {
        return None;
    }
    if authcid.len() > ACCOUNT_NAME_LEN || authzid.len() > ACCOUNT_NAME_LEN {
        return None;
    }
    Some((authzid, authcid, password))
}

impl Mechanism for Plain {
    fn name(&self) -> &str {
        "PLAIN"
    }

    fn password_based(&self) -> bool {
        true
    }

    fn step(&self, ctx: &mut Context<'_>, data: &[u8]) -> Step {
        let source = ctx.info().source();
        let Some((authzid, authcid, password)) = parse(data) else {
            tracing::debug!(target: "saslserv", "{source}: malformed PLAIN message");
            return Step::Error(Vec::new());
        };
        let Some(id) = ctx.authcid_can_login(authcid) else {
            tracing::debug!(target: "saslserv", "{source}: authcid_can_login failed");
            return Step::Error(Vec::new());
        };
        if !authzid.is_empty() && ctx.authzid_can_login(authzid).is_none() {
            tracing::debug!(target: "saslserv", "{source}: authzid_can_login failed");
            return Step::Error(Vec::new());
        }
        let Some(account) = ctx.accounts().find_by_id(id) else {
            return Step::Error(Vec::new());
        };
        if account.flags.no_password {
            tracing::debug!(target: "saslserv", "{source}: password authentication disabled for {}", account.name);
            return Step::Error(Vec::new());
        }
        let verified = match account.password.as_deref() {
            Some(hash) if account.flags.crypt => ctx.credentials().verify(password, hash),
            Some(plain) => {
                bool::from(prep_password(plain.as_bytes()).ct_eq(&prep_password(password)))
            }
            None => false,
        };
        if verified {
            Step::Success
        } else {
            Step::Failure(Vec::new())
        }
    }
}
