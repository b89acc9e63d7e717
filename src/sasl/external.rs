use super::{Context, Mechanism, Step};
use crate::consts::ACCOUNT_NAME_LEN;

/// The EXTERNAL mechanism (RFC 4422, appendix A).
///
/// Authenticates the account that owns the TLS client certificate fingerprint
/// the server reported when the client started.
/// The client's one message is an optional authzid.
#[derive(Clone, Copy, Default, Debug)]
pub struct External;

impl Mechanism for External {
    fn name(&self) -> &str {
        "EXTERNAL"
    }

    fn start(&self, ctx: &mut Context<'_>) -> Step {
        if ctx.info().certfp.is_none() {
            tracing::debug!(target: "saslserv", "{}: no client certificate", ctx.info().source());
            return Step::Error(Vec::new());
        }
        Step::more(Vec::new())
    }

    fn step(&self, ctx: &mut Context<'_>, data: &[u8]) -> Step {
        let source = ctx.info().source();
        let authzid = match std::str::from_utf8(data) {
            Ok(s) if s.len() <= ACCOUNT_NAME_LEN && !s.contains('\0') => s,
            _ => {
                tracing::debug!(target: "saslserv", "{source}: malformed EXTERNAL message");
                return Step::Error(Vec::new());
            }
        };
        let Some(certfp) = ctx.info().certfp.as_deref() else {
            return Step::Error(Vec::new());
        };
        let Some(name) = ctx.accounts().find_by_certfp(certfp).map(|a| a.name.clone()) else {
            tracing::debug!(target: "saslserv", "{source}: no account with fingerprint {certfp}");
            return Step::Error(Vec::new());
        };
        if ctx.authcid_can_login(&name).is_none() {
            tracing::debug!(target: "saslserv", "{source}: authcid_can_login failed");
            return Step::Error(Vec::new());
        }
        if !authzid.is_empty() && ctx.authzid_can_login(authzid).is_none() {
            tracing::debug!(target: "saslserv", "{source}: authzid_can_login failed");
            return Step::Error(Vec::new());
        }
        Step::Success
    }
}
