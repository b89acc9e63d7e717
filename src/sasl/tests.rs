use super::*;
use crate::{
    account::{AccountDirectory, MemoryDirectory, PRIV_IMPERSONATE_ANY},
    config::{Options, Pbkdf2Options},
    consts::{pbkdf2::ITERATIONS_MIN, FRAME_LEN, MECHANISM_NAME_LEN},
    credential::Pbkdf2v2,
    digest::DigestAlgorithm,
};
use base64::engine::{general_purpose::STANDARD as ENGINE, Engine as _};
use std::{num::NonZeroU32, sync::Arc};

const SERVER: &str = "irc.example.net";
const UID: &str = "1ABAAAAAB";

type TestEngine = Engine<MemoryDirectory, Pbkdf2v2>;

fn options() -> Pbkdf2Options {
    Pbkdf2Options { digest: DigestAlgorithm::Sha256, iterations: ITERATIONS_MIN, salt_len: 16 }
}

fn engine() -> TestEngine {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let store = Pbkdf2v2::new(options()).unwrap();
    let mut engine = Engine::new(Options::default(), MemoryDirectory::new(), store).unwrap();
    engine.register(Arc::new(Plain));
    engine.register(Arc::new(External));
    engine.configure_scram(&options()).unwrap();
    engine
}

fn register(engine: &mut TestEngine, name: &str, password: &str) -> AccountId {
    let hash = engine.credentials().crypt(password.as_bytes()).unwrap();
    engine.accounts_mut().register(name, Some(hash)).unwrap()
}

fn id() -> SessionId {
    SessionId::from(UID)
}

fn start(engine: &mut TestEngine, mechanism: &str) -> Vec<Outbound> {
    let msg = Inbound::StartAuth { session: id(), mechanism: mechanism.into(), certfp: None };
    engine.handle(SERVER, msg)
}

fn send(engine: &mut TestEngine, data: &str) -> Vec<Outbound> {
    engine.handle(SERVER, Inbound::ClientData { session: id(), data: data.into() })
}

fn send_raw(engine: &mut TestEngine, data: &[u8]) -> Vec<Outbound> {
    let mut out = Vec::new();
    for chunk in crate::string::base64::ChunkEncoder::new(data, FRAME_LEN) {
        out.extend(send(engine, &chunk));
    }
    out
}

fn server_data(chunk: &str) -> Outbound {
    Outbound::ServerData { session: id(), chunk: chunk.into() }
}

fn outcome(outcome: Outcome) -> Outbound {
    Outbound::Outcome { session: id(), outcome }
}

fn login(account: &str) -> Outbound {
    Outbound::Login { session: id(), account: account.into() }
}

#[test]
fn plain_login_online_user() {
    let mut e = engine();
    let alice = register(&mut e, "Alice", "hunter2");
    e.accounts_mut().set_online(UID);

    assert_eq!(start(&mut e, "PLAIN"), vec![server_data("+")]);
    assert_eq!(e.session(UID).unwrap().mechanism(), Some("PLAIN"));
    let out = send_raw(&mut e, b"\0alice\0hunter2");
    assert_eq!(out, vec![login("Alice"), outcome(Outcome::Success)]);
    assert!(e.session(UID).is_none());
    assert_eq!(e.accounts().logged_in(UID), Some(alice));
}

#[test]
fn plain_plaintext_password() {
    let mut e = engine();
    e.accounts_mut().register("legacy", Some("swordfish".into())).unwrap();
    e.accounts_mut().set_online(UID);
    start(&mut e, "PLAIN");
    assert_eq!(send_raw(&mut e, b"\0legacy\0swordfish"), vec![login("legacy"), outcome(Outcome::Success)]);
}

#[test]
fn plain_long_message_spans_frames() {
    let mut e = engine();
    let password = "x".repeat(400);
    register(&mut e, "alice", &password);
    e.accounts_mut().set_online(UID);
    start(&mut e, "PLAIN");

    let raw = format!("\0alice\0{password}");
    let encoded = ENGINE.encode(&raw);
    assert!(encoded.len() > FRAME_LEN);
    assert!(send(&mut e, &encoded[..FRAME_LEN]).is_empty());
    assert_eq!(e.session(UID).unwrap().buffered(), FRAME_LEN);
    let out = send(&mut e, &encoded[FRAME_LEN..]);
    assert_eq!(out, vec![login("alice"), outcome(Outcome::Success)]);
}

#[test]
fn wrong_password_is_penalized() {
    let mut e = engine();
    let alice = register(&mut e, "alice", "hunter2");
    start(&mut e, "PLAIN");
    assert_eq!(send_raw(&mut e, b"\0alice\0hunter3"), vec![outcome(Outcome::Failure)]);
    assert_eq!(e.accounts().bad_password_count(alice), 1);
    assert!(e.session(UID).is_none());
}

#[test]
fn malformed_input_is_not_penalized() {
    let mut e = engine();
    let alice = register(&mut e, "alice", "hunter2");
    for msg in [&b"alice\0hunter2"[..], b"\0\0hunter2", b"\0alice\0", b"\0nobody\0hunter2"] {
        start(&mut e, "PLAIN");
        assert_eq!(send_raw(&mut e, msg), vec![outcome(Outcome::Failure)]);
        assert!(e.session(UID).is_none());
    }
    assert_eq!(e.accounts().bad_password_count(alice), 0);
}

#[test]
fn deferred_login() {
    let mut e = engine();
    let alice = register(&mut e, "alice", "hunter2");
    start(&mut e, "PLAIN");
    assert_eq!(send_raw(&mut e, b"\0alice\0hunter2"), vec![login("alice"), outcome(Outcome::Success)]);

    let session = e.session(UID).unwrap();
    assert_eq!(session.pending().unwrap().account.id, alice);
    assert_eq!(session.pending().unwrap().mechanism, "PLAIN");
    assert!(session.mechanism().is_none());
    assert_eq!(e.accounts().logged_in(UID), None);

    assert!(e.user_introduced(UID).is_empty());
    assert!(e.session(UID).is_none());
    assert_eq!(e.accounts().logged_in(UID), Some(alice));
    assert_eq!(e.accounts().find_by_id(alice).unwrap().logins, 1);
}

#[test]
fn deferred_login_account_dropped() {
    let mut e = engine();
    let alice = register(&mut e, "alice", "hunter2");
    start(&mut e, "PLAIN");
    send_raw(&mut e, b"\0alice\0hunter2");
    e.accounts_mut().drop_account(alice);

    let notice = Outbound::Notice { session: id(), text: "Account alice dropped, login cancelled".into() };
    assert_eq!(e.user_introduced(UID), vec![notice]);
    assert!(e.session(UID).is_none());
    assert_eq!(e.accounts().logged_in(UID), None);
    assert!(e.user_introduced(UID).is_empty());
}

#[test]
fn pending_login_survives_reset() {
    let mut e = engine();
    register(&mut e, "alice", "hunter2");
    start(&mut e, "PLAIN");
    send_raw(&mut e, b"\0alice\0hunter2");

    // A second failed attempt keeps the first login.
    start(&mut e, "PLAIN");
    assert_eq!(send_raw(&mut e, b"garbage"), vec![outcome(Outcome::Failure)]);
    let session = e.session(UID).unwrap();
    assert!(session.pending().is_some());
    assert!(session.authcid().is_none());

    e.handle(SERVER, Inbound::Done { session: id() });
    assert!(e.session(UID).unwrap().pending().is_some());
}

#[test]
fn done_destroys_idle_session() {
    let mut e = engine();
    start(&mut e, "PLAIN");
    assert!(e.handle(SERVER, Inbound::Done { session: id() }).is_empty());
    assert!(e.session(UID).is_none());
}

#[test]
fn impersonation() {
    let mut e = engine();
    register(&mut e, "alice", "hunter2");
    let bob = register(&mut e, "bob", "tr0ub4dor");
    e.accounts_mut().set_online(UID);

    start(&mut e, "PLAIN");
    assert_eq!(send_raw(&mut e, b"bob\0alice\0hunter2"), vec![outcome(Outcome::Failure)]);

    let oper = register(&mut e, "oper", "opersecret");
    e.accounts_mut().account_mut(oper).unwrap().privileges.push(PRIV_IMPERSONATE_ANY.into());
    start(&mut e, "PLAIN");
    assert_eq!(send_raw(&mut e, b"bob\0oper\0opersecret"), vec![login("bob"), outcome(Outcome::Success)]);
    assert_eq!(e.accounts().logged_in(UID), Some(bob));
}

#[test]
fn impersonation_target_admission() {
    let mut e = engine();
    let oper = register(&mut e, "oper", "opersecret");
    let bob = register(&mut e, "bob", "tr0ub4dor");
    e.accounts_mut().account_mut(oper).unwrap().privileges.push(PRIV_IMPERSONATE_ANY.into());
    e.accounts_mut().add_admission_hook(move |a| {
        if a.id == bob {
            Admission::Deny("suspended".into())
        } else {
            Admission::Allow
        }
    });
    start(&mut e, "PLAIN");
    assert_eq!(send_raw(&mut e, b"bob\0oper\0opersecret"), vec![outcome(Outcome::Failure)]);
}

#[test]
fn unknown_mechanism_sends_list() {
    let mut e = engine();
    let list = Outbound::MechanismList {
        session: id(),
        mechanisms: "PLAIN,EXTERNAL,SCRAM-SHA-256".into(),
    };
    assert_eq!(start(&mut e, "DIGEST-MD5"), vec![list]);
    let session = e.session(UID).unwrap();
    assert!(session.mechanism().is_none());
    assert_eq!(start(&mut e, "PLAIN"), vec![server_data("+")]);
}

#[test]
fn aborts() {
    let mut e = engine();

    start(&mut e, "PLAIN");
    assert_eq!(send(&mut e, "*"), vec![outcome(Outcome::Failure)]);
    assert!(e.session(UID).is_none());

    start(&mut e, "PLAIN");
    assert_eq!(start(&mut e, "EXTERNAL"), vec![outcome(Outcome::Failure)]);
    assert!(e.session(UID).is_none());

    start(&mut e, "PLAIN");
    assert_eq!(send(&mut e, &"A".repeat(FRAME_LEN + 1)), vec![outcome(Outcome::Failure)]);
    assert!(e.session(UID).is_none());

    start(&mut e, "PLAIN");
    assert_eq!(send(&mut e, "!!!"), vec![outcome(Outcome::Failure)]);
    assert!(e.session(UID).is_none());

    let name = "X".repeat(MECHANISM_NAME_LEN + 1);
    assert_eq!(start(&mut e, &name), vec![outcome(Outcome::Failure)]);
    assert!(e.session(UID).is_none());
}

#[test]
fn frames_for_unknown_sessions_are_ignored() {
    let mut e = engine();
    assert!(send(&mut e, "AAAA").is_empty());
    assert!(send(&mut e, "*").is_empty());
    assert!(e.handle(SERVER, Inbound::Done { session: id() }).is_empty());
    assert!(e.sessions().is_empty());
}

#[test]
fn invalid_options() {
    let store = Pbkdf2v2::new(options()).unwrap();
    let options = Options { sweep_secs: 0, ..Options::default() };
    assert!(Engine::new(options, MemoryDirectory::new(), store).is_err());
}

#[test]
fn overflow() {
    let mut e = engine();
    start(&mut e, "PLAIN");
    let frame = "A".repeat(FRAME_LEN);
    for _ in 0..10 {
        assert!(send(&mut e, &frame).is_empty());
    }
    assert_eq!(send(&mut e, &frame), vec![outcome(Outcome::Failure)]);
    assert!(e.session(UID).is_none());
}

#[test]
fn external() {
    let mut e = engine();
    let alice = register(&mut e, "alice", "hunter2");
    e.accounts_mut().account_mut(alice).unwrap().certfps.push("ABCDEF0123".into());
    e.accounts_mut().set_online(UID);

    let msg = Inbound::StartAuth {
        session: id(),
        mechanism: "EXTERNAL".into(),
        certfp: Some("abcdef0123".into()),
    };
    assert_eq!(e.handle(SERVER, msg), vec![server_data("+")]);
    assert!(e.session(UID).unwrap().info().secure);
    assert_eq!(send(&mut e, "+"), vec![login("alice"), outcome(Outcome::Success)]);

    // No fingerprint.
    assert_eq!(start(&mut e, "EXTERNAL"), vec![outcome(Outcome::Failure)]);

    // Unknown fingerprint.
    let msg = Inbound::StartAuth { session: id(), mechanism: "EXTERNAL".into(), certfp: Some("00".into()) };
    e.handle(SERVER, msg);
    assert_eq!(send(&mut e, "+"), vec![outcome(Outcome::Failure)]);
}

#[test]
fn host_info() {
    let mut e = engine();
    let msg = Inbound::HostInfo {
        session: id(),
        host: "example.org".into(),
        ip: "192.0.2.1".into(),
        secure: true,
    };
    assert!(e.handle("irc.example.org", msg).is_empty());
    let info = e.session(UID).unwrap().info();
    assert_eq!(info.source(), "SASL/1ABAAAAAB:example.org[192.0.2.1]:irc.example.org");
    assert_eq!(info.source_name(false), "Unknown user on irc.example.org (via SASL)");
    assert_eq!(info.source_name(true), "Unknown user (via SASL)");
    assert!(info.secure);

    // Later host information does not replace the first.
    let msg = Inbound::HostInfo {
        session: id(),
        host: "spoofed.example".into(),
        ip: "198.51.100.7".into(),
        secure: false,
    };
    assert!(e.handle("irc.example.org", msg).is_empty());
    let info = e.session(UID).unwrap().info();
    assert_eq!(info.source(), "SASL/1ABAAAAAB:example.org[192.0.2.1]:irc.example.org");
    assert!(info.secure);
}

#[test]
fn sweep() {
    let mut e = engine();
    start(&mut e, "PLAIN");
    assert_eq!(e.sweep(), 0);
    assert!(e.session(UID).unwrap().is_marked());
    // Any frame clears the mark.
    send(&mut e, &"A".repeat(FRAME_LEN));
    assert!(!e.session(UID).unwrap().is_marked());
    assert_eq!(e.sweep(), 0);
    assert_eq!(e.sweep(), 1);
    assert!(e.sessions().is_empty());
}

#[test]
fn sweep_logs_pending_login() {
    let mut e = engine();
    register(&mut e, "alice", "hunter2");
    start(&mut e, "PLAIN");
    send_raw(&mut e, b"\0alice\0hunter2");
    e.sweep();
    assert_eq!(e.sweep(), 1);
    assert_eq!(e.accounts().logged_in(UID), None);
}

#[test]
fn registry_changes() {
    let mut e = engine();
    assert_eq!(e.register(Arc::new(Plain)), Vec::<Outbound>::new());
    assert_eq!(
        e.server_eob(),
        vec![Outbound::NetworkMechanismList("PLAIN,EXTERNAL,SCRAM-SHA-256".into())]
    );
    assert!(e.is_connected());

    start(&mut e, "PLAIN");
    assert_eq!(e.register(Arc::new(Plain)), Vec::<Outbound>::new());
    assert_eq!(e.registry().len(), 3);
    assert_eq!(e.session(UID).unwrap().mechanism(), Some("PLAIN"));
    assert_eq!(
        e.unregister("PLAIN"),
        vec![Outbound::NetworkMechanismList("EXTERNAL,SCRAM-SHA-256".into())]
    );
    assert!(e.session(UID).is_none());
    assert_eq!(e.unregister("PLAIN"), Vec::<Outbound>::new());
    assert_eq!(
        e.register(Arc::new(Plain)),
        vec![Outbound::NetworkMechanismList("EXTERNAL,SCRAM-SHA-256,PLAIN".into())]
    );
}

#[test]
fn configure_scram_switches_digest() {
    let mut e = engine();
    e.server_eob();
    start(&mut e, "SCRAM-SHA-256");
    let options = Pbkdf2Options { digest: DigestAlgorithm::Sha512, ..options() };
    assert_eq!(
        e.configure_scram(&options).unwrap(),
        vec![Outbound::NetworkMechanismList("PLAIN,EXTERNAL,SCRAM-SHA-512".into())]
    );
    assert!(e.session(UID).is_none());
    assert_eq!(e.configure_scram(&options).unwrap(), Vec::<Outbound>::new());

    let list = Outbound::MechanismList {
        session: id(),
        mechanisms: "PLAIN,EXTERNAL,SCRAM-SHA-512".into(),
    };
    assert_eq!(start(&mut e, "SCRAM-SHA-256"), vec![list]);
    assert!(e.session(UID).unwrap().mechanism().is_none());
}

#[test]
fn mechlist_for_account() {
    let mut e = engine();
    let alice = register(&mut e, "alice", "hunter2");
    let account = e.accounts().find_by_id(alice).unwrap();
    assert_eq!(e.registry().mechlist_for(account, &[]), "PLAIN,EXTERNAL,SCRAM-SHA-256");
    assert_eq!(e.registry().mechlist_for(account, &["PLAIN"]), "EXTERNAL,SCRAM-SHA-256");

    e.accounts_mut().account_mut(alice).unwrap().flags.no_password = true;
    let account = e.accounts().find_by_id(alice).unwrap();
    assert_eq!(e.registry().mechlist_for(account, &[]), "EXTERNAL");
}

struct Named(String);

impl Mechanism for Named {
    fn name(&self) -> &str {
        &self.0
    }
    fn step(&self, _: &mut Context<'_>, _: &[u8]) -> Step {
        Step::Error(Vec::new())
    }
}

#[test]
fn mechanism_names_are_bounded() {
    let mut e = engine();
    let name = "X".repeat(MECHANISM_NAME_LEN + 1);
    assert_eq!(e.register(Arc::new(Named(name))), Vec::<Outbound>::new());
    assert_eq!(e.registry().len(), 3);
    let name = "X".repeat(MECHANISM_NAME_LEN);
    assert!(e.registry().find(&name).is_none());
    e.register(Arc::new(Named(name.clone())));
    assert!(e.registry().find(&name).is_some());
}

#[test]
fn mechlist_stays_in_one_frame() {
    let mut registry = Registry::new();
    for i in 0..20 {
        registry.register(Arc::new(Named(format!("X-MECHANISM-{i:02}-{}", "Y".repeat(10)))));
    }
    assert_eq!(registry.len(), 20);
    let list = registry.mechlist();
    assert!(list.len() < FRAME_LEN);
    assert!(list.split(',').all(|n| n.len() == 25));
    assert_eq!(list.split(',').count(), 15);
}

fn scram_client_final(password: &str, bare: &str, server_first: &str) -> (String, String) {
    let digest = DigestAlgorithm::Sha256;
    let field = |name: &str| {
        server_first.split(',').find_map(|f| f.strip_prefix(name)).unwrap().to_owned()
    };
    let salt = ENGINE.decode(field("s=")).unwrap();
    let iterations = NonZeroU32::new(field("i=").parse().unwrap()).unwrap();
    let sp = digest.pbkdf2(iterations, &salt, password.as_bytes());
    let client_key = digest.hmac(&sp, &[b"Client Key"]);
    let stored_key = digest.hash(&client_key);
    let without_proof = format!("c=biws,r={}", field("r="));
    let am = format!("{bare},{server_first},{without_proof}");
    let sig = digest.hmac(&stored_key, &[am.as_bytes()]);
    let proof: Vec<u8> = client_key.iter().zip(sig.iter()).map(|(a, b)| a ^ b).collect();
    let server_sig = digest.hmac(&digest.hmac(&sp, &[b"Server Key"]), &[am.as_bytes()]);
    (
        format!("{without_proof},p={}", ENGINE.encode(proof)),
        format!("v={}", ENGINE.encode(server_sig.as_slice())),
    )
}

fn decode_reply(out: &[Outbound]) -> String {
    let [Outbound::ServerData { chunk, .. }] = out else {
        panic!("expected one frame, got {out:?}");
    };
    String::from_utf8(ENGINE.decode(chunk).unwrap()).unwrap()
}

#[test]
fn scram_through_engine() {
    let mut e = engine();
    register(&mut e, "alice", "correct horse");
    e.accounts_mut().set_online(UID);

    assert_eq!(start(&mut e, "SCRAM-SHA-256"), vec![server_data("+")]);
    let bare = "n=alice,r=0123456789abcdef";
    let server_first = decode_reply(&send_raw(&mut e, format!("n,,{bare}").as_bytes()));
    assert!(server_first.starts_with("r=0123456789abcdef"));
    let (msg, sig) = scram_client_final("correct horse", bare, &server_first);
    assert_eq!(decode_reply(&send_raw(&mut e, msg.as_bytes())), sig);
    assert_eq!(send(&mut e, "+"), vec![login("alice"), outcome(Outcome::Success)]);
}

#[test]
fn scram_errors_are_sent_before_outcome() {
    let mut e = engine();
    start(&mut e, "SCRAM-SHA-256");
    let out = send_raw(&mut e, b"p=tls-unique,,n=alice,r=0123456789");
    let token = ENGINE.encode("e=channel-binding-not-supported");
    assert_eq!(out, vec![server_data(&token), outcome(Outcome::Failure)]);
    assert!(e.session(UID).is_none());
}

#[test]
fn scram_wrong_user_and_password() {
    let mut e = engine();
    let alice = register(&mut e, "alice", "correct horse");
    let bare = "n=alice,r=0123456789abcdef";
    start(&mut e, "SCRAM-SHA-256");
    let server_first = decode_reply(&send_raw(&mut e, format!("n,,{bare}").as_bytes()));
    let (msg, _) = scram_client_final("battery staple", bare, &server_first);
    let invalid = server_data(&ENGINE.encode("e=invalid-proof"));
    assert_eq!(send_raw(&mut e, msg.as_bytes()), vec![invalid.clone(), outcome(Outcome::Failure)]);
    assert_eq!(e.accounts().bad_password_count(alice), 1);

    let bare = "n=mallory,r=0123456789abcdef";
    start(&mut e, "SCRAM-SHA-256");
    let server_first = decode_reply(&send_raw(&mut e, format!("n,,{bare}").as_bytes()));
    let (msg, _) = scram_client_final("battery staple", bare, &server_first);
    assert_eq!(send_raw(&mut e, msg.as_bytes()), vec![invalid, outcome(Outcome::Failure)]);
}

#[test]
fn scram_digest_mismatch_resends_list() {
    let mut e = engine();
    let sha1 = Pbkdf2v2::new(Pbkdf2Options { digest: DigestAlgorithm::Sha1, ..options() }).unwrap();
    let hash = sha1.crypt(b"pw").unwrap();
    e.accounts_mut().register("old", Some(hash)).unwrap();

    start(&mut e, "SCRAM-SHA-256");
    let out = send_raw(&mut e, b"n,,n=old,r=0123456789");
    let list = Outbound::MechanismList { session: id(), mechanisms: "PLAIN,EXTERNAL".into() };
    let token = server_data(&ENGINE.encode("e=digest-algorithm-mismatch"));
    assert_eq!(out, vec![list, token, outcome(Outcome::Failure)]);
}

#[test]
fn scram_channel_binding_mismatch_is_not_penalized() {
    let mut e = engine();
    let alice = register(&mut e, "alice", "correct horse");
    let bare = "n=alice,r=0123456789abcdef";
    start(&mut e, "SCRAM-SHA-256");
    let server_first = decode_reply(&send_raw(&mut e, format!("n,,{bare}").as_bytes()));
    let (msg, _) = scram_client_final("correct horse", bare, &server_first);
    // The client claims it sent `y,,` in its first message.
    let msg = msg.replacen("c=biws", "c=eSws", 1);
    let token = server_data(&ENGINE.encode("e=other-error"));
    assert_eq!(send_raw(&mut e, msg.as_bytes()), vec![token, outcome(Outcome::Failure)]);
    assert_eq!(e.accounts().bad_password_count(alice), 0);
    assert!(e.session(UID).is_none());
}

#[test]
fn scram_fullwidth_authcid() {
    let mut e = engine();
    register(&mut e, "alice", "correct\u{00A0}horse");
    e.accounts_mut().set_online(UID);
    let bare = "n=\u{FF41}\u{FF4C}\u{FF49}\u{FF43}\u{FF45},r=abcdefghijkl";
    start(&mut e, "SCRAM-SHA-256");
    let server_first = decode_reply(&send_raw(&mut e, format!("n,,{bare}").as_bytes()));
    // Clients prepare the password themselves.
    let (msg, sig) = scram_client_final("correct horse", bare, &server_first);
    assert_eq!(decode_reply(&send_raw(&mut e, msg.as_bytes())), sig);
    assert_eq!(send(&mut e, "+"), vec![login("alice"), outcome(Outcome::Success)]);
}

#[test]
fn plain_identities_and_passwords_are_saslprepped() {
    let mut e = engine();
    let alice = register(&mut e, "alice", "correct\u{00A0}horse");
    e.accounts_mut().set_online(UID);
    start(&mut e, "PLAIN");
    let msg = "\0\u{FF41}lice\0correct horse";
    assert_eq!(send_raw(&mut e, msg.as_bytes()), vec![login("alice"), outcome(Outcome::Success)]);
    assert_eq!(e.accounts().logged_in(UID), Some(alice));

    e.accounts_mut().register("bob", Some("pass\u{2168}".into())).unwrap();
    start(&mut e, "PLAIN");
    assert_eq!(send_raw(&mut e, b"\0BOB\0passIX"), vec![login("bob"), outcome(Outcome::Success)]);

    start(&mut e, "PLAIN");
    let msg = "\0al\u{E000}ice\0correct horse";
    assert_eq!(send_raw(&mut e, msg.as_bytes()), vec![outcome(Outcome::Failure)]);
}
