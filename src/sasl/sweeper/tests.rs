use super::*;
use crate::{
    account::MemoryDirectory,
    config::{Options, Pbkdf2Options},
    credential::Pbkdf2v2,
    sasl::{Inbound, Plain, SessionId},
};
use std::time::Duration;

fn start(engine: &mut Engine<MemoryDirectory, Pbkdf2v2>, uid: &str) {
    let session = SessionId::from(uid);
    engine.handle("irc.example.net", Inbound::StartAuth {
        session,
        mechanism: "PLAIN".into(),
        certfp: None,
    });
}

#[tokio::test(start_paused = true)]
async fn sweeps_idle_sessions() {
    let store = Pbkdf2v2::new(Pbkdf2Options::default()).unwrap();
    let options = Options { sweep_secs: 30, ..Options::default() };
    let mut engine = Engine::new(options, MemoryDirectory::new(), store).unwrap();
    engine.register(Arc::new(Plain));
    start(&mut engine, "1AAAAAAAA");
    let engine = Arc::new(Mutex::new(engine));
    let task = tokio::spawn(run(engine.clone()));

    tokio::time::sleep(Duration::from_secs(45)).await;
    {
        let mut engine = engine.lock().await;
        let session = engine.session("1AAAAAAAA").unwrap();
        assert!(session.is_marked());
        // Traffic clears the mark.
        start(&mut engine, "1AAAAAAAB");
        engine.handle("irc.example.net", Inbound::HostInfo {
            session: "1AAAAAAAA".into(),
            host: "localhost".into(),
            ip: "127.0.0.1".into(),
            secure: false,
        });
    }

    tokio::time::sleep(Duration::from_secs(30)).await;
    {
        let engine = engine.lock().await;
        assert!(engine.session("1AAAAAAAA").unwrap().is_marked());
        assert!(engine.session("1AAAAAAAB").unwrap().is_marked());
    }

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(engine.lock().await.sessions().is_empty());

    drop(engine);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(task.is_finished());
}
