use super::*;

#[test]
fn defaults_validate() {
    Options::default().validate().unwrap();
    let opts = Pbkdf2Options::default();
    opts.validate().unwrap();
    assert_eq!(opts.digest, DigestAlgorithm::Sha256);
    assert!(!opts.exceeds_cyrus_limit());
}

#[test]
fn iterations_out_of_range() {
    let opts = Pbkdf2Options { iterations: 9_999, ..Default::default() };
    assert_eq!(
        opts.validate(),
        Err(ConfigError::OutOfRange {
            option: "iterations",
            value: 9_999,
            min: 10_000,
            max: 5_000_000
        })
    );
    let opts = Pbkdf2Options { salt_len: 65, ..Default::default() };
    assert!(opts.validate().is_err());
}

#[test]
fn cyrus_limit_is_only_advisory() {
    let opts = Pbkdf2Options { iterations: 100_000, ..Default::default() };
    opts.validate().unwrap();
    assert!(opts.exceeds_cyrus_limit());
}

#[test]
fn digest_by_name() {
    let mut opts = Pbkdf2Options::default();
    opts.set_digest("sha-512").unwrap();
    assert_eq!(opts.digest, DigestAlgorithm::Sha512);
    assert_eq!(opts.set_digest("md5"), Err(ConfigError::Unknown("digest", "md5".to_owned())));
    assert_eq!(opts.digest, DigestAlgorithm::Sha512);
}

#[cfg(feature = "serde")]
#[test]
fn deserialize() {
    let opts: Pbkdf2Options =
        serde_json::from_str(r#"{"digest": "SHA512", "iterations": 100000}"#).unwrap();
    assert_eq!(opts.digest, DigestAlgorithm::Sha512);
    assert_eq!(opts.iterations, 100_000);
    assert_eq!(opts.salt_len, crate::consts::pbkdf2::SALT_LEN_DEFAULT);

    let opts: Options = serde_json::from_str(r#"{"hide_server_names": true}"#).unwrap();
    assert!(opts.hide_server_names);
    assert_eq!(opts.sweep_interval(), crate::consts::SWEEP_INTERVAL);
}
