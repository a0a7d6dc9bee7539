mod support;

use sealconf::{
    CertificateResolver, FileCertificateResolver, SealError, StoreCertificateResolver,
    CERT_STORE_ENV, DEFAULT_CERT_STORE,
};
use serial_test::serial;
use std::fs;
use support::generate;

#[test]
fn file_resolver_resolves_its_own_title_case_insensitively() {
    let cert = generate("dummy", 2033, 4, 25);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dummy.pem");
    fs::write(&path, cert.bundle_pem()).unwrap();

    let resolver = FileCertificateResolver::open(&path, None).unwrap();
    let title = resolver.certificate().title();

    let resolved = resolver.resolve(&title.to_uppercase()).unwrap();
    assert_eq!(resolved.title(), title);
    assert!(resolved.has_private_key());
}

#[test]
fn file_resolver_never_answers_for_another_title() {
    let cert = generate("dummy", 2033, 4, 25);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dummy.pem");
    fs::write(&path, cert.bundle_pem()).unwrap();

    let resolver = FileCertificateResolver::open(&path, None).unwrap();

    // The certificate is literally in memory, but the resolver is scoped to
    // one name only.
    let result = resolver.resolve("CN=other,NotAfter=2033-04-25");
    assert!(matches!(result, Err(SealError::CertificateNotFound(_))));
}

#[test]
fn file_resolver_loads_passphrase_protected_keys() {
    let cert = generate("locked", 2035, 6, 1);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("locked.pem");
    fs::write(
        &path,
        format!("{}{}", cert.cert_pem, cert.encrypted_key_pem("hunter2")),
    )
    .unwrap();

    let resolver = FileCertificateResolver::open(&path, Some("hunter2")).unwrap();
    assert!(resolver.certificate().has_private_key());
}

#[test]
fn file_resolver_requires_a_passphrase_for_encrypted_keys() {
    let cert = generate("locked", 2035, 6, 1);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("locked.pem");
    fs::write(
        &path,
        format!("{}{}", cert.cert_pem, cert.encrypted_key_pem("hunter2")),
    )
    .unwrap();

    assert!(matches!(
        FileCertificateResolver::open(&path, None),
        Err(SealError::MalformedSource(_))
    ));
    assert!(matches!(
        FileCertificateResolver::open(&path, Some("wrong")),
        Err(SealError::MalformedSource(_))
    ));
}

#[test]
fn file_resolver_rejects_a_file_with_no_certificate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("junk.pem");
    fs::write(&path, "not pem at all").unwrap();

    assert!(matches!(
        FileCertificateResolver::open(&path, None),
        Err(SealError::MalformedSource(_))
    ));
}

#[test]
fn store_resolver_searches_roots_in_order() {
    let machine = tempfile::tempdir().unwrap();
    let user = tempfile::tempdir().unwrap();
    let cert = generate("stored", 2033, 4, 25);
    let title = cert.handle_with_key().title();

    // Same title in both stores; the machine copy carries the private key.
    fs::write(machine.path().join("stored.pem"), cert.bundle_pem()).unwrap();
    fs::write(user.path().join("stored.pem"), &cert.cert_pem).unwrap();

    let resolver = StoreCertificateResolver::with_roots(vec![
        machine.path().to_path_buf(),
        user.path().to_path_buf(),
    ]);

    let resolved = resolver.resolve(&title).unwrap();
    assert!(resolved.has_private_key(), "machine store must win");
}

#[test]
fn store_resolver_falls_back_to_later_roots() {
    let missing = tempfile::tempdir().unwrap().path().join("absent");
    let user = tempfile::tempdir().unwrap();
    let cert = generate("userscoped", 2033, 4, 25);
    let title = cert.handle_with_key().title();
    fs::write(user.path().join("userscoped.pem"), cert.bundle_pem()).unwrap();

    let resolver =
        StoreCertificateResolver::with_roots(vec![missing, user.path().to_path_buf()]);

    assert!(resolver.resolve(&title).is_ok());
}

#[test]
fn store_resolver_skips_unparseable_files() {
    let store = tempfile::tempdir().unwrap();
    let cert = generate("good", 2033, 4, 25);
    let title = cert.handle_with_key().title();

    // Sorts before the good certificate; must be skipped, not fatal.
    fs::write(store.path().join("aaa-junk.pem"), "garbage").unwrap();
    fs::write(store.path().join("good.pem"), cert.bundle_pem()).unwrap();

    let resolver = StoreCertificateResolver::with_roots(vec![store.path().to_path_buf()]);
    assert!(resolver.resolve(&title).is_ok());
}

#[test]
fn store_resolver_reports_not_found_across_all_roots() {
    let store = tempfile::tempdir().unwrap();
    let resolver = StoreCertificateResolver::with_roots(vec![store.path().to_path_buf()]);

    assert!(matches!(
        resolver.resolve("CN=absent,NotAfter=2030-01-01"),
        Err(SealError::CertificateNotFound(_))
    ));
}

#[test]
#[serial]
fn store_name_prefers_the_process_environment() {
    unsafe { std::env::set_var(CERT_STORE_ENV, "deploy") };
    assert_eq!(StoreCertificateResolver::store_name(), "deploy");
    unsafe { std::env::remove_var(CERT_STORE_ENV) };
}

#[test]
#[serial]
fn store_name_defaults_when_no_scope_overrides_it() {
    unsafe { std::env::remove_var(CERT_STORE_ENV) };
    // No machine or user override file exists in the test environment.
    assert_eq!(StoreCertificateResolver::store_name(), DEFAULT_CERT_STORE);
}
