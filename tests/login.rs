mod common;

use common::seeded_store;
use launchpad::config::PasswordScheme;
use launchpad::login::{authenticate, find_pilot, hash_password, register_pilot, verify_password};
use launchpad::records::{Pilot, Row};
use launchpad::{LaunchpadError, TableName};

fn register(store: &launchpad::RecordStore, email: &str) -> Pilot {
    register_pilot(store, "Ada Lovelace", email, "hunter2", PasswordScheme::Sha256).unwrap()
}

#[test]
fn test_register_then_authenticate() {
    let (_, store) = seeded_store();
    let pilot = register(&store, "ada@x.com");

    assert_eq!(pilot.clearance, 1);
    assert_eq!(pilot.password_hash, hash_password("hunter2"));
    assert_eq!(pilot.join_date.len(), "2024-01-01 00:00:00".len());

    let authed = authenticate(&store, "ada@x.com", "hunter2").unwrap();
    assert_eq!(authed, Some(pilot));
    println!("✓ Registered pilot can log in at clearance 1");
}

#[test]
fn test_email_is_case_and_space_insensitive() {
    let (_, store) = seeded_store();
    register(&store, "  Ada@X.com ");

    assert!(find_pilot(&store, "ada@x.com").unwrap().is_some());
    assert!(authenticate(&store, "ADA@x.COM", "hunter2").unwrap().is_some());
    println!("✓ Emails are normalised before lookup");
}

#[test]
fn test_duplicate_email_rejected() {
    let (_, store) = seeded_store();
    register(&store, "ada@x.com");

    let err = register_pilot(&store, "Impostor", "ADA@x.com", "pw", PasswordScheme::Sha256)
        .unwrap_err();
    assert!(matches!(err, LaunchpadError::Validation { .. }));

    let registry: Vec<Pilot> = store.read_records().unwrap();
    assert_eq!(registry.len(), 1);
    assert_eq!(registry[0].full_name, "Ada Lovelace");
    println!("✓ Duplicate registration leaves the registry unchanged");
}

#[test]
fn test_registration_field_checks() {
    let (_, store) = seeded_store();
    let cases = [
        ("", "ada@x.com", "pw"),
        ("Ada", "", "pw"),
        ("Ada", "ada@x.com", "   "),
        ("Ada", "not-an-email", "pw"),
    ];

    for (name, email, password) in cases {
        let result = register_pilot(&store, name, email, password, PasswordScheme::Sha256);
        assert!(
            matches!(result, Err(LaunchpadError::Validation { .. })),
            "expected validation error for ({:?}, {:?}, {:?})",
            name,
            email,
            password
        );
    }
    assert!(store.read_records::<Pilot>().unwrap().is_empty());
    println!("✓ Missing fields and malformed emails are rejected");
}

#[test]
fn test_unknown_email_and_wrong_password_look_alike() {
    let (_, store) = seeded_store();
    register(&store, "ada@x.com");

    assert_eq!(authenticate(&store, "ada@x.com", "wrong").unwrap(), None);
    assert_eq!(authenticate(&store, "nobody@x.com", "hunter2").unwrap(), None);
    println!("✓ Both credential failures return None");
}

#[test]
fn test_registry_rows_written_by_hand() {
    let (_, store) = seeded_store();
    let mut row = Row::new();
    row.insert("Full_Name".into(), "Grace Hopper".into());
    row.insert("Email".into(), "Grace@X.com".into());
    row.insert("Password_Hash".into(), hash_password("cobol"));
    row.insert("Clearance".into(), "3.0".into());
    store.write_table(TableName::UserRegistry, vec![row]).unwrap();

    let pilot = authenticate(&store, "grace@x.com", "cobol").unwrap().unwrap();
    assert_eq!(pilot.clearance, 3);
    assert_eq!(pilot.join_date, "");

    let mut bad = Row::new();
    bad.insert("Email".into(), "x@x.com".into());
    bad.insert("Clearance".into(), "captain".into());
    store.write_table(TableName::UserRegistry, vec![bad]).unwrap();
    let pilot = find_pilot(&store, "x@x.com").unwrap().unwrap();
    assert_eq!(pilot.clearance, 1);
    println!("✓ Clearance cells parse leniently");
}

#[test]
fn test_registration_keeps_existing_registry_rows() {
    let (_, store) = seeded_store();
    let mut grace = Row::new();
    grace.insert("Full_Name".into(), "Grace Hopper".into());
    grace.insert("Email".into(), "grace@x.com".into());
    grace.insert("Password_Hash".into(), hash_password("cobol"));
    grace.insert("Clearance".into(), "3".into());
    grace.insert("Mentor".into(), "Howard Aiken".into());
    let mut no_email = Row::new();
    no_email.insert("Full_Name".into(), "Nobody".into());
    store
        .write_table(TableName::UserRegistry, vec![grace.clone(), no_email.clone()])
        .unwrap();

    register(&store, "ada@x.com");

    let raw = store.read_table(TableName::UserRegistry).unwrap();
    assert_eq!(raw.len(), 3);
    assert_eq!(raw[0], grace);
    assert_eq!(raw[1], no_email);
    assert!(authenticate(&store, "ada@x.com", "hunter2").unwrap().is_some());
    assert!(authenticate(&store, "grace@x.com", "cobol").unwrap().is_some());
    println!("✓ Registering leaves other rows, extra columns included, as they were");
}

#[test]
fn test_verify_password_schemes() {
    assert!(verify_password("abc", &hash_password("abc")));
    assert!(verify_password("abc", &format!(" {} ", hash_password("abc"))));
    assert!(!verify_password("abd", &hash_password("abc")));
    assert!(!verify_password("abc", "$argon2id$garbage"));
    println!("✓ Password verification dispatches on the stored hash");
}

#[cfg(feature = "hardened-hash")]
#[test]
fn test_argon2_registration_round_trip() {
    let (_, store) = seeded_store();
    let pilot =
        register_pilot(&store, "Ada", "ada@x.com", "hunter2", PasswordScheme::Argon2).unwrap();

    assert!(pilot.password_hash.starts_with("$argon2"));
    assert!(authenticate(&store, "ada@x.com", "hunter2").unwrap().is_some());
    assert!(authenticate(&store, "ada@x.com", "hunter3").unwrap().is_none());
    println!("✓ Argon2 hashes verify alongside legacy ones");
}

#[test]
fn test_registry_outage_is_a_store_error() {
    let (backend, store) = seeded_store();
    backend.set_unavailable(true);

    let err = authenticate(&store, "ada@x.com", "pw").unwrap_err();
    match err {
        LaunchpadError::Store(e) => assert_eq!(e.table, TableName::UserRegistry),
        other => panic!("expected store error, got {}", other),
    }
    println!("✓ Outages surface as store errors naming the worksheet");
}
