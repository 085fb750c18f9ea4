use crate::config::PasswordScheme;
use crate::error::{LaunchpadError, Result};
use crate::records::{Pilot, normalize_email, timestamp_now};
use crate::store::{RecordStore, Sheet};
use lazy_static::lazy_static;
use log::{info, warn};
use regex::Regex;
use sha2::{Digest, Sha256};

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

/// Hash a password the way the registry sheet stores it
///
/// Unsalted SHA-256, hex encoded. This keeps existing registry rows valid
/// but is not a hardened credential scheme: identical passwords share a
/// hash and the digest is fast to brute force. The `argon2` scheme is
/// available for new registrations when that matters.
///
/// # Examples
/// ```
/// use launchpad::login::hash_password;
///
/// assert_eq!(
///     hash_password("abc"),
///     "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
/// );
/// ```
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

#[cfg(feature = "hardened-hash")]
fn hash_password_argon2(password: &str) -> Result<String> {
    use argon2::{
        Argon2,
        password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
    };

    let salt = SaltString::generate(&mut OsRng);
    match Argon2::default().hash_password(password.as_bytes(), &salt) {
        Ok(hash) => Ok(hash.to_string()),
        Err(e) => Err(LaunchpadError::validation("password", e.to_string())),
    }
}

#[cfg(not(feature = "hardened-hash"))]
fn hash_password_argon2(_password: &str) -> Result<String> {
    Err(LaunchpadError::validation(
        "password scheme",
        "argon2 support was not compiled in",
    ))
}

pub fn hash_with(scheme: PasswordScheme, password: &str) -> Result<String> {
    match scheme {
        PasswordScheme::Sha256 => Ok(hash_password(password)),
        PasswordScheme::Argon2 => hash_password_argon2(password),
    }
}

/// Check a password against a stored hash of either scheme
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let stored_hash = stored_hash.trim();
    if stored_hash.starts_with("$argon2") {
        return verify_argon2(password, stored_hash);
    }
    hash_password(password).as_bytes() == stored_hash.as_bytes()
}

#[cfg(feature = "hardened-hash")]
fn verify_argon2(password: &str, stored_hash: &str) -> bool {
    use argon2::{
        Argon2,
        password_hash::{PasswordHash, PasswordVerifier},
    };

    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(not(feature = "hardened-hash"))]
fn verify_argon2(_password: &str, _stored_hash: &str) -> bool {
    warn!("registry holds an argon2 hash but argon2 support was not compiled in");
    false
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

/// Look a pilot up by email, ignoring case and surrounding spaces
pub fn find_pilot(store: &RecordStore, email: &str) -> Result<Option<Pilot>> {
    let email = normalize_email(email);
    let registry: Vec<Pilot> = store.read_records()?;
    Ok(registry.into_iter().find(|p| p.email == email))
}

/// Register a new pilot at clearance level 1
///
/// # Errors
/// * Validation if any field is empty, the email is malformed, or the email
///   is already registered
/// * Store errors from reading or writing User_Registry
pub fn register_pilot(
    store: &RecordStore,
    full_name: &str,
    email: &str,
    password: &str,
    scheme: PasswordScheme,
) -> Result<Pilot> {
    let full_name = full_name.trim();
    let email = normalize_email(email);
    if full_name.is_empty() || email.is_empty() || password.trim().is_empty() {
        return Err(LaunchpadError::validation(
            "registration",
            "full name, email and password are all required",
        ));
    }
    if !is_valid_email(&email) {
        return Err(LaunchpadError::validation(
            "email",
            format!("'{}' is not an email address", email),
        ));
    }

    let mut registry: Sheet<Pilot> = store.load_sheet()?;
    if registry.records().any(|p| p.email == email) {
        return Err(LaunchpadError::validation(
            "email",
            format!("{} is already registered", email),
        ));
    }

    let pilot = Pilot {
        full_name: full_name.to_string(),
        email,
        password_hash: hash_with(scheme, password)?,
        clearance: 1,
        join_date: timestamp_now(),
    };
    registry.push(pilot.clone());
    store.save_sheet(registry)?;

    info!("registered pilot {}", pilot.email);
    Ok(pilot)
}

/// Verify credentials against the registry
///
/// Returns `None` for an unknown email and for a wrong password alike.
pub fn authenticate(store: &RecordStore, email: &str, password: &str) -> Result<Option<Pilot>> {
    match find_pilot(store, email)? {
        Some(pilot) if verify_password(password, &pilot.password_hash) => {
            info!("pilot {} authorised", pilot.email);
            Ok(Some(pilot))
        }
        _ => {
            warn!("rejected credentials for {}", normalize_email(email));
            Ok(None)
        }
    }
}
