use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

const SCHEME: &str = "sha256";

/// hash_password
///
/// Produces a self-describing `sha256$<salt>$<digest>` string. The salt is a fresh random
/// UUID so identical passwords never share a stored value.
pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    let digest = digest(&salt, password);
    format!("{SCHEME}${salt}${digest}")
}

/// verify_password
///
/// Recomputes the digest for `password` with the stored salt. Malformed stored values
/// never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    let (Some(scheme), Some(salt), Some(expected)) = (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    if scheme != SCHEME || salt.is_empty() {
        return false;
    }
    digest(salt, password)
        .as_bytes()
        .ct_eq(expected.as_bytes())
        .into()
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}
