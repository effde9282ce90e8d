// ── Credential hashing ──
//
// The login forms never carry the password verbatim (except on the
// oldest firmware). Two digest schemes exist across the fleet; the
// descriptor's scheme tag picks one. Pure functions, no session state.

use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use secrecy::{ExposeSecret, SecretString};

use crate::model::CredentialScheme;

/// Interleave two strings character by character; whichever is longer
/// contributes its tail unchanged. This is the exact merge order the
/// device-side JavaScript applies before digesting.
fn merge(a: &str, b: &str) -> String {
    let mut out = String::with_capacity(a.len() + b.len());
    let mut left = a.chars();
    let mut right = b.chars();
    loop {
        let l = left.next();
        let r = right.next();
        if l.is_none() && r.is_none() {
            break;
        }
        if let Some(c) = l {
            out.push(c);
        }
        if let Some(c) = r {
            out.push(c);
        }
    }
    out
}

fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}

/// Merge-then-digest scheme: interleave the password with the one-time
/// challenge from the login page, then MD5 the result.
pub fn merge_hash(password: &str, challenge: &str) -> String {
    md5_hex(&merge(password, challenge))
}

/// Keyed digest of the secret alone (no challenge): HMAC-MD5 with the
/// secret as both key and message.
pub fn hmac_md5_hex(password: &str) -> String {
    let mut mac = Hmac::<Md5>::new_from_slice(password.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(password.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Compute the credential the login form expects for `scheme`.
///
/// The merge scheme degrades to the plain secret when the device did
/// not serve a challenge -- old firmware accepts the cleartext form.
pub fn login_credential(
    scheme: CredentialScheme,
    secret: &SecretString,
    challenge: Option<&str>,
) -> String {
    match scheme {
        CredentialScheme::Plain => secret.expose_secret().to_owned(),
        CredentialScheme::MergeHash => match challenge {
            Some(rand) => merge_hash(secret.expose_secret(), rand),
            None => secret.expose_secret().to_owned(),
        },
        CredentialScheme::HmacMd5 => hmac_md5_hex(secret.expose_secret()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_interleaves_with_tail() {
        assert_eq!(merge("abc", "12345"), "a1b2c345");
        assert_eq!(merge("abcdef", "12"), "a1b2cdef");
        assert_eq!(merge("Password1", "897006492"), "P8a9s7s0w0o6r4d912");
    }

    #[test]
    fn merge_hash_matches_device_vectors() {
        assert_eq!(
            merge_hash("Password1", "897006492"),
            "6e5b60b4082b2ac23103ec2e7caf0284"
        );
        assert_eq!(
            merge_hash("Password1", "1018767543"),
            "c01909066125ac45d275af0a6cd09b5e"
        );
    }

    #[test]
    fn hmac_scheme_is_deterministic_per_secret() {
        assert_eq!(
            hmac_md5_hex("Password1"),
            "5344eb430781045a1e3fce8a5bcc4512"
        );
        assert_eq!(
            hmac_md5_hex("Password2"),
            "587c4f26d25ecbcd62de61341475ac39"
        );
    }

    #[test]
    fn credential_dispatch_follows_scheme() {
        let secret: SecretString = "Password1".to_string().into();
        assert_eq!(
            login_credential(CredentialScheme::Plain, &secret, Some("1234")),
            "Password1"
        );
        assert_eq!(
            login_credential(CredentialScheme::MergeHash, &secret, Some("897006492")),
            "6e5b60b4082b2ac23103ec2e7caf0284"
        );
        // No challenge served -> cleartext fallback.
        assert_eq!(
            login_credential(CredentialScheme::MergeHash, &secret, None),
            "Password1"
        );
        assert_eq!(
            login_credential(CredentialScheme::HmacMd5, &secret, None),
            "5344eb430781045a1e3fce8a5bcc4512"
        );
    }
}
