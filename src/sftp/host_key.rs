//! Host key fingerprints
//!
//! A configured fingerprint may be given the way `ssh-keygen -l` prints it
//! (`SHA256:<base64>`), as a bare base64 SHA-256 digest, or as a legacy
//! colon-separated MD5 hex string. Anything before the last whitespace
//! (key type, bit length) is ignored.

use base64::{engine::general_purpose::STANDARD_NO_PAD as BASE64, Engine};
use md5::Md5;
use sha2::{Digest, Sha256};

/// `SHA256:<unpadded base64>` fingerprint of a wire-encoded public key
pub fn sha256_fingerprint(key_bytes: &[u8]) -> String {
    let hash = Sha256::digest(key_bytes);
    format!("SHA256:{}", BASE64.encode(hash))
}

/// `aa:bb:...` MD5 fingerprint of a wire-encoded public key
pub fn md5_fingerprint(key_bytes: &[u8]) -> String {
    Md5::digest(key_bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// Compare a configured fingerprint with the key the server presented
pub fn matches_fingerprint(expected: &str, key_bytes: &[u8]) -> bool {
    let Some(token) = expected.split_whitespace().last() else {
        return false;
    };

    if let Some(b64) = strip_prefix_ignore_case(token, "SHA256:") {
        return same_base64(b64, &sha256_fingerprint(key_bytes)["SHA256:".len()..]);
    }

    let md5_part = strip_prefix_ignore_case(token, "MD5:").unwrap_or(token);
    if md5_part.contains(':') {
        return md5_part.eq_ignore_ascii_case(&md5_fingerprint(key_bytes));
    }

    same_base64(token, &sha256_fingerprint(key_bytes)["SHA256:".len()..])
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    match (s.get(..prefix.len()), s.get(prefix.len()..)) {
        (Some(head), Some(rest)) if head.eq_ignore_ascii_case(prefix) => Some(rest),
        _ => None,
    }
}

// Base64 is case sensitive; only trailing padding is optional
fn same_base64(given: &str, actual: &str) -> bool {
    given.trim_end_matches('=') == actual
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"\x00\x00\x00\x0bssh-ed25519\x00\x00\x00\x20abcdefghijklmnopqrstuvwxyz012345";

    #[test]
    fn test_sha256_forms_match() {
        let fp = sha256_fingerprint(KEY);
        assert!(fp.starts_with("SHA256:"));
        assert!(!fp.ends_with('='));

        assert!(matches_fingerprint(&fp, KEY));
        assert!(matches_fingerprint(&format!("ssh-ed25519 255 {}", fp), KEY));
        assert!(matches_fingerprint(&fp["SHA256:".len()..], KEY));
        assert!(matches_fingerprint(&format!("{}=", fp), KEY));
    }

    #[test]
    fn test_md5_forms_match() {
        let fp = md5_fingerprint(KEY);
        assert_eq!(fp.len(), 16 * 3 - 1);

        assert!(matches_fingerprint(&fp, KEY));
        assert!(matches_fingerprint(&fp.to_uppercase(), KEY));
        assert!(matches_fingerprint(&format!("ssh-rsa 2048 {}", fp), KEY));
        assert!(matches_fingerprint(&format!("MD5:{}", fp), KEY));
    }

    #[test]
    fn test_other_key_rejected() {
        let fp = sha256_fingerprint(KEY);
        assert!(!matches_fingerprint(&fp, b"another key"));
        assert!(!matches_fingerprint(&md5_fingerprint(KEY), b"another key"));
        assert!(!matches_fingerprint("", KEY));
    }

    #[test]
    fn test_non_ascii_fingerprint_rejected() {
        // multi-byte characters straddling the prefix length
        assert!(!matches_fingerprint("SHA25Xé:abc", KEY));
        assert!(!matches_fingerprint("ééééééé", KEY));
        assert!(!matches_fingerprint("MD€:aa:bb", KEY));
        assert_eq!(strip_prefix_ignore_case("sha256:x", "SHA256:"), Some("x"));
        assert_eq!(strip_prefix_ignore_case("SHA25", "SHA256:"), None);
    }
}
