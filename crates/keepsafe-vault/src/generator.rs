use rand::{rngs::OsRng, Rng};
use zeroize::Zeroizing;

pub const DEFAULT_PASSWORD_LENGTH: usize = 20;

const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*";

/// Random password drawn uniformly from letters, digits and `!@#$%^&*`.
pub fn generate_password(length: usize) -> Zeroizing<String> {
    let mut rng = OsRng;
    let password = (0..length)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect::<String>();
    Zeroizing::new(password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_requested_length() {
        assert_eq!(generate_password(DEFAULT_PASSWORD_LENGTH).len(), 20);
        assert_eq!(generate_password(64).len(), 64);
        assert!(generate_password(0).is_empty());
    }

    #[test]
    fn only_uses_charset() {
        let password = generate_password(256);
        assert!(password.bytes().all(|b| CHARSET.contains(&b)));
    }

    #[test]
    fn successive_passwords_differ() {
        let a = generate_password(DEFAULT_PASSWORD_LENGTH);
        let b = generate_password(DEFAULT_PASSWORD_LENGTH);
        assert_ne!(a, b);
    }
}
