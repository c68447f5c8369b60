
use shared::util::generate_crypto_random_string;

// ice-char without '+' and '/' (RFC 8839, 5.4), so values survive any
// signaling encoding untouched.
const ICE_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

const UFRAG_LEN: usize = 16;
const PWD_LEN: usize = 32;

/// A fresh `ice-ufrag` for an agent that does not pick its own.
pub fn generate_ufrag() -> String {
    generate_crypto_random_string(UFRAG_LEN, ICE_CHARS)
}

/// A fresh `ice-pwd`, well above the 22 characters RFC 8839 requires.
pub fn generate_pwd() -> String {
    generate_crypto_random_string(PWD_LEN, ICE_CHARS)
}

/// Local credentials as `(ufrag, pwd)`, the shape agents report them in.
pub fn generate_credentials() -> (String, String) {
    (generate_ufrag(), generate_pwd())
}
