use donation_gateway::signing::trade_cipher::TradeCipher;

const KEY: &str = "Fs5cX1TGqYM2PpdrLvSJrFzQcDmNbKeA";
const IV: &str = "C9oVvLxjkWpJbTq2";

#[test]
fn rejects_wrong_length_credentials() {
    assert!(TradeCipher::new("short", IV).is_err());
    assert!(TradeCipher::new(KEY, "way-too-long-for-an-iv").is_err());
}

#[test]
fn round_trips_across_padding_boundaries() {
    let cipher = cipher();
    // 0, 1, one under, exactly one pad block, one over.
    for len in [0usize, 1, 31, 32, 33] {
        let plaintext = "x".repeat(len);
        let encrypted = cipher.encrypt(&plaintext).unwrap();
        assert_eq!(cipher.decrypt(&encrypted).unwrap(), plaintext);
    }
}

#[test]
fn ciphertext_is_hex_in_whole_pad_blocks() {
    let cipher = cipher();
    let encrypted = cipher.encrypt("MerchantOrderNo=N7T0104182010AB&Amt=500").unwrap();
    assert!(encrypted.chars().all(|c| c.is_ascii_hexdigit()));
    // 32-byte pad blocks are 64 hex chars each.
    assert_eq!(encrypted.len() % 64, 0);
}

#[test]
fn decrypt_rejects_non_hex_input() {
    assert!(cipher().decrypt("not hex at all").is_err());
}

#[test]
fn decrypt_rejects_partial_blocks() {
    assert!(cipher().decrypt("abcd").is_err());
}

#[test]
fn trade_sha_is_uppercase_hex() {
    let cipher = cipher();
    let encrypted = cipher.encrypt("Amt=100").unwrap();
    let sha = cipher.trade_sha(&encrypted);
    assert_eq!(sha.len(), 64);
    assert!(sha.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
}

#[test]
fn verify_sha_accepts_matching_and_rejects_tampered() {
    let cipher = cipher();
    let encrypted = cipher.encrypt("Amt=100").unwrap();
    let sha = cipher.trade_sha(&encrypted);

    assert!(cipher.verify_sha(&encrypted, &sha));
    assert!(cipher.verify_sha(&encrypted, &sha.to_lowercase()));
    assert!(!cipher.verify_sha(&encrypted, "0000000000000000000000000000000000000000000000000000000000000000"));
    assert!(!cipher.verify_sha(&encrypted, ""));
}

fn cipher() -> TradeCipher {
    TradeCipher::new(KEY, IV).unwrap()
}
