use aes::cipher::{block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::Aes256;
use anyhow::{anyhow, bail, Result};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

// NewebPay pads to the key size (32 bytes), not the AES block size.
const PAD_BLOCK: usize = 32;

/// NewebPay TradeInfo cipher: AES-256-CBC with PKCS#7-style padding applied
/// manually at a 32-byte block size, hex-encoded ciphertext, and a SHA-256
/// check value over the ciphertext.
#[derive(Clone)]
pub struct TradeCipher {
    key: [u8; 32],
    iv: [u8; 16],
    key_str: String,
    iv_str: String,
}

impl TradeCipher {
    pub fn new(hash_key: &str, hash_iv: &str) -> Result<Self> {
        let key: [u8; 32] = hash_key
            .as_bytes()
            .try_into()
            .map_err(|_| anyhow!("newebpay hash key must be exactly 32 bytes"))?;
        let iv: [u8; 16] = hash_iv
            .as_bytes()
            .try_into()
            .map_err(|_| anyhow!("newebpay hash iv must be exactly 16 bytes"))?;

        Ok(Self {
            key,
            iv,
            key_str: hash_key.to_string(),
            iv_str: hash_iv.to_string(),
        })
    }

    /// Encrypt a plaintext payload, returning lowercase hex.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let data = plaintext.as_bytes();
        let pad_len = PAD_BLOCK - (data.len() % PAD_BLOCK);

        let mut buf = Vec::with_capacity(data.len() + pad_len);
        buf.extend_from_slice(data);
        buf.extend(std::iter::repeat(pad_len as u8).take(pad_len));

        let msg_len = buf.len();
        let ciphertext = Aes256CbcEnc::new(&self.key.into(), &self.iv.into())
            .encrypt_padded_mut::<NoPadding>(&mut buf, msg_len)
            .map_err(|_| anyhow!("aes-256-cbc encryption failed"))?;

        Ok(hex::encode(ciphertext))
    }

    /// Decrypt a hex-encoded ciphertext, stripping the trailing pad bytes.
    pub fn decrypt(&self, ciphertext_hex: &str) -> Result<String> {
        let mut data = hex::decode(ciphertext_hex.trim())?;
        if data.is_empty() || data.len() % 16 != 0 {
            bail!("ciphertext length {} is not a multiple of the block size", data.len());
        }

        let plaintext = Aes256CbcDec::new(&self.key.into(), &self.iv.into())
            .decrypt_padded_mut::<NoPadding>(&mut data)
            .map_err(|_| anyhow!("aes-256-cbc decryption failed"))?;

        let pad_len = *plaintext.last().unwrap_or(&0) as usize;
        if pad_len == 0 || pad_len > PAD_BLOCK || pad_len > plaintext.len() {
            bail!("invalid padding byte {}", pad_len);
        }

        let unpadded = &plaintext[..plaintext.len() - pad_len];
        Ok(String::from_utf8(unpadded.to_vec())?)
    }

    /// TradeSha: SHA-256 of `HashKey=<key>&<ciphertext-hex>&HashIV=<iv>`,
    /// uppercase hex.
    pub fn trade_sha(&self, ciphertext_hex: &str) -> String {
        let raw = format!("HashKey={}&{}&HashIV={}", self.key_str, ciphertext_hex, self.iv_str);
        hex::encode(Sha256::digest(raw.as_bytes())).to_uppercase()
    }

    pub fn verify_sha(&self, ciphertext_hex: &str, provided_sha: &str) -> bool {
        if provided_sha.trim().is_empty() {
            tracing::warn!("callback is missing TradeSha");
            return false;
        }

        let calculated = self.trade_sha(ciphertext_hex);
        let received = provided_sha.to_uppercase();
        tracing::info!(received = %received, calculated = %calculated, "tradesha verification");

        calculated.as_bytes().ct_eq(received.as_bytes()).into()
    }
}
