//! Deezer stream cipher
//!
//! Deezer serves tracks Blowfish-CBC encrypted in independent 2048-byte
//! chunks. Every chunk restarts from the same fixed IV, so chunk `i` can be
//! decrypted without chunk `i - 1`. The key is derived from the track id.

use crate::error::{MediaripError, Result};
use blowfish::Blowfish;
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, InnerIvInit, KeyInit};
use md5::{Digest, Md5};

/// Shared secret mixed into every track key
pub const BLOWFISH_SECRET: &[u8; 16] = b"g4el58wc0zvf9na1";

/// IV every chunk is decrypted from
pub const BLOWFISH_IV: [u8; 8] = [0, 1, 2, 3, 4, 5, 6, 7];

/// Size of one independently encrypted chunk
pub const CIPHER_CHUNK_SIZE: usize = 2048;

const BLOCK_SIZE: usize = 8;

type BlowfishCbcDec = cbc::Decryptor<Blowfish>;

/// Derive the Blowfish key of a track
///
/// MD5 hex digest of the id, first half XOR second half XOR the secret.
pub fn blowfish_key(track_id: &str) -> [u8; 16] {
    let digest = hex::encode(Md5::digest(track_id.as_bytes()));
    let hex = digest.as_bytes();

    let mut key = [0u8; 16];
    for (i, byte) in key.iter_mut().enumerate() {
        *byte = hex[i] ^ hex[i + 16] ^ BLOWFISH_SECRET[i];
    }
    key
}

/// Decrypt one chunk
///
/// Only whole 8-byte blocks are ciphertext; a trailing partial block is
/// passed through untouched, so the output has the same length as the input.
pub fn decrypt_chunk(key: &[u8], chunk: &[u8]) -> Result<Vec<u8>> {
    let mut buf = chunk.to_vec();
    let aligned = buf.len() - buf.len() % BLOCK_SIZE;
    if aligned == 0 {
        return Ok(buf);
    }

    let cipher = <Blowfish as KeyInit>::new_from_slice(key)
        .map_err(|e| MediaripError::Cipher(format!("bad key: {}", e)))?;
    let decryptor = BlowfishCbcDec::inner_iv_slice_init(cipher, &BLOWFISH_IV)
        .map_err(|e| MediaripError::Cipher(format!("bad iv: {}", e)))?;
    decryptor
        .decrypt_padded_mut::<NoPadding>(&mut buf[..aligned])
        .map_err(|e| MediaripError::Cipher(e.to_string()))?;

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbc::cipher::BlockEncryptMut;

    type BlowfishCbcEnc = cbc::Encryptor<Blowfish>;

    fn encrypt_chunk(key: &[u8], chunk: &[u8]) -> Vec<u8> {
        let mut buf = chunk.to_vec();
        let aligned = buf.len() - buf.len() % BLOCK_SIZE;
        let cipher = <Blowfish as KeyInit>::new_from_slice(key).unwrap();
        BlowfishCbcEnc::inner_iv_slice_init(cipher, &BLOWFISH_IV)
            .unwrap()
            .encrypt_padded_mut::<NoPadding>(&mut buf[..aligned], aligned)
            .unwrap();
        buf
    }

    #[test]
    fn key_matches_known_value() {
        assert_eq!(&blowfish_key("3135556"), b"llfk9f,7e%u`<d49");
        assert_eq!(&blowfish_key("1"), b"4den4:}:g,#j3i`a");
    }

    #[test]
    fn key_is_deterministic() {
        for id in ["0", "3135556", "999999999999", "track-with-text"] {
            assert_eq!(blowfish_key(id), blowfish_key(id));
        }
        assert_ne!(blowfish_key("1"), blowfish_key("2"));
    }

    #[test]
    fn chunks_decrypt_independently() {
        let key = blowfish_key("3135556");
        let plain: Vec<Vec<u8>> = (0..3u8)
            .map(|n| (0..CIPHER_CHUNK_SIZE).map(|i| (i as u8).wrapping_mul(n + 1)).collect())
            .collect();
        let encrypted: Vec<Vec<u8>> = plain.iter().map(|c| encrypt_chunk(&key, c)).collect();

        assert_ne!(encrypted[0], plain[0]);

        // Decrypt out of order: no state carries over between chunks
        for i in [2, 0, 1] {
            assert_eq!(decrypt_chunk(&key, &encrypted[i]).unwrap(), plain[i]);
        }
    }

    #[test]
    fn partial_tail_block_passes_through() {
        let key = blowfish_key("42");
        let plain: Vec<u8> = (0..21u8).collect();
        let encrypted = encrypt_chunk(&key, &plain);

        assert_eq!(&encrypted[16..], &plain[16..]);
        assert_eq!(decrypt_chunk(&key, &encrypted).unwrap(), plain);
        assert_eq!(decrypt_chunk(&key, b"abc").unwrap(), b"abc");
    }
}
