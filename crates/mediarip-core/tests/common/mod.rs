#![allow(dead_code)]

use axum::Router;
use blowfish::Blowfish;
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockEncryptMut, InnerIvInit, KeyInit};
use mediarip_core::crypto::{blowfish_key, BLOWFISH_IV, CIPHER_CHUNK_SIZE};

/// Start a local server on an ephemeral port
///
/// `build` receives the base URL (no trailing slash) so handlers can hand
/// out absolute links to the same server.
pub async fn serve(build: impl FnOnce(String) -> Router) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind test server");
    listener
        .set_nonblocking(true)
        .expect("set test listener nonblocking");
    let base = format!("http://{}", listener.local_addr().unwrap());
    let app = build(base.clone());

    tokio::spawn(async move {
        let listener = tokio::net::TcpListener::from_std(listener).unwrap();
        axum::serve(listener, app).await.unwrap();
    });

    base
}

/// Deterministic test payload
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

/// Encrypt `plain` the way Deezer serves tracks: every 2048-byte chunk on
/// its own from the fixed IV, trailing partial blocks left as they are
pub fn deezer_encrypt(track_id: &str, plain: &[u8]) -> Vec<u8> {
    let key = blowfish_key(track_id);
    let mut out = Vec::with_capacity(plain.len());

    for chunk in plain.chunks(CIPHER_CHUNK_SIZE) {
        let mut buf = chunk.to_vec();
        let aligned = buf.len() - buf.len() % 8;
        if aligned > 0 {
            let cipher = <Blowfish as KeyInit>::new_from_slice(&key).unwrap();
            cbc::Encryptor::<Blowfish>::inner_iv_slice_init(cipher, &BLOWFISH_IV)
                .unwrap()
                .encrypt_padded_mut::<NoPadding>(&mut buf[..aligned], aligned)
                .unwrap();
        }
        out.extend_from_slice(&buf);
    }
    out
}
