// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! AES-128-ECB body encryption for the transport frame and the license
//! cache (spec §4.F, §4.G). Gated behind the `crypto` feature — this is the
//! only part of the crate that reaches for a crypto-primitive crate, so it
//! stays optional rather than pulling `aes`/`ecb`/`cipher` into builds that
//! never touch the network or the license cache.

use crate::config::AES_BLOCK_SIZE;
use aes::Aes128;
use cipher::generic_array::GenericArray;
use cipher::{BlockDecryptMut, BlockEncryptMut, KeyInit};
use ecb::{Decryptor, Encryptor};

/// Encrypt `data` in place, in 16-byte blocks (spec §4.F "optionally
/// AES-ECB-encrypt body in place"). `data.len()` must be a multiple of
/// [`AES_BLOCK_SIZE`]; callers are expected to pad before calling.
pub fn encrypt_in_place(key: &[u8; 16], data: &mut [u8]) {
    let mut cipher = Encryptor::<Aes128>::new(GenericArray::from_slice(key));
    for block in data.chunks_mut(AES_BLOCK_SIZE) {
        cipher.encrypt_block_mut(GenericArray::from_mut_slice(block));
    }
}

pub fn decrypt_in_place(key: &[u8; 16], data: &mut [u8]) {
    let mut cipher = Decryptor::<Aes128>::new(GenericArray::from_slice(key));
    for block in data.chunks_mut(AES_BLOCK_SIZE) {
        cipher.decrypt_block_mut(GenericArray::from_mut_slice(block));
    }
}

/// Zero-pad `data` up to the next multiple of [`AES_BLOCK_SIZE`].
pub fn pad_to_block(data: &mut Vec<u8>) {
    let remainder = data.len() % AES_BLOCK_SIZE;
    if remainder != 0 {
        data.resize(data.len() + (AES_BLOCK_SIZE - remainder), 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_decrypt_roundtrips() {
        let key = [0x2bu8; 16];
        let mut data = b"0123456789abcdef0123456789abcdef".to_vec();
        pad_to_block(&mut data);
        let original = data.clone();
        encrypt_in_place(&key, &mut data);
        assert_ne!(data, original);
        decrypt_in_place(&key, &mut data);
        assert_eq!(&data[..original.len()], &original[..]);
    }

    #[test]
    fn pad_to_block_rounds_up() {
        let mut data = vec![1u8; 17];
        pad_to_block(&mut data);
        assert_eq!(data.len(), 32);
    }
}
