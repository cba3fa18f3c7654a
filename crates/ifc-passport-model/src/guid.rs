// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC GlobalId generation
//!
//! Rooted entities (property sets, relationship records) carry a GlobalId:
//! a 128-bit UUID packed into 22 characters of the IFC base64 alphabet.

use uuid::Uuid;

/// The IFC base64 alphabet (differs from RFC 4648 in the last two characters)
const ALPHABET: &[u8; 64] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz_$";

/// Generate a fresh IFC GlobalId from a v4 UUID
pub fn new_global_id() -> String {
    compress(Uuid::new_v4().as_u128())
}

/// Pack a 128-bit value into the 22-character IFC representation
///
/// 22 chars of 6 bits cover 132 bits; the leading character carries the top
/// 4 bits and therefore stays in the range `0..=3`.
fn compress(mut n: u128) -> String {
    let mut out = [0u8; 22];
    for slot in out.iter_mut().rev() {
        *slot = ALPHABET[(n & 63) as usize];
        n >>= 6;
    }
    String::from_utf8(out.to_vec()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_id_shape() {
        let id = new_global_id();
        assert_eq!(id.len(), 22);
        assert!(id.bytes().all(|b| ALPHABET.contains(&b)));
    }

    #[test]
    fn test_global_ids_are_unique() {
        let a = new_global_id();
        let b = new_global_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_compress_zero() {
        assert_eq!(compress(0), "0000000000000000000000");
    }
}
