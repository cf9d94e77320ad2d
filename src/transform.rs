//! Byte transform applied to deck payloads
//!
//! Deck JSON files inside `deck.gcdp` are stored with every byte shifted one
//! bit to the left. Reading shifts them back to the right. The pair is not a
//! rotation: the high bit of each byte is dropped when shifting up, so only
//! payloads made of bytes below `0x80` survive a full write/read cycle.
//!
//! Existing archives depend on this exact behaviour, so it must not be
//! replaced by a rotate without a format version bump.

/// Shift every byte one bit to the left, dropping the high bit
pub fn shift_up(data: &mut [u8]) {
    for byte in data.iter_mut() {
        *byte <<= 1;
    }
}

/// Shift every byte one bit to the right, clearing the high bit
pub fn shift_down(data: &mut [u8]) {
    for byte in data.iter_mut() {
        *byte >>= 1;
    }
}

/// Encode a deck payload for storage in `deck.gcdp`
pub fn encode_deck(data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    shift_up(&mut out);
    out
}

/// Decode a `.gcd` payload back into deck JSON bytes
pub fn decode_deck(data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    shift_down(&mut out);
    out
}

/// Check whether a payload survives `encode_deck` followed by `decode_deck`
///
/// Plain ASCII JSON always does. Raw UTF-8 text outside ASCII does not.
pub fn is_shift_safe(data: &[u8]) -> bool {
    data.iter().all(|&b| b < 0x80)
}
