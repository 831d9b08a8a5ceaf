//! KISS link-layer unescape for frames relayed through a TNC.

// KISS special characters
pub const FEND: u8 = 0xC0;
pub const FESC: u8 = 0xDB;
pub const TFEND: u8 = 0xDC;
pub const TFESC: u8 = 0xDD;

/// Undo KISS byte stuffing in a single left-to-right pass.
///
/// `FESC TFEND` becomes `FEND` and `FESC TFESC` becomes `FESC`. Decoded
/// output is never rescanned, so `DB DD DC` yields `DB DC`. A stray `FESC`
/// (unknown follower or trailing) is passed through unchanged.
pub fn kiss_unescape(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        let Some(&byte) = data.get(i) else {
            break;
        };
        if byte == FESC {
            match data.get(i + 1) {
                Some(&TFEND) => {
                    out.push(FEND);
                    i += 2;
                    continue;
                }
                Some(&TFESC) => {
                    out.push(FESC);
                    i += 2;
                    continue;
                }
                _ => {}
            }
        }
        out.push(byte);
        i += 1;
    }
    out
}

/// Number of leading bytes of `data` that unescape to exactly `logical_len`
/// bytes, or `None` if `data` is still too short.
///
/// An escape pair is never split: a trailing `FESC` waits for its follower.
pub fn kiss_wire_len(data: &[u8], logical_len: usize) -> Option<usize> {
    let mut wire = 0;
    for _ in 0..logical_len {
        let byte = *data.get(wire)?;
        wire += if byte == FESC {
            match data.get(wire + 1) {
                Some(&TFEND) | Some(&TFESC) => 2,
                Some(_) => 1,
                None => return None,
            }
        } else {
            1
        };
    }
    Some(wire)
}
