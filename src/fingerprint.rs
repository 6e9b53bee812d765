//! Non-cryptographic fingerprints used to address cached content.
//!
//! The hash is a 32-bit polynomial rolling hash over the text's characters,
//! suffixed with the character count to make accidental collisions between
//! texts of different lengths impossible. It is for cache addressing only.

const SEPARATOR: char = '\u{1f}';

/// Fingerprint a single text, e.g. `"5e1b9a3c-42"`.
pub fn fingerprint(text: &str) -> String {
    let mut hash: u32 = 0;
    let mut count: usize = 0;

    for ch in text.chars() {
        hash = hash.wrapping_mul(31).wrapping_add(ch as u32);
        count += 1;
    }

    format!("{:08x}-{}", hash, count)
}

/// Fingerprint several fields as one value. Field boundaries are significant,
/// so `["ab", "c"]` and `["a", "bc"]` differ.
pub fn fingerprint_fields<'a>(fields: impl IntoIterator<Item = &'a str>) -> String {
    let mut joined = String::new();
    for (index, field) in fields.into_iter().enumerate() {
        if index > 0 {
            joined.push(SEPARATOR);
        }
        joined.push_str(field);
    }
    fingerprint(&joined)
}
