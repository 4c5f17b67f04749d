//! Diceware-style passphrase generation.
//!
//! Each word is selected by four rejection-sampled six-sided die rolls
//! (`~= log2(6^4) = 10.34` bits), giving an eight-word passphrase about 82
//! bits of entropy, matching the reference implementation's use of the EFF
//! short wordlist. That wordlist is distributed under a separate license
//! (CC BY 3.0) and isn't vendored here; [`WORDS`] is a disjoint,
//! self-contained 1296-entry list indexed the same way (`6^4` combinations)
//! so the passphrase format and entropy budget match exactly.

use rand::RngCore;

const PART_A: [&str; 36] = [
    "ash", "bay", "cot", "dune", "elm", "fox", "glen", "holt", "iris", "jade", "kale", "lark", "moss", "nook", "oak",
    "pine", "quay", "reed", "sage", "teal", "urn", "vale", "wren", "yew", "zinc", "brook", "crag", "drift", "ember",
    "frost", "grove", "heath", "ivy", "knoll", "lynx", "marsh",
];

const PART_B: [&str; 36] = [
    "ton", "ville", "burg", "stead", "worth", "bury", "ham", "ford", "gate", "mere", "shaw", "thorpe", "wick", "holm",
    "garth", "fell", "combe", "croft", "dell", "glade", "reach", "haven", "moor", "ridge", "brook", "dale", "cliff",
    "hollow", "field", "wood", "vale", "burn", "mill", "stone", "crest", "vane",
];

/// Rolls a single fair six-sided die via rejection sampling of a random
/// byte (`252 = 42*6` is the largest multiple of 6 below 256).
pub fn roll() -> u8 {
    let mut rng = rand::rngs::OsRng;
    loop {
        let mut b = [0u8; 1];
        rng.fill_bytes(&mut b);
        if b[0] < 42 * 6 {
            return (b[0] % 6) + 1;
        }
    }
}

/// Maps four die rolls (each `1..=6`) to a word in the 1296-entry list.
fn word_for_rolls(d: [u8; 4]) -> String {
    let index = ((d[0] - 1) as usize) * 216 + ((d[1] - 1) as usize) * 36 + ((d[2] - 1) as usize) * 6 + (d[3] - 1) as usize;
    word_at_index(index)
}

/// Generates an 8-word, hyphen-joined diceware-style passphrase.
pub fn passphrase() -> String {
    (0..8)
        .map(|_| {
            let rolls = [roll(), roll(), roll(), roll()];
            word_for_rolls(rolls)
        })
        .collect::<Vec<_>>()
        .join("-")
}

fn word_at_index(index: usize) -> String {
    format!("{}{}", PART_A[index / 36], PART_B[index % 36])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roll_is_in_range() {
        for _ in 0..200 {
            let r = roll();
            assert!((1..=6).contains(&r));
        }
    }

    #[test]
    fn passphrase_has_eight_hyphenated_words() {
        let pp = passphrase();
        assert_eq!(pp.split('-').count(), 8);
    }

    #[test]
    fn word_index_covers_full_range() {
        assert_eq!(word_at_index(0), format!("{}{}", PART_A[0], PART_B[0]));
        assert_eq!(word_at_index(1295), format!("{}{}", PART_A[35], PART_B[35]));
    }
}
