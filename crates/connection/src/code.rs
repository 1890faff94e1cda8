use rand::seq::SliceRandom;
use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};

/// Digits of the epoch-millis timestamp appended to the dictionary word.
pub const CODE_SUFFIX_DIGITS: usize = 5;

/// Short, memorable, lowercase words for human-relayed connection codes.
const WORDS: &[&str] = &[
    "acorn", "amber", "aspen", "birch", "bloom", "brook", "cedar", "cloud",
    "clover", "coral", "daisy", "dune", "ember", "fern", "flint", "frost",
    "gale", "grove", "hazel", "heron", "ivy", "juniper", "lark", "linden",
    "maple", "meadow", "misty", "olive", "otter", "pebble", "pine", "plum",
    "poppy", "reed", "river", "robin", "sage", "sparrow", "spruce", "stone",
    "thistle", "tulip", "willow", "wren",
];

/// A human-memorable code: one dictionary word plus the last digits of the
/// given epoch-millis timestamp. Uniqueness is only checked at create time,
/// so collisions simply trigger regeneration.
pub fn generate_code(rng: &mut impl Rng, epoch_millis: u128) -> String {
    let word = WORDS.choose(rng).copied().unwrap_or("cedar");
    let digits = epoch_millis.to_string();
    let tail_start = digits.len().saturating_sub(CODE_SUFFIX_DIGITS);
    format!("{word}{}", &digits[tail_start..])
}

pub fn now_epoch_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}
