//! Human-friendly identifiers for freshly created posts.
//!
//! IDs combine a random adjective with a random noun (`quantum-cookie`). The
//! caller supplies the uniqueness predicate so generation stays pure; after
//! [`MAX_ID_ATTEMPTS`] collisions the ID falls back to the creation time.

use rand::Rng;
use time::OffsetDateTime;

pub const MAX_ID_ATTEMPTS: usize = 10;

pub const ADJECTIVES: [&str; 20] = [
    "futuristic",
    "artificial",
    "cybernetic",
    "mechanical",
    "robotic",
    "electronic",
    "virtual",
    "quantum",
    "atomic",
    "galactic",
    "interdimensional",
    "extraterrestrial",
    "hyperdimensional",
    "nanotechnological",
    "genetic",
    "biomechanical",
    "cryogenic",
    "cosmic",
    "astronomical",
    "hyperspatial",
];

pub const NOUNS: [&str; 14] = [
    "cookie",
    "snowman",
    "blanket",
    "fireplace",
    "tea",
    "pillow",
    "socks",
    "sweater",
    "slippers",
    "cocoa",
    "candle",
    "mug",
    "quilt",
    "plaid",
];

/// Draw one `adjective-noun` candidate.
pub fn random_post_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    let adjective = ADJECTIVES[rng.gen_range(0..ADJECTIVES.len())];
    let noun = NOUNS[rng.gen_range(0..NOUNS.len())];
    format!("{adjective}-{noun}")
}

/// Produce an ID rejected by neither `is_taken` nor the attempt bound.
///
/// `is_taken` must return `true` when the candidate already exists.
pub fn generate_post_id<R, F>(rng: &mut R, now: OffsetDateTime, mut is_taken: F) -> String
where
    R: Rng + ?Sized,
    F: FnMut(&str) -> bool,
{
    for _ in 0..MAX_ID_ATTEMPTS {
        let candidate = random_post_id(rng);
        if !is_taken(&candidate) {
            return candidate;
        }
    }

    fallback_post_id(now)
}

/// `post-{unix epoch millis}`.
pub fn fallback_post_id(now: OffsetDateTime) -> String {
    format!("post-{}", now.unix_timestamp_nanos() / 1_000_000)
}

/// Derive a display title from a hyphenated ID: `quantum-cookie` → `Quantum Cookie`.
pub fn title_from_id(id: &str) -> String {
    id.split('-')
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
