//! Obfuscated token generation.
//!
//! Hashed tokens are a pure function of `(original, salt, seed)`, so two
//! runs over the same corpus produce the same mapping. Random tokens only
//! repeat when the same seed is reused and identifiers are seen in the same
//! order.

use rand::distr::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{MAX_TOKEN_LENGTH, NamingStrategy, ObfuscationConfig};

/// Mints candidate names for the mapper.
#[derive(Debug)]
pub enum NameGenerator {
    Hashed { seed: u32, length: usize },
    Random { rng: StdRng, length: usize },
}

impl NameGenerator {
    /// Builds the generator selected by the configuration.
    pub fn from_config(config: &ObfuscationConfig) -> Self {
        let length = config.token_length.clamp(1, MAX_TOKEN_LENGTH);
        match config.naming {
            NamingStrategy::Hashed => NameGenerator::Hashed {
                seed: config.seed,
                length,
            },
            NamingStrategy::Random => NameGenerator::Random {
                rng: StdRng::seed_from_u64(u64::from(config.seed)),
                length,
            },
        }
    }

    /// Produces a candidate for `original`. `attempt` > 0 salts the input
    /// after a collision.
    pub fn mint(&mut self, original: &str, attempt: u32) -> String {
        match self {
            NameGenerator::Hashed { seed, length } => {
                if attempt == 0 {
                    hashed_name(original, *seed, *length)
                } else {
                    hashed_name(&format!("{original}#{attempt}"), *seed, *length)
                }
            }
            NameGenerator::Random { rng, length } => random_name(rng, *length),
        }
    }
}

/// Hashes `input` with xxHash32 and encodes the little-endian digest in
/// base32, keeping the first `length` characters.
pub fn hashed_name(input: &str, seed: u32, length: usize) -> String {
    let digest = xxhash_rust::xxh32::xxh32(input.as_bytes(), seed);
    let encoded = data_encoding::BASE32.encode(&digest.to_le_bytes());

    encoded
        .chars()
        .filter(|ch| *ch != '=')
        .take(length.min(MAX_TOKEN_LENGTH))
        .enumerate()
        .map(|(position, ch)| {
            if position == 0 {
                letter_for_leading(ch)
            } else {
                ch
            }
        })
        .collect()
}

/// Base32 digits cannot open a bare SQL identifier.
const fn letter_for_leading(ch: char) -> char {
    match ch {
        '2' | '3' => 'T',
        '4' | '5' => 'F',
        '6' | '7' => 'S',
        other => other,
    }
}

fn random_name(rng: &mut StdRng, length: usize) -> String {
    let first = char::from(rng.random_range(b'a'..=b'z'));
    let rest = (1..length)
        .map(|_| char::from(rng.sample(Alphanumeric)).to_ascii_lowercase());
    std::iter::once(first).chain(rest).collect()
}
