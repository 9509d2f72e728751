//! The prompt catalog a fresh server is seeded with.

use crate::PromptPair;

const PAIRS: &[(&str, &str)] = &[
    ("a cat", "a tiger"),
    ("a pizza", "a pie"),
    ("a guitar", "a violin"),
    ("a rocket", "an airplane"),
    ("a snowman", "a scarecrow"),
    ("a lighthouse", "a windmill"),
    ("a birthday cake", "a wedding cake"),
    ("a bicycle", "a motorcycle"),
    ("a dragon", "a dinosaur"),
    ("a castle", "a church"),
    ("an octopus", "a jellyfish"),
    ("a volcano", "a mountain"),
    ("a submarine", "a whale"),
    ("a robot", "a knight in armor"),
    ("a sunflower", "a daisy"),
    ("a camera", "a phone"),
];

/// The built-in prompt pairs.
pub fn default_prompts() -> Vec<PromptPair> {
    PAIRS
        .iter()
        .map(|(common, imposter)| PromptPair::new(*common, *imposter))
        .collect()
}
