//! Keyword embedding model and scroll corpus shared by unit and
//! integration tests
//!
//! Kept free of crate paths so `tests/common` can include it directly.

pub const KEYWORD_MODEL: &str = "keyword-test";

const KEYWORDS: &[&str] = &["fireball", "invisib", "potion", "dragon"];

/// Keyword slots plus the bias component
pub const KEYWORD_DIMS: usize = KEYWORDS.len() + 1;

pub const SCROLLS: &[(&str, &str)] = &[
    ("fireball", "Fireballs require dry tinder and a spark of will."),
    ("invisibility", "Invisibility cloaks fade after one lunar cycle."),
    ("potion", "A healing potion must steep beneath a waxing moon."),
    ("dragon", "Dragons cannot abide the scent of silver sage."),
];

/// Keyword counts plus a constant bias component
pub fn keyword_vector(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    let mut v: Vec<f32> = KEYWORDS
        .iter()
        .map(|k| lower.matches(k).count() as f32)
        .collect();
    v.push(0.1);
    v
}
