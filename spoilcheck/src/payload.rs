//! Random payload builders.
//!
//! Titles and descriptions are fixed-length random alphanumeric strings so
//! repeated runs against the same deployment do not collide. No uniqueness
//! guarantee beyond the birthday bound at these lengths.

use rand::{distributions::Alphanumeric, Rng};

pub fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

pub fn story_title() -> String {
    format!("Story_{}", random_string(6))
}

pub fn story_description() -> String {
    format!("Description {}", random_string(16))
}

pub fn edited_title() -> String {
    format!("Edited_{}", random_string(6))
}

pub fn edited_description() -> String {
    format!("Edited {}", random_string(16))
}
