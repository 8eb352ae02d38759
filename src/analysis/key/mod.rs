//! Key detection from aggregate chroma

pub mod matcher;
pub mod profiles;

pub use matcher::{interpolate_profile, KeyProfileMatcher};
pub use profiles::{KeyProfile, ProfileRegistry};
