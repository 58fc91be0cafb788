//! Concrete delegate implementations

pub mod gemini;
pub mod google_translate;
pub mod pubmed;
