//! Types shared by the validation engine and the form renderer.

pub mod path;

pub use path::{PathSegment, PropertyPath};
