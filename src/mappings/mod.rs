pub mod action;
pub mod key_descriptor;
pub mod key_names;
pub mod symbols;

pub use action::ActionDescriptor;
pub use key_descriptor::{KeyChord, KeyDescriptor};
pub use key_names::KeyNames;
