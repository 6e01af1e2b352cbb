pub mod build;
pub mod container;
pub mod engine;
pub mod image;
pub mod info;
pub mod network;
pub mod system;
pub mod version;
pub mod volume;

/// serde helper for Docker's `omitempty` booleans.
pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}
