// Moderation policy — the data model and the store that owns the live copy.

pub mod models;
pub mod store;

pub use models::{Policy, PolicyUpdate};
pub use store::PolicyStore;
