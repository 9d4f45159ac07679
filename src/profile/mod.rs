pub mod parameters;
pub mod store;

pub use parameters::{ParameterSet, IDENTITY_FIELD};
pub use store::{ProfileStore, TomlProfileStore};
