pub mod manager;

pub use manager::{get_token, TokenBroker};
