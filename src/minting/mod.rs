pub mod invocation;
pub mod invoker;

pub use invoker::mint;
