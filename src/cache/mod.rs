pub mod record;
pub mod scanner;
pub mod token;
pub mod writer;
