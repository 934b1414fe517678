pub mod filter;
mod session;

pub use session::Session;
