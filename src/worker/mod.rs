mod builder;
mod core;

pub use self::builder::Builder;
pub use self::core::Worker;
