pub mod additions;
pub mod lock;
