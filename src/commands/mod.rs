pub mod artifacts;
pub mod create;
pub mod health;
pub mod lookup;
pub mod store;
