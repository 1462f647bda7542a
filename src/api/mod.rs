//! API endpoint handlers module

pub mod docs;
pub mod health;
pub mod sponsors;
