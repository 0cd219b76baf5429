pub mod entities;
pub mod stat_store;
