pub mod backend;
pub mod cache;
pub mod child_store;
pub mod error;
pub mod kind;
pub mod node;
pub mod response;
pub mod store;
pub mod thor;
pub mod topology_service;

#[cfg(test)]
pub(crate) mod testing;
