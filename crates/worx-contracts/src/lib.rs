pub mod brand;
pub mod chat;
pub mod credentials;
pub mod events;
pub mod gallery;
pub mod key_store;
pub mod prompt;
pub mod references;
