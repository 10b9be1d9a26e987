pub mod assets;
pub mod channel;
pub mod hub;
pub mod logger;
pub mod message;
pub mod server;
pub mod settings;
