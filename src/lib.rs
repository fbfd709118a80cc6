pub mod console;
pub mod db;
pub mod directory;
pub mod ops;
pub mod session;
pub mod store;
