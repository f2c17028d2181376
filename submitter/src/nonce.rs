pub use manager::NonceManager;

mod manager;
mod state;
