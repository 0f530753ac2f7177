mod error;
mod store;

pub use error::SessionError;
pub use store::SessionStore;
