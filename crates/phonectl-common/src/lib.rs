pub mod errors;
pub mod id;
pub mod types;

pub use errors::{ConfigError, RelayError};
pub use id::{new_id, ConnectionId};
pub use types::{PairingToken, Role};

pub type Result<T> = std::result::Result<T, RelayError>;
