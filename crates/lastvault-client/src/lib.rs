//! lastvault-client: talking to the vault service
//!
//! - `transport`: the [`Transport`] seam and its `reqwest` implementation
//! - `session`: iteration request, login state machine, blob fetch
//! - `response`: login and write-acknowledgement XML
//! - `vault`: list, look up, search, create, update, delete
//! - `search`: field/method matching over decoded accounts

pub mod response;
pub mod search;
pub mod session;
pub mod transport;
pub mod vault;

pub use search::{Field, Query, SearchMethod};
pub use session::{request_iterations, LoginRequest, LoginState, Session};
pub use transport::{with_cancel, HttpTransport, Transport, TransportResponse};
pub use vault::{write_form, Vault};
