//! Resource operations of the collaboration API
//!
//! Each operation validates its ids, query parameter names and body locally,
//! then dispatches through the client's authorized request path. Operations
//! other than reads require [`ApiClient::is_connected()`][crate::ApiClient::is_connected()].

mod communities;
mod databases;
mod geoservices;
mod permissions;
mod reports;
mod users;

pub use users::UserId;
