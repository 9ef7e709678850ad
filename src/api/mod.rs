//! Backend API
//!
//! Authenticated HTTP access to the CRM backend, organized by domain.

mod client;
mod entities;
mod funnel;
mod reports;
mod storage;
mod transport;

pub use client::*;
pub use entities::*;
pub use funnel::*;
pub use reports::*;
pub use storage::*;
pub use transport::*;
