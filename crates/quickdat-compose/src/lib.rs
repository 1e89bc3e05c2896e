//! Message composition for extracted load records.
//!
//! [`template`] renders the user-editable email body; [`dispatch`] turns a
//! record into the outbound compose-mail and driving-directions URLs.

pub mod dispatch;
pub mod error;
pub mod template;

pub use dispatch::{mail_compose_url, route_url, route_waypoints, subject_line, DispatchTargets};
pub use error::DispatchError;
pub use template::{render, Placeholder};
