//! Domain services that sit between handlers and repositories

pub mod notifications;

pub use notifications::{Actor, GroupRef, NotificationService};
