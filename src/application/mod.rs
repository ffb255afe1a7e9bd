//! Application services: cached content readers, admin write services and
//! whole-site backup.

pub mod admin;
pub mod content;
pub mod error;
pub mod repos;
pub mod site;
