//! Admin write services.
//!
//! Every mutation follows the same order: validate, write through the
//! repository, record an audit entry, then hand the committed change to the
//! [`CacheTrigger`](crate::cache::CacheTrigger) so cached reads are dropped
//! before the call returns.

pub mod audit;
pub mod categories;
pub mod comments;
pub mod menu;
pub mod pages;
pub mod posts;
pub mod settings;
mod slugs;
pub mod tags;

#[cfg(test)]
pub(crate) mod test_support;
