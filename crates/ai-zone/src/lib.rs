//! Agent zones and the worker pool that fans their updates out.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod group;
pub mod pool;
pub mod zone;

pub use group::{GroupId, GroupMgr};
pub use pool::{TaskHandle, ThreadPool};
pub use zone::{Zone, ZoneConfig};
