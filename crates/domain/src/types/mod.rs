//! Domain types and models

pub mod page;
pub mod payor;
pub mod resource;

pub use page::{FetchReport, Page, PageRequest, PageTarget, QueryParams, StopReason};
pub use payor::{PayorDetails, PayorLookup};
pub use resource::{Resource, ResourceType};
