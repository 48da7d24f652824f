//! Plain data types shared by the store, the workflows, and the server.

pub mod claim;
pub mod contact;
pub mod log;
pub mod user;
pub mod work_order;

pub use claim::{Claim, ClaimDetails, ClaimPhoto, ClaimStatus, ParseEnumError};
pub use contact::{Contact, ContactKind, NewContact};
pub use log::{ClaimClosure, ClaimLog};
pub use user::{Actor, User};
pub use work_order::{DEFAULT_WORK_ORDER_STATUS, WorkOrder, WorkOrderDetail};
