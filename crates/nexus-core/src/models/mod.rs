//! Data models for CRM entities.
//!
//! This module contains the records kept in the local cache:
//!
//! - `Lead`: a prospective or active client moving through the pipeline
//! - `Category`: a label leads may point at through `category_id`
//! - `Company`: an organization record
//! - `Task`: a follow-up assigned to a user, optionally tied to a lead
//!
//! Every cached type implements [`Record`], which ties it to an
//! [`EntityKind`] and exposes the identifier and ordering timestamp the
//! cache works with.

pub mod category;
pub mod company;
mod de;
pub mod lead;
pub mod record;
pub mod task;

pub use category::Category;
pub use company::{Company, CompanyStatus};
pub use lead::{AiInsights, ExpiryState, Lead, LeadStatus};
pub use record::{EntityKind, Record};
pub use task::{Task, TaskPriority, TaskStatus};
