//! Proxies for server-side resources.
//!
//! Nothing here speaks HTTP. Every call goes through a caller-supplied
//! [`Client`], which executes query strings and uploads files; this module
//! builds the parameters, interprets the responses, paginates, and polls
//! long-running tasks.

pub mod client;
pub mod model_run;
pub mod pagination;
pub mod polling;
pub mod predictions;
pub mod role;

pub use client::{get_path, get_str, Client};
pub use model_run::{ModelRun, ModelRunDataRow};
pub use pagination::PaginatedCollection;
pub use polling::{poll_until, PollOptions, PollOutcome};
pub use predictions::{PredictionImport, PredictionSource};
pub use role::{normalize_role_name, OrgRole, ProjectRole, Role, RoleCache, Roles, UserRole};
