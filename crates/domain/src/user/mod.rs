//! User accounts: provisioning, profile edits and admin management.

mod commands;
mod service;

pub use commands::{
    MAX_DISPLAY_NAME_LEN, ProvisionUser, SetUserRole, UpdateProfile, normalize_email,
    validate_display_name,
};
pub use service::{Provisioned, UserService};
