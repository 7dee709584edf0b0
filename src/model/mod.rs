pub mod company_settings;
pub mod leave_allowance;
pub mod leave_policy;
pub mod leave_request;
pub mod leave_type;
pub mod role;
pub mod team;
pub mod user;
