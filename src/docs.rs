use crate::api::allowance::AllowanceWithUser;
use crate::api::leave_request::{CreateLeaveRequest, RejectLeaveRequest};
use crate::api::leave_type::CreateLeaveType;
use crate::api::policy::CreatePolicy;
use crate::api::team::AddMemberReq;
use crate::auth::handlers::TokenPair;
use crate::model::company_settings::CompanySettings;
use crate::model::leave_allowance::LeaveAllowance;
use crate::model::leave_policy::LeavePolicy;
use crate::model::leave_request::LeaveRequest;
use crate::model::leave_type::LeaveType;
use crate::model::team::TeamMember;
use crate::model::user::{UserProfile, UserSummary};
use crate::models::{LoginReqDto, RegisterReq, SetPasswordReq};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leave Management API",
        version = "1.0.0",
        description = r#"
## Leave Management

Employees submit time-off requests, managers approve or reject them and
configure leave types, policies and company settings.

### Key Features
- **Requests**: submit, review and track leave with half-day resolution
- **Allowances**: yearly budgets with carry-over, deducted on approval
- **Policies**: notice, consecutive-day and frequency limits per leave type
- **Analytics**: trends, type distribution, cost estimates, CSV / text export
- **Team calendar**: month grid of the team's pending and approved leave

### Security
Endpoints under `/api` need a **JWT Bearer** access token or the `session`
cookie set by Google sign-in. Owners and admins are managers.

### Response Format
JSON with camelCase keys. Errors are `{"error": "...", "details"?: ...}`.
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::me,
        crate::auth::handlers::set_password,
        crate::auth::oauth::google_start,
        crate::auth::oauth::google_callback,

        crate::api::leave_request::my_requests,
        crate::api::leave_request::create_request,
        crate::api::leave_request::pending_requests,
        crate::api::leave_request::all_requests,
        crate::api::leave_request::get_request,
        crate::api::leave_request::approve_request,
        crate::api::leave_request::reject_request,

        crate::api::allowance::my_allowance,
        crate::api::allowance::list_allowances,
        crate::api::allowance::update_allowance,

        crate::api::leave_type::list_types,
        crate::api::leave_type::create_type,

        crate::api::policy::list_policies,
        crate::api::policy::get_policy,
        crate::api::policy::create_policy,
        crate::api::policy::update_policy,
        crate::api::policy::delete_policy,

        crate::api::company_settings::get_settings,
        crate::api::company_settings::update_settings,

        crate::api::analytics::analytics,
        crate::api::analytics::export,
        crate::api::analytics::calendar,

        crate::api::team::list_members,
        crate::api::team::add_member
    ),
    components(
        schemas(
            RegisterReq,
            LoginReqDto,
            SetPasswordReq,
            TokenPair,
            UserProfile,
            UserSummary,
            CreateLeaveRequest,
            RejectLeaveRequest,
            LeaveRequest,
            LeaveAllowance,
            AllowanceWithUser,
            LeaveType,
            CreateLeaveType,
            LeavePolicy,
            CreatePolicy,
            CompanySettings,
            TeamMember,
            AddMemberReq
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Accounts, tokens and Google sign-in"),
        (name = "Leave", description = "Leave request workflow"),
        (name = "Allowance", description = "Yearly leave budgets"),
        (name = "Leave Types", description = "Leave type catalogue"),
        (name = "Policies", description = "Leave policy management"),
        (name = "Company", description = "Company leave settings"),
        (name = "Analytics", description = "Reports, exports and the team calendar"),
        (name = "Team", description = "Team membership"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
