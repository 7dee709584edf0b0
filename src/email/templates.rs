use chrono::NaiveDate;

/// Fields shared by every leave notification.
#[derive(Debug, Clone)]
pub struct LeaveEmailData {
    pub to: String,
    pub user_name: String,
    pub leave_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_days: f64,
    pub reason: Option<String>,
}

#[derive(Debug)]
pub struct Rendered {
    pub subject: String,
    pub html: String,
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn format_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

fn details(data: &LeaveEmailData) -> String {
    let mut html = format!(
        "<p><strong>Leave Type:</strong> {}</p>\
         <p><strong>Period:</strong> {} to {}</p>\
         <p><strong>Duration:</strong> {} days</p>",
        escape_html(&data.leave_type),
        format_date(data.start_date),
        format_date(data.end_date),
        data.total_days,
    );
    if let Some(reason) = data.reason.as_deref().filter(|r| !r.trim().is_empty()) {
        html.push_str(&format!("<p><strong>Reason:</strong> {}</p>", escape_html(reason)));
    }
    html
}

fn layout(heading: &str, body: &str, company_name: &str) -> String {
    format!(
        "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;\">\
         <h2 style=\"color: #333;\">{heading}</h2>{body}\
         <p style=\"color: #888; font-size: 12px;\">{}</p></div>",
        escape_html(company_name)
    )
}

pub fn submitted(data: &LeaveEmailData, manager_name: &str, company_name: &str) -> Rendered {
    let body = format!(
        "<p>Hi {},</p><p>Your leave request has been submitted and sent to {} for review.</p>{}",
        escape_html(&data.user_name),
        escape_html(manager_name),
        details(data),
    );
    Rendered {
        subject: format!("Leave Request Submitted - {company_name}"),
        html: layout("Leave Request Submitted", &body, company_name),
    }
}

pub fn manager_notification(data: &LeaveEmailData, request_id: u64, company_name: &str) -> Rendered {
    let body = format!(
        "<p><strong>Employee:</strong> {}</p>{}<p><strong>Request ID:</strong> #{request_id}</p>\
         <p>Please review this request in your leave management dashboard.</p>",
        escape_html(&data.user_name),
        details(data),
    );
    Rendered {
        subject: format!("Leave Request Requires Approval - {company_name}"),
        html: layout("New Leave Request Requires Approval", &body, company_name),
    }
}

pub fn approved(data: &LeaveEmailData, approved_by: &str, company_name: &str) -> Rendered {
    let body = format!(
        "<p>Hi {},</p><p>Your leave request was approved by {}.</p>{}",
        escape_html(&data.user_name),
        escape_html(approved_by),
        details(data),
    );
    Rendered {
        subject: format!("Leave Request Approved - {company_name}"),
        html: layout("Leave Request Approved", &body, company_name),
    }
}

pub fn rejected(
    data: &LeaveEmailData,
    rejected_by: &str,
    rejection_reason: &str,
    company_name: &str,
) -> Rendered {
    let body = format!(
        "<p>Hi {},</p><p>Your leave request was declined by {}.</p>\
         <p><strong>Rejection reason:</strong> {}</p>{}",
        escape_html(&data.user_name),
        escape_html(rejected_by),
        escape_html(rejection_reason),
        details(data),
    );
    Rendered {
        subject: format!("Leave Request Update - {company_name}"),
        html: layout("Leave Request Update", &body, company_name),
    }
}
