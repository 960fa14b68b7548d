use crate::models::SubmissionRecord;

pub fn notification_subject(site_name: &str) -> String {
    format!("{site_name}: new badge")
}

/// Plain-text notification listing every captured field, one per line.
pub fn notification_body(record: &SubmissionRecord) -> String {
    format!(
        "Email: {email}\n\
         City: {city}\n\
         Badge: {badge}\n\
         Session: {session}\n\
         Referrer: {referrer}\n\
         IP: {ip}\n\
         UA: {ua}\n\
         When: {when}",
        email = record.email,
        city = record.city,
        badge = record.badge,
        session = record.session_id,
        referrer = record.referrer,
        ip = record.ip,
        ua = record.user_agent,
        when = record.when(),
    )
}

pub fn confirmation_subject(site_name: &str) -> String {
    format!("{site_name} - Badge saved")
}

pub fn confirmation_body(record: &SubmissionRecord) -> String {
    format!("Thanks! We saved your badge code {}.", record.badge)
}
