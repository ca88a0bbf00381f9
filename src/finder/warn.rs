use crate::error::FinderWarnCode;

fn sanitize_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_sep = false;
    for ch in value.chars() {
        if ch.is_ascii_whitespace() {
            if !out.is_empty() && !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else if ch.is_ascii_graphic() {
            out.push(ch);
            prev_sep = false;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "na".to_string()
    } else {
        trimmed.to_string()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WarnEvent<'a> {
    pub code: FinderWarnCode,
    pub stage: &'a str,
    pub descriptor: &'a str,
    pub path: &'a str,
    pub reason: &'a str,
}

pub fn format_line(event: &WarnEvent<'_>) -> String {
    format!(
        "DATAFINDER_WARN code={} stage={} descriptor={} path={} reason={}",
        event.code.as_str(),
        sanitize_value(event.stage),
        sanitize_value(event.descriptor),
        sanitize_value(event.path),
        sanitize_value(event.reason),
    )
}

pub fn emit(event: WarnEvent<'_>) {
    eprintln!("{}", format_line(&event));
}
