//! Built-in formatters.

use serde_json::Value;
use traceable_core::LogContent;

use crate::traits::{Formatter, Handler, HandlerError};

/// One human-readable line:
/// `<rfc3339> [SEVERITY] KIND Owner.method(args) -> result`.
///
/// Payloads that are not call records are rendered as compact JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringFormatter;

impl Handler for StringFormatter {
    fn name(&self) -> &str {
        "string"
    }
}

impl Formatter for StringFormatter {
    fn render(&self, content: &LogContent) -> Result<String, HandlerError> {
        let body = match call_summary(&content.payload) {
            Some(summary) => summary,
            None => content.payload.to_string(),
        };
        Ok(format!(
            "{} [{}] {} {}",
            content.timestamp.to_rfc3339(),
            content.severity,
            content.kind,
            body
        ))
    }
}

fn call_summary(payload: &Value) -> Option<String> {
    let owner = payload.get("owner")?.as_str()?;
    let method = payload.get("method")?.as_str()?;
    let args = payload
        .get("args")
        .and_then(Value::as_array)
        .map(|args| {
            args.iter()
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();

    let mut line = format!("{}.{}({})", owner, method, args);
    if let Some(result) = payload.get("result") {
        line.push_str(&format!(" -> {}", result));
    }
    if let Some(error) = payload.get("error").and_then(Value::as_str) {
        line.push_str(&format!(" !! {}", error));
    }
    Some(line)
}

/// The whole record as a single JSON object.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFormatter;

impl Handler for JsonFormatter {
    fn name(&self) -> &str {
        "json"
    }
}

impl Formatter for JsonFormatter {
    fn render(&self, content: &LogContent) -> Result<String, HandlerError> {
        Ok(serde_json::to_string(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use traceable_core::{CallFailure, CallResult, CallSite, LogKind, Severity};

    fn site() -> CallSite {
        CallSite::new("Svc", "compute").with_arg("i32", 2).with_arg("i32", 3)
    }

    #[test]
    fn string_formatter_renders_call_and_result() {
        let outcome: CallResult = Ok(json!(5));
        let content = LogContent::for_call(LogKind::TraceAfter, &site(), Some(&outcome));
        let line = StringFormatter.render(&content).unwrap();
        assert!(line.ends_with("[INFO] TRACE_AFTER Svc.compute(2, 3) -> 5"), "{line}");
    }

    #[test]
    fn string_formatter_renders_failure() {
        let outcome: CallResult = Err(CallFailure::msg("overflow"));
        let content = LogContent::for_call(LogKind::TraceAfterThrowing, &site(), Some(&outcome));
        let line = StringFormatter.render(&content).unwrap();
        assert!(line.contains("[ERROR] TRACE_AFTER_THROWING"), "{line}");
        assert!(line.ends_with("!! overflow"), "{line}");
    }

    #[test]
    fn string_formatter_falls_back_to_json_payload() {
        let content = LogContent::new(LogKind::TraceBefore, Severity::Info, json!({"k": 1}));
        let line = StringFormatter.render(&content).unwrap();
        assert!(line.ends_with(r#"[INFO] TRACE_BEFORE {"k":1}"#), "{line}");
    }

    #[test]
    fn json_formatter_emits_an_object() {
        let content = LogContent::for_call(LogKind::TraceBefore, &site(), None);
        let line = JsonFormatter.render(&content).unwrap();
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["kind"], json!("TRACE_BEFORE"));
        assert_eq!(parsed["severity"], json!("info"));
        assert_eq!(parsed["payload"]["args"], json!([2, 3]));
    }
}
