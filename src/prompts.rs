//! Prompt text for the dispatch summarizer.
//!
//! The summarizer turns a rate-confirmation transcript into the fixed
//! dispatcher message format drivers receive. The template is kept here so
//! the format can be inspected and tested without a live provider.
//!
//! Callers can override the default via
//! [`crate::config::SummaryConfig::prompt_template`]; the template must carry a
//! `{text}` placeholder where the transcript is inserted.

/// Placeholder replaced with the transcript.
pub const TEXT_PLACEHOLDER: &str = "{text}";

/// Default dispatch-extraction prompt.
pub const DEFAULT_DISPATCH_PROMPT: &str = r#"You are an expert logistics dispatcher bot.

Read the rate confirmation text below and extract the following fields:
- Load #
- REF #
- Pickup (PU): date, time, shipper name, address
- Delivery (DEL): date, time, receiver name, address
- Rate
- Miles
- Fines or Notes
- Any other important details or numbers found in the text.


Return the answer in this exact format (if there is any additional info, include it):

Load# [number]

REF# [reference number]

⏳ PU: [pickup date + time (Earliest-Latest)]

[shipper name]
[address line 1]
[address line 2 if any]

⏳ DEL: [delivery date + time (Earliest-Latest)]

[receiver name]
[address line 1]
[address line 2 if any]

_____

Rate: [amount] $
Mile: [miles] miles

⏰Late pick up = $250 fine❗️
⏰Late delivery = $250 fine❗️ important to keep the business
📝BOL/POD/Freight/Seal pictures MUST send otherwise $250 fine❗️
🚨 No update / $250 fine❗️

Your communication is really going smoothly❗️

If any field is missing, write "Not found" but **keep the format identical**.

---
RATE CONFIRMATION TEXT:
{text}
"#;

/// Fill `template` (or the default prompt) with a transcript.
///
/// Only the first placeholder is substituted, so a transcript that itself
/// contains `{text}` is inserted verbatim.
pub fn build_summary_prompt(template: Option<&str>, transcript: &str) -> String {
    let template = template.unwrap_or(DEFAULT_DISPATCH_PROMPT);
    template.replacen(TEXT_PLACEHOLDER, transcript, 1)
}

/// Whether a custom template can be used.
pub fn is_valid_template(template: &str) -> bool {
    template.contains(TEXT_PLACEHOLDER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prompt_has_placeholder_once() {
        assert_eq!(DEFAULT_DISPATCH_PROMPT.matches(TEXT_PLACEHOLDER).count(), 1);
        assert!(DEFAULT_DISPATCH_PROMPT.contains("Not found"));
    }

    #[test]
    fn transcript_is_appended_after_header() {
        let p = build_summary_prompt(None, "--- Page 1 ---\nLoad# 4471\n");
        assert!(p.ends_with("RATE CONFIRMATION TEXT:\n--- Page 1 ---\nLoad# 4471\n\n"));
        assert!(!p.contains(TEXT_PLACEHOLDER));
    }

    #[test]
    fn custom_template() {
        assert_eq!(build_summary_prompt(Some("T: {text}"), "abc"), "T: abc");
    }

    #[test]
    fn placeholder_inside_transcript_survives() {
        assert_eq!(build_summary_prompt(Some("{text}!"), "{text}"), "{text}!");
    }

    #[test]
    fn template_validation() {
        assert!(is_valid_template("x {text}"));
        assert!(!is_valid_template("no placeholder"));
    }
}
