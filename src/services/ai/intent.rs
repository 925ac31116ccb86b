use crate::models::{ExtractedIntent, IntentResolution};
use crate::services::ai::{LlmProvider, Message};

const SYSTEM_PROMPT: &str = r#"You are the intent extraction engine for a clinic appointment assistant. Analyze the patient's latest message in context of the conversation history.

Return ONLY valid JSON (no markdown, no explanation) with this exact structure:
{
  "intent": "book|reschedule|cancel|view",
  "fields": {
    "name": "extracted value or omit",
    "age": "...",
    "gender": "...",
    "contact_number": "...",
    "email": "...",
    "department": "...",
    "appointment_date": "a date like 2025-01-15, or the words the patient used",
    "appointment_time": "a time like 14:00, or the words the patient used",
    "old_date": "...", "old_time": "...", "new_date": "...", "new_time": "..."
  },
  "reply": "one short friendly sentence to the patient"
}

Intent rules:
- "book": the patient wants a new appointment
- "reschedule": the patient wants to move an existing appointment (old_* and new_* fields)
- "cancel": the patient wants to cancel an existing appointment
- "view": the patient asks to see appointments

Only include fields the patient actually stated. Never invent values.
"department" is the medical specialization the patient needs (Cardiology, Dermatology, ...).
If you cannot tell what the patient wants, return {"intent": null}.
"#;

/// Ask the model to classify the latest message and extract any fields it
/// can. The result is untrusted: the slot tracker re-validates everything
/// before any action is taken. A reply the parser cannot make sense of
/// degrades to Unrecognized instead of an error, so the caller can ask
/// the patient to rephrase.
pub async fn resolve_intent(
    llm: &dyn LlmProvider,
    history: &[Message],
    latest_message: &str,
) -> anyhow::Result<IntentResolution> {
    let mut messages: Vec<Message> = history.to_vec();
    messages.push(Message {
        role: "user".to_string(),
        content: latest_message.to_string(),
    });

    let response = llm.chat(SYSTEM_PROMPT, &messages).await?;
    Ok(parse_intent_response(&response))
}

fn parse_intent_response(response: &str) -> IntentResolution {
    if let Ok(extracted) = serde_json::from_str::<ExtractedIntent>(response) {
        return IntentResolution::Recognized(extracted);
    }

    // Strip markdown code fences
    let cleaned = response
        .trim()
        .strip_prefix("```json")
        .or_else(|| response.trim().strip_prefix("```"))
        .unwrap_or(response.trim());
    let cleaned = cleaned.strip_suffix("```").unwrap_or(cleaned).trim();

    if let Ok(extracted) = serde_json::from_str::<ExtractedIntent>(cleaned) {
        return IntentResolution::Recognized(extracted);
    }

    // Last resort: the JSON object may be embedded in surrounding prose
    if let (Some(start), Some(end)) = (cleaned.find('{'), cleaned.rfind('}')) {
        if start < end {
            if let Ok(extracted) = serde_json::from_str::<ExtractedIntent>(&cleaned[start..=end]) {
                return IntentResolution::Recognized(extracted);
            }
        }
    }

    tracing::warn!("could not parse model response as intent JSON");
    IntentResolution::Unrecognized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookingIntent;

    #[test]
    fn test_parse_valid_json() {
        let json = r#"{"intent":"book","fields":{"name":"John","department":"Cardiology"},"reply":"Happy to help!"}"#;
        let IntentResolution::Recognized(extracted) = parse_intent_response(json) else {
            panic!("expected recognized intent");
        };
        assert_eq!(extracted.intent, BookingIntent::Book);
        assert_eq!(extracted.fields["name"], "John");
        assert_eq!(extracted.reply.as_deref(), Some("Happy to help!"));
    }

    #[test]
    fn test_parse_markdown_fenced_json() {
        let json = "```json\n{\"intent\":\"cancel\",\"fields\":{}}\n```";
        let IntentResolution::Recognized(extracted) = parse_intent_response(json) else {
            panic!("expected recognized intent");
        };
        assert_eq!(extracted.intent, BookingIntent::Cancel);
        assert!(extracted.fields.is_empty());
    }

    #[test]
    fn test_parse_json_embedded_in_prose() {
        let text = "Sure! Here is the extraction: {\"intent\":\"view\",\"fields\":{}} Hope that helps.";
        let IntentResolution::Recognized(extracted) = parse_intent_response(text) else {
            panic!("expected recognized intent");
        };
        assert_eq!(extracted.intent, BookingIntent::View);
    }

    #[test]
    fn test_unparseable_response_degrades_to_unrecognized() {
        let raw = "I don't understand the format you want";
        assert!(matches!(
            parse_intent_response(raw),
            IntentResolution::Unrecognized
        ));
    }

    #[test]
    fn test_null_intent_degrades_to_unrecognized() {
        let json = r#"{"intent": null}"#;
        assert!(matches!(
            parse_intent_response(json),
            IntentResolution::Unrecognized
        ));
    }
}
