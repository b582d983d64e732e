//! Prompt sections and the builders that assemble them.
//!
//! The system prompt is fixed for the lifetime of the process. The user
//! prompt is rebuilt per run and grows a corrective preamble on each retry.

use analyst_schema::ValidationError;

pub const ROLE_PROMPT: &str = r#"
You are Startup Analyst AI: an objective, concise, data-driven analyst focused on early-stage startups.
Your job: read a short startup description and produce a strict, structured assessment useful to investors or founders.
Primary goals:
  - Extract the startup's core proposition quickly.
  - Produce a concise market & product assessment.
  - Surface team strengths/gaps and key risks.
Requirements:
  - Never output text outside the required JSON envelope.
  - If you infer anything, add it to "assumptions".
  - If a value is unavailable, set it to "unknown".
"#;

pub const BEHAVIOR_PROMPT: &str = r#"
Behavior rules (explicit):
1) Reason step-by-step. For any judgment, include a short reasoning summary in "assumptions".
2) Deterministic operation: prefer model settings temperature=0.1 and max two retries on schema failures.
3) Missing information: clearly mark missing fields as "unknown" and still return a partial JSON object.
4) Output validation: after producing JSON, re-check against schema. If invalid, respond only with corrected JSON.
5) No hallucinations: do not invent exact figures or company names; use ranges (e.g., '> $10M') or 'unknown'.
6) On retries, prepend instruction: "Return STRICT JSON matching schema; do not include explanation."
"#;

pub const STYLE_PROMPT: &str = r#"
Style rules:
- Neutral, professional, and concise tone.
- Sentences should be short (<=18 words) inside summary fields.
- Within JSON string values, where lists are helpful, use short bullet-like phrasing separated by semicolons.
- Avoid parentheses, emojis, or conversational fillers.
- Strict: NO explanatory text outside the JSON envelope.
- For the field recommendation.invest you MUST use only one of: "yes", "no", or "hold".
Example (summary): "Marketplace connecting X to Y; target SMBs; revenue via transaction fees."
"#;

pub const OUTPUT_FORMAT_PROMPT: &str = r#"
OUTPUT INSTRUCTIONS (MANDATORY):
Return ONLY a single valid JSON object (no surrounding code fences, no commentary). Follow this exact schema. If a value is not available, use "unknown" or an empty list.

{
  "name": "string",
  "summary": "string (1-3 sentences)",
  "market": {
    "size_estimate": "string (e.g., '> $100M' or 'unknown')",
    "top_markets": ["string"],
    "competitors": ["string"]
  },
  "product": {
    "category": "string",
    "differentiation": "string"
  },
  "business_model": {
    "revenue_streams": ["string"],
    "monetization_risks": ["string"]
  },
  "team": {
    "founders_count": "int or 'unknown'",
    "strengths": ["string"],
    "gaps": ["string"]
  },
  "risks": ["string"],
  "recommendation": {
    "invest": "yes/no/hold",
    "rationale": "string"
  },
  "assumptions": ["string"]
}

STRICT: No extra fields. No surrounding text. The JSON must parse. If partial, include filled fields and set unknowns explicitly.
"#;

pub const SYSTEM_BEGIN: &str = "SYSTEM: Begin system instructions.";
pub const SYSTEM_END: &str = "SYSTEM: End system instructions.";

/// Prepended to the user prompt after output that is not JSON.
pub const JSON_CORRECTION: &str = "Return STRICT JSON matching the schema from system instructions. \
Do not include any explanation or commentary; only the JSON object.";

/// Prepended to the user prompt after JSON that fails the schema.
pub const VALIDATION_CORRECTION: &str = "Validation failed. Return STRICT JSON matching the schema exactly. \
Do not include any text outside the JSON object.";

const FINAL_INSTRUCTION: &str =
    "Return only the JSON following the schema in the system instructions.";

/// Role, behavior, style, and output format, in that order, between the
/// begin/end markers.
pub fn system_prompt() -> String {
    [
        SYSTEM_BEGIN,
        ROLE_PROMPT.trim(),
        BEHAVIOR_PROMPT.trim(),
        STYLE_PROMPT.trim(),
        OUTPUT_FORMAT_PROMPT.trim(),
        SYSTEM_END,
    ]
    .join("\n\n")
}

/// The four instruction sections without markers, for previews.
pub fn sections() -> [(&'static str, &'static str); 4] {
    [
        ("role", ROLE_PROMPT.trim()),
        ("behavior", BEHAVIOR_PROMPT.trim()),
        ("style", STYLE_PROMPT.trim()),
        ("output_format", OUTPUT_FORMAT_PROMPT.trim()),
    ]
}

/// Recent memory (if any), then the user input, then the output instruction.
pub fn user_prompt(user_input: &str, recent: &[String]) -> String {
    let mut prompt = String::new();

    if !recent.is_empty() {
        prompt.push_str("RECENT_CONVERSATION:\n");
        let lines: Vec<String> = recent.iter().map(|entry| format!("- {entry}")).collect();
        prompt.push_str(&lines.join("\n"));
        prompt.push_str("\n\n");
    }

    prompt.push_str(&format!(
        "USER_INPUT:\n{user_input}\n\nINSTRUCTIONS:\n{FINAL_INSTRUCTION}"
    ));
    prompt
}

/// Prompt for the retry after unparseable output.
pub fn with_json_correction(previous: &str) -> String {
    format!("{JSON_CORRECTION}\n\n{previous}")
}

/// Prompt for the retry after a schema failure, listing what was wrong.
pub fn with_validation_correction(previous: &str, error: &ValidationError) -> String {
    format!(
        "{VALIDATION_CORRECTION}\nProblems found:\n{}\n\n{previous}",
        error.bullet_list()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_orders_sections() {
        let prompt = system_prompt();
        assert!(prompt.starts_with(SYSTEM_BEGIN));
        assert!(prompt.ends_with(SYSTEM_END));

        let role = prompt.find("You are Startup Analyst AI").unwrap();
        let behavior = prompt.find("Behavior rules").unwrap();
        let style = prompt.find("Style rules").unwrap();
        let format = prompt.find("OUTPUT INSTRUCTIONS").unwrap();
        assert!(role < behavior && behavior < style && style < format);
    }

    #[test]
    fn sections_are_trimmed() {
        for (name, text) in sections() {
            assert_eq!(text, text.trim(), "section {name} not trimmed");
        }
        assert!(system_prompt().contains("\n\nBehavior rules"));
    }

    #[test]
    fn user_prompt_without_memory() {
        let prompt = user_prompt("Acme Market sells to SMBs", &[]);
        assert_eq!(
            prompt,
            "USER_INPUT:\nAcme Market sells to SMBs\n\nINSTRUCTIONS:\n\
             Return only the JSON following the schema in the system instructions."
        );
    }

    #[test]
    fn user_prompt_with_memory_block() {
        let recent = vec![
            "USER: first".to_string(),
            "ASSISTANT_SUMMARY: a summary".to_string(),
        ];
        let prompt = user_prompt("second", &recent);
        assert!(prompt.starts_with(
            "RECENT_CONVERSATION:\n- USER: first\n- ASSISTANT_SUMMARY: a summary\n\nUSER_INPUT:\nsecond"
        ));
    }

    #[test]
    fn corrections_prepend_to_previous_prompt() {
        let base = user_prompt("x", &[]);
        let once = with_json_correction(&base);
        assert!(once.starts_with(JSON_CORRECTION));
        assert!(once.ends_with(&base));

        let twice = with_json_correction(&once);
        assert_eq!(twice.matches(JSON_CORRECTION).count(), 2);
    }

    #[test]
    fn validation_correction_lists_issues() {
        let err = analyst_schema::validate(&serde_json::json!({"name": "X"})).unwrap_err();
        let prompt = with_validation_correction("USER_INPUT:\nx", &err);
        assert!(prompt.starts_with(VALIDATION_CORRECTION));
        assert!(prompt.contains("- summary: missing required field"));
        assert!(prompt.ends_with("USER_INPUT:\nx"));
    }
}
