//! Reusable prompts using Handlebars for templating. Handlebars adds
//! additional security controls since it can't do much out of the box
//! without registering your own helpers. This is ideal since output
//! from LLMs should be considered untrusted and Handlebars forces you
//! to add only what you need.

use std::fmt;

use handlebars::{
    Handlebars, RenderError, TemplateError, handlebars_helper, no_escape,
};
use serde_json::json;

use crate::ai::session::Constraint;

// A simple `inc` helper for use with `each` and `@index` so that
// there can be natural number sequences when rendering (instead of
// starting at 0).
handlebars_helper!(inc: |v: i64| format!("{}", v + 1));

#[derive(Debug)]
pub enum Prompt {
    InitialPrompt,
    InterimPrompt,
    UnknownFormat,
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

pub const FIRST_QUESTION: &str = "Ask your first question";
pub const NEXT_QUESTION: &str = "Ask your next question";

const MESSAGE_FORMAT_PARTIAL: &str = "message_format";

const MESSAGE_FORMAT: &str = r#"Anything you output must be a JSON object which matches the following schema, which wraps your message contents within a JSON object so that it is machine parseable:
{
    "type": "object",
    "properties": {
        "kind": {
            "enum": ["INTRO", "FOLLOW_UP", "CONSTRAINT_SUMMARY", "FINISHED"]
        },
        "contents": {
            "type": "string"
        }
    },
    "required": ["kind", "contents"]
}

- "INTRO" should be used for the initial question about a specific constraint on the input.
- "FOLLOW_UP" should be used for a response to a user question, or a follow-up question if you do not understand the specific constraint yet.
- "CONSTRAINT_SUMMARY" should be used for a summary of the constraint on the input you have discovered. This should be returned when you understand the specific constraint and you're ready to ask the next one. It should NOT repeat information captured in previous constraints.
- "FINISHED" should be used to indicate that you are finished collecting constraints.

An example of a valid message is:
{ "kind": "INTRO", "contents": "Can the input be empty?" }

Do not return any other text outside of the JSON object.
"#;

const OUTPUT_ONLY_JSON: &str = "It is essential that your entire response contains ONLY a single JSON object matching the format given above. Do not write any other text. A machine is parsing your response.";

const INITIAL_PROMPT: &str = r#"You are a large language model. Answer only in JSON objects which conform to the format described below.
You are tasked with discovering the constraints of the inputs of a Python function whose purpose is described as:
"{{purpose}}"

You are to ask questions *in a machine-parseable manner* to get a comprehensive description of the possible inputs.

{{> message_format}}

Engage in a conversation with the user, try and focus on discovering one constraint on the input at a time, starting with an "INTRO". Respond with "FOLLOW_UP"s until you understand that one constraint. Then send a "CONSTRAINT_SUMMARY".
Do NOT ask another question until asked to.
When you have figured out all of the constraints, send a "FINISHED" message.

{{output_only_json}}
"#;

const INTERIM_PROMPT: &str = r#"You are a large language model. Answer only in JSON objects which conform to the format described below.
You are tasked with discovering the constraints of the inputs of a Python function whose purpose is described as:
"{{purpose}}"

You have already acquired the following constraints:
{{#each constraints}}
{{inc @index}}. {{this}}
{{/each}}

{{> message_format}}

Ask a question about a different constraint if there are more unclear aspects, or send a "FINISHED" message if you are done. Do not repeat existing constraints, they have been stored.
{{output_only_json}}
"#;

const UNKNOWN_FORMAT_PROMPT: &str = r#"Your response was in an incorrect format.

{{> message_format}}

{{output_only_json}}
"#;

pub fn templates<'a>() -> Result<Handlebars<'a>, TemplateError> {
    let mut registry = Handlebars::new();
    registry.set_strict_mode(true);
    // Prompts are plain text, HTML escaping would mangle quotes in
    // the function purpose and constraints
    registry.register_escape_fn(no_escape);
    registry.register_helper("inc", Box::new(inc));
    registry.register_partial(MESSAGE_FORMAT_PARTIAL, MESSAGE_FORMAT)?;
    registry.register_template_string(&Prompt::InitialPrompt.to_string(), INITIAL_PROMPT)?;
    registry.register_template_string(&Prompt::InterimPrompt.to_string(), INTERIM_PROMPT)?;
    registry.register_template_string(&Prompt::UnknownFormat.to_string(), UNKNOWN_FORMAT_PROMPT)?;
    Ok(registry)
}

/// System prompt that opens a session.
pub fn initial_prompt(templates: &Handlebars, purpose: &str) -> Result<String, RenderError> {
    templates.render(
        &Prompt::InitialPrompt.to_string(),
        &json!({
            "purpose": purpose,
            "output_only_json": OUTPUT_ONLY_JSON,
        }),
    )
}

/// System prompt that replaces the transcript once a constraint is
/// confirmed. Lists everything confirmed so far in order.
pub fn interim_prompt(
    templates: &Handlebars,
    purpose: &str,
    constraints: &[Constraint],
) -> Result<String, RenderError> {
    templates.render(
        &Prompt::InterimPrompt.to_string(),
        &json!({
            "purpose": purpose,
            "constraints": constraints,
            "output_only_json": OUTPUT_ONLY_JSON,
        }),
    )
}

/// Corrective instruction sent after a reply that couldn't be parsed.
pub fn unknown_format_prompt(templates: &Handlebars) -> Result<String, RenderError> {
    templates.render(
        &Prompt::UnknownFormat.to_string(),
        &json!({ "output_only_json": OUTPUT_ONLY_JSON }),
    )
}

pub fn revision_request(feedback: &str) -> String {
    format!("Constraint needs modification: {}", feedback)
}
