//! Prompt text sent to the note-generating model.
//!
//! Callers can override the default via [`crate::config::ScribbleConfig::prompt`];
//! the constant here is used only when no override is provided.

/// Default instruction for turning a page into handwritten-style notes.
///
/// The renderer letters one item per line, so the model is asked for plain
/// lines without markup.
pub const DEFAULT_NOTES_PROMPT: &str = r#"Create handwritten study notes from this PDF page. Focus on:
1. Key concepts and important points
2. Short phrases, the way a student jots them in a margin
3. Connections between related ideas ("X -> Y")
4. Rough workings if the page contains maths
5. Leave some white space: at most 15 notes

Output format:
- One note per line
- Plain text only, no Markdown, no bullets, no numbering
- Do NOT add commentary before or after the notes"#;

/// Resolve the prompt for a request, falling back to [`DEFAULT_NOTES_PROMPT`].
pub fn notes_prompt(custom: Option<&str>) -> &str {
    custom.unwrap_or(DEFAULT_NOTES_PROMPT)
}

/// Append the page's extracted text to the instruction.
///
/// Pages without a text layer (scans) get the instruction alone; the model
/// then works from the attached bitmap.
pub fn with_page_text(prompt: &str, page_text: &str) -> String {
    let text = page_text.trim();
    if text.is_empty() {
        prompt.to_string()
    } else {
        format!("{prompt}\n\nPage text:\n\"\"\"\n{text}\n\"\"\"")
    }
}
