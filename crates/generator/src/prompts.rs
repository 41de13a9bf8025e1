//! Prompts for artifact generation

use pagesmith_core::Attachment;

pub const SYSTEM_PROMPT: &str = r#"You are an expert front-end engineer.
You build complete single-file web applications: HTML, CSS in <style> tags and
JavaScript in <script> tags, all inside one index.html.
Respond with the file contents only."#;

pub fn initial_prompt(brief: &str, attachments: &[Attachment]) -> String {
    let mut prompt = format!(
        r#"Create a fully functional single-file HTML web application based on the following brief:

{brief}

Requirements:
- Create a complete, self-contained HTML file (index.html)
- Include all HTML, CSS (in <style> tags), and JavaScript (in <script> tags) in one file
- The application should be fully functional and ready to deploy
- Use modern web standards and best practices
- Make it visually appealing and user-friendly
"#
    );

    if !attachments.is_empty() {
        prompt.push_str("\n\nAdditional context/attachments:\n");
        prompt.push_str(&attachment_list(attachments));
    }

    prompt
}

pub fn revision_prompt(brief: &str, existing: &str) -> String {
    format!(
        r#"Given the current code below, update the application to satisfy this new requirement: {brief}

Current code:
{existing}

Please provide the complete updated HTML file with all HTML, CSS, and JavaScript in a single file. The application should be fully functional and self-contained."#
    )
}

fn attachment_list(attachments: &[Attachment]) -> String {
    attachments
        .iter()
        .map(|a| format!("- {}: {}", a.name, a.url))
        .collect::<Vec<_>>()
        .join("\n")
}
