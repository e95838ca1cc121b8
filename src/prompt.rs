use std::fs;
use std::io::ErrorKind;
use std::path::Path;

pub const DEFAULT_PROMPT: &str = r#"You are a Latin to Italian translator with expertise in both languages' grammar and vocabulary. Your task is to translate Latin text into Italian, explain translation decisions, and analyze Latin grammar.

Present your work in the following format:

<translation>
[Italian translation]
</translation>

<analysis>
[Grammatical analysis and translation decisions]
</analysis>

<latin_italian_dictionary>
[Relevant dictionary entries]
</latin_italian_dictionary>

<latin_grammar_manual>
[Relevant Latin grammar explanations]
</latin_grammar_manual>

<italian_grammar_manual>
[Relevant Italian grammar explanations]
</italian_grammar_manual>"#;

/// Reads the system instruction override, falling back to [`DEFAULT_PROMPT`]
/// when the file is missing, unreadable or blank.
pub fn load_system_prompt(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(content) if !content.trim().is_empty() => content.trim().to_owned(),
        Ok(_) => {
            log::debug!("{} is empty, using the default prompt", path.display());
            DEFAULT_PROMPT.to_owned()
        }
        Err(e) if e.kind() == ErrorKind::NotFound => DEFAULT_PROMPT.to_owned(),
        Err(e) => {
            log::warn!(
                "Failed to read {}: {e}, using the default prompt",
                path.display()
            );
            DEFAULT_PROMPT.to_owned()
        }
    }
}
