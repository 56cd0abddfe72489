use crate::command_error::CommandError;

const REPLY_ERROR_MAX_CHARS: usize = 600;

fn truncate_for_reply(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated = text.chars().take(max_chars).collect::<String>();
    truncated.push_str("...");
    truncated
}

/// Render the comment posted back to `username` when one of their commands fails.
pub fn render_command_error_reply(username: &str, error: &CommandError) -> String {
    format!(
        "Hi @{username}. Your command failed:\n\n```\n{}\n```\n\nOnce the problem is fixed, you can send the command again.",
        truncate_for_reply(&error.to_string(), REPLY_ERROR_MAX_CHARS)
    )
}
