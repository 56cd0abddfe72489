//! Line scanner for the `/ocabot <command> [<option> ...]` comment syntax.
//!
//! Comments are scanned line by line. A line starting with the quote marker
//! `>` is a forwarded comment and is never scanned, so quoting a previous
//! command does not trigger it again. A line yields at most one invocation;
//! when the trigger appears several times on a line, the last occurrence
//! followed by a command name wins. The whitespace after the trigger may
//! include line breaks, in which case the command name and options are read
//! from the next non-blank line and scanning resumes after it.

/// Literal token that starts a bot invocation.
pub const BOT_COMMAND_TRIGGER: &str = "/ocabot";

/// First character of a quoted (forwarded) comment line.
pub const QUOTED_LINE_MARKER: char = '>';

/// One occurrence of the trigger syntax, before any validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation<'a> {
    pub command: &'a str,
    pub options: Vec<&'a str>,
    /// 1-based line of the scanned text the invocation was found on.
    pub line_number: usize,
}

/// Returns true for characters that may appear in command names and options.
pub fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

fn is_option_char(ch: char) -> bool {
    ch == ' ' || ch == '\t' || is_word_char(ch)
}

/// Returns true when `line` is a quoted/forwarded comment line.
pub fn is_quoted_line(line: &str) -> bool {
    line.starts_with(QUOTED_LINE_MARKER)
}

/// Splits a raw option run into tokens, dropping surrounding and repeated whitespace.
pub fn split_option_tokens(raw: &str) -> Vec<&str> {
    raw.split_whitespace().collect()
}

/// Returns the length in bytes of the longest prefix of `text` made of `accept` characters.
fn prefix_len(text: &str, accept: impl Fn(char) -> bool) -> usize {
    text.char_indices()
        .find(|(_, ch)| !accept(*ch))
        .map_or(text.len(), |(index, _)| index)
}

/// Parses what follows a trigger occurrence: whitespace, a command name, then the option run.
///
/// Returns the command, the raw option run and the number of bytes consumed.
fn parse_after_trigger(rest: &str) -> Option<(&str, &str, usize)> {
    let gap = prefix_len(rest, char::is_whitespace);
    if gap == 0 {
        return None;
    }
    let after_gap = &rest[gap..];
    let command_len = prefix_len(after_gap, is_word_char);
    if command_len == 0 {
        return None;
    }
    let (command, tail) = after_gap.split_at(command_len);
    let options_len = prefix_len(tail, is_option_char);
    Some((command, &tail[..options_len], gap + command_len + options_len))
}

/// Byte offset of the start of the line after the one containing `from`.
fn next_line_start(text: &str, from: usize) -> usize {
    text[from..]
        .find('\n')
        .map_or(text.len(), |index| from + index + 1)
}

struct LineMatch<'a> {
    command: &'a str,
    raw_options: &'a str,
    /// Where scanning resumes: the line after the one the option run ends on.
    resume_at: usize,
}

/// Matches the line `text` starts with. Only the trigger has to be on that
/// line; the gap before the command name may run over line breaks.
fn match_line<'a>(text: &'a str, trigger: &str) -> Option<LineMatch<'a>> {
    if trigger.is_empty() || is_quoted_line(text) {
        return None;
    }
    let line_end = text.find('\n').unwrap_or(text.len());
    text[..line_end]
        .rmatch_indices(trigger)
        .find_map(|(start, _)| {
            let after_trigger = start + trigger.len();
            let (command, raw_options, consumed) = parse_after_trigger(&text[after_trigger..])?;
            Some(LineMatch {
                command,
                raw_options,
                resume_at: next_line_start(text, after_trigger + consumed),
            })
        })
}

/// Scans the line `text` starts with for an invocation.
///
/// `text` may hold the rest of the comment: a trigger ending its line picks
/// up a command name from the next non-blank line, as [`CommandScanner`] does.
pub fn scan_line<'a>(text: &'a str, trigger: &str, line_number: usize) -> Option<Invocation<'a>> {
    let found = match_line(text, trigger)?;
    Some(Invocation {
        command: found.command,
        options: split_option_tokens(found.raw_options),
        line_number,
    })
}

/// Lazy iterator over the invocations of a block of text, top to bottom.
#[derive(Debug, Clone)]
pub struct CommandScanner<'a> {
    rest: &'a str,
    /// 1-based line `rest` starts on.
    line_number: usize,
    trigger: &'a str,
}

impl<'a> CommandScanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self::with_trigger(text, BOT_COMMAND_TRIGGER)
    }

    pub fn with_trigger(text: &'a str, trigger: &'a str) -> Self {
        Self {
            rest: text,
            line_number: 1,
            trigger,
        }
    }
}

impl<'a> Iterator for CommandScanner<'a> {
    type Item = Invocation<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.rest.is_empty() {
            let text = self.rest;
            let line_number = self.line_number;
            let found = match_line(text, self.trigger);
            let resume_at = found
                .as_ref()
                .map_or_else(|| next_line_start(text, 0), |found| found.resume_at);
            self.line_number += text[..resume_at].matches('\n').count();
            self.rest = &text[resume_at..];
            if let Some(found) = found {
                return Some(Invocation {
                    command: found.command,
                    options: split_option_tokens(found.raw_options),
                    line_number,
                });
            }
        }
        None
    }
}

impl std::iter::FusedIterator for CommandScanner<'_> {}

/// Scans `text` for `/ocabot` invocations.
pub fn scan_invocations(text: &str) -> CommandScanner<'_> {
    CommandScanner::new(text)
}
