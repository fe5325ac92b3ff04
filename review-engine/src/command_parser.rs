//! Recognizes bot-triggered commands inside PR comment bodies (grounded in
//! the source's `comment_commands.py`).

use regex::{Regex, RegexBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Review,
    Explain,
    Security,
    Ignore,
    Config,
    Help,
}

impl CommandType {
    fn from_word(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "review" => Some(CommandType::Review),
            "explain" => Some(CommandType::Explain),
            "security" => Some(CommandType::Security),
            "ignore" => Some(CommandType::Ignore),
            "config" => Some(CommandType::Config),
            "help" => Some(CommandType::Help),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command_type: CommandType,
    pub args: Vec<String>,
}

/// Builds the trigger-alternation regex for a configured trigger list.
/// The trigger need not be at the start of the body.
fn build_trigger_pattern(triggers: &[String]) -> Regex {
    let escaped: Vec<String> = triggers.iter().map(|t| regex::escape(t)).collect();
    let pattern = format!(r"(?:{})\s+(\w+)(?:\s+(.+))?", escaped.join("|"));
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .expect("trigger pattern is always valid regex")
}

/// Searches `comment_body` for any configured trigger phrase followed by a
/// command word. An unrecognized command word maps to `HELP` rather than
/// `None` — only the absence of any trigger at all returns `None`.
pub fn parse_command(comment_body: &str, triggers: &[String]) -> Option<ParsedCommand> {
    if triggers.is_empty() {
        return None;
    }
    let pattern = build_trigger_pattern(triggers);
    let captures = pattern.captures(comment_body)?;

    let word = captures.get(1)?.as_str();
    let args_str = captures.get(2).map(|m| m.as_str());

    let command_type = CommandType::from_word(word).unwrap_or(CommandType::Help);
    let args = args_str
        .map(|s| s.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();

    Some(ParsedCommand { command_type, args })
}

/// Whether any configured trigger phrase occurs anywhere in the body —
/// used at the webhook layer (§4.6/§9) to decide whether to schedule
/// `process_comment_command` at all, running the *full* configured list
/// rather than a single hardcoded phrase.
pub fn contains_any_trigger(comment_body: &str, triggers: &[String]) -> bool {
    let lower = comment_body.to_ascii_lowercase();
    triggers.iter().any(|trigger| lower.contains(&trigger.to_ascii_lowercase()))
}

pub fn help_message(triggers: &[String]) -> String {
    let primary = triggers.first().map(String::as_str).unwrap_or("@reviewer");
    let triggers_list = triggers.iter().map(|t| format!("`{t}`")).collect::<Vec<_>>().join(", ");

    format!(
        "## AI Reviewer Commands\n\n\
         **Triggers:** {triggers_list}\n\n\
         | Command | Description |\n\
         |---------|-------------|\n\
         | `{primary} review` | Trigger a full review of the PR |\n\
         | `{primary} review path/to/dir` | Review only files in the specified path |\n\
         | `{primary} explain` | Get a plain-English explanation of changes |\n\
         | `{primary} security` | Security-focused review only |\n\
         | `{primary} ignore` | Skip automatic reviews for this PR |\n\
         | `{primary} config` | Show the active configuration for this repo |\n\
         | `{primary} help` | Show this help message |\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triggers() -> Vec<String> {
        vec!["@reviewer".into(), "@procrasturbate".into(), "it's gooning time".into()]
    }

    #[test]
    fn parses_review_with_args() {
        let parsed = parse_command("Hey @reviewer review src/auth/", &triggers()).unwrap();
        assert_eq!(parsed.command_type, CommandType::Review);
        assert_eq!(parsed.args, vec!["src/auth/".to_string()]);
    }

    #[test]
    fn parses_case_insensitive_alternate_trigger() {
        let parsed = parse_command("IT'S GOONING TIME security", &triggers()).unwrap();
        assert_eq!(parsed.command_type, CommandType::Security);
        assert!(parsed.args.is_empty());
    }

    #[test]
    fn no_trigger_returns_none() {
        assert!(parse_command("nothing to see here", &triggers()).is_none());
    }

    #[test]
    fn unrecognized_command_word_maps_to_help() {
        let parsed = parse_command("@reviewer frobnicate", &triggers()).unwrap();
        assert_eq!(parsed.command_type, CommandType::Help);
    }

    #[test]
    fn every_configured_trigger_parses_review() {
        for trigger in triggers() {
            let body = format!("{trigger} review");
            let parsed = parse_command(&body, &triggers()).unwrap();
            assert_eq!(parsed.command_type, CommandType::Review);
            assert!(parsed.args.is_empty());
        }
    }
}
