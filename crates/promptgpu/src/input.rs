use shadergen::Model;

/// One line typed on stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    Prompt(String),
    Play,
    Pause,
    Reset,
    Model(Model),
    Dismiss,
    ShowError,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

pub const HELP: &str = "\
Type a description to generate a shader. Commands:
  :play            resume the animation
  :pause           freeze the animation
  :reset           clear the conversation
  :model NAME      switch model (claude, gpt4o)
  :error           show the current error in full
  :dismiss         hide the current error
  :quit            exit
Keys: Space toggles playback, Escape exits.";

pub fn parse_input(line: &str) -> InputCommand {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return InputCommand::Empty;
    }
    let Some(command) = trimmed.strip_prefix(':') else {
        return InputCommand::Prompt(trimmed.to_string());
    };
    let mut parts = command.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("play"), None) => InputCommand::Play,
        (Some("pause"), None) => InputCommand::Pause,
        (Some("reset"), None) => InputCommand::Reset,
        (Some("dismiss"), None) => InputCommand::Dismiss,
        (Some("error"), None) => InputCommand::ShowError,
        (Some("help"), None) => InputCommand::Help,
        (Some("quit" | "q"), None) => InputCommand::Quit,
        (Some("model"), Some(name)) => match name.parse() {
            Ok(model) => InputCommand::Model(model),
            Err(_) => InputCommand::Unknown(trimmed.to_string()),
        },
        _ => InputCommand::Unknown(trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_prompt() {
        assert_eq!(
            parse_input("  swirling purple nebula \n"),
            InputCommand::Prompt("swirling purple nebula".into())
        );
    }

    #[test]
    fn blank_line_is_empty() {
        assert_eq!(parse_input("   "), InputCommand::Empty);
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_input(":play"), InputCommand::Play);
        assert_eq!(parse_input(":pause"), InputCommand::Pause);
        assert_eq!(parse_input(":reset"), InputCommand::Reset);
        assert_eq!(parse_input(":dismiss"), InputCommand::Dismiss);
        assert_eq!(parse_input(":error"), InputCommand::ShowError);
        assert_eq!(parse_input(":q"), InputCommand::Quit);
        assert_eq!(parse_input(":model gpt4o"), InputCommand::Model(Model::Gpt4o));
    }

    #[test]
    fn rejects_malformed_commands() {
        assert!(matches!(parse_input(":model"), InputCommand::Unknown(_)));
        assert!(matches!(parse_input(":model llama"), InputCommand::Unknown(_)));
        assert!(matches!(parse_input(":play now"), InputCommand::Unknown(_)));
    }
}
