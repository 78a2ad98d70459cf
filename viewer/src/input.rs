// stdin line commands
use snooper_core::Command;

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Command(Command),
    Quit,
    /// Blank line: redraw only
    Refresh,
    Unknown(String),
}

pub fn parse_line(line: &str) -> Input {
    let line = line.trim_end_matches(|c: char| c == '\r' || c == '\n');
    if let Some(query) = line.strip_prefix('/') {
        return Input::Command(Command::SetFilter(query.to_string()));
    }
    match line.trim() {
        "" => Input::Refresh,
        "p" => Input::Command(Command::TogglePause),
        "pause" => Input::Command(Command::Pause),
        "resume" => Input::Command(Command::Resume),
        "c" | "clear" => Input::Command(Command::Clear),
        "q" | "quit" | "exit" => Input::Quit,
        other => Input::Unknown(other.to_string()),
    }
}
