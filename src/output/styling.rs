use console::style;

/// Styling helpers for terminal output
pub fn bright_yellow(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).bright().yellow()
}

pub fn bright_red(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).bright().red()
}

pub fn bold(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).bold()
}

pub fn cyan_underlined(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).cyan().underlined()
}

pub fn cyan_bold(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).cyan().bold()
}

pub fn dim(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).dim()
}

pub fn bright(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).bright()
}

pub fn bright_green(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).bright().green()
}

pub fn magenta_bold(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).magenta().bold()
}
