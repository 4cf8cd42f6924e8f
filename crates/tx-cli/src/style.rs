use std::env;

use color_eyre::owo_colors::OwoColorize;
use tx_core::api::CommandStatus;

pub struct Style {
    enabled: bool,
}

impl Style {
    pub fn new(force_no_color: bool, is_tty: bool) -> Self {
        let env_no_color = env::var_os("NO_COLOR").is_some();
        Self {
            enabled: !(force_no_color || env_no_color) && is_tty,
        }
    }

    pub fn status(&self, status: &CommandStatus, text: &str) -> String {
        let (symbol, tone) = match status {
            CommandStatus::Ok => ("✔", Tone::Green),
            CommandStatus::UserError => ("✗", Tone::Yellow),
            CommandStatus::Failure => ("✖", Tone::Red),
        };
        let line = format!("{symbol} {text}");
        self.paint(&line, tone, true)
    }

    pub fn info(&self, text: &str) -> String {
        self.paint(text, Tone::Blue, false)
    }

    pub fn error_header(&self, text: &str) -> String {
        self.paint(text, Tone::Red, true)
    }

    pub fn fix_bullet(&self, text: &str) -> String {
        self.paint(text, Tone::Green, false)
    }

    #[allow(dead_code)]
    pub fn dim(&self, text: &str) -> String {
        if !self.enabled {
            return text.to_string();
        }
        text.dimmed().to_string()
    }

    fn paint(&self, text: &str, tone: Tone, bold: bool) -> String {
        if !self.enabled {
            return text.to_string();
        }
        match tone {
            Tone::Green => {
                if bold {
                    text.green().bold().to_string()
                } else {
                    text.green().to_string()
                }
            }
            Tone::Yellow => {
                if bold {
                    text.yellow().bold().to_string()
                } else {
                    text.yellow().to_string()
                }
            }
            Tone::Red => {
                if bold {
                    text.red().bold().to_string()
                } else {
                    text.red().to_string()
                }
            }
            Tone::Blue => {
                if bold {
                    text.cyan().bold().to_string()
                } else {
                    text.cyan().to_string()
                }
            }
        }
    }
}

enum Tone {
    Green,
    Yellow,
    Red,
    Blue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_style_passes_text_through() {
        let style = Style::new(true, true);
        assert_eq!(style.info("plain"), "plain");
        assert_eq!(style.dim("plain"), "plain");
        assert_eq!(style.status(&CommandStatus::Ok, "done"), "✔ done");
        assert_eq!(style.status(&CommandStatus::Failure, "broke"), "✖ broke");
    }

    #[test]
    fn non_tty_disables_styling() {
        let style = Style::new(false, false);
        assert_eq!(style.error_header("oops"), "oops");
    }
}
