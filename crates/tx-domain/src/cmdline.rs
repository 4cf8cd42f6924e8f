//! Command-line splitting and placeholder substitution for manifest commands.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CmdlineError {
    #[error("unterminated quote in command `{command}`")]
    UnterminatedQuote { command: String },
    #[error("unknown placeholder `{{{name}}}`")]
    UnknownPlaceholder { name: String },
    #[error("unclosed `{{` in `{word}`")]
    UnclosedPlaceholder { word: String },
}

/// Values substituted into command words before execution.
#[derive(Debug, Clone, Copy)]
pub struct Substitutions<'a> {
    pub envname: &'a str,
    pub envdir: &'a str,
    pub rootdir: &'a str,
    pub posargs: &'a [String],
}

/// Splits a manifest command string into argv words.
///
/// Whitespace separates words; single and double quotes group. A backslash
/// outside quotes escapes the next character; inside double quotes only
/// `\"` and `\\` are escapes.
pub fn split_command_line(line: &str) -> Result<Vec<String>, CmdlineError> {
    let unterminated = || CmdlineError::UnterminatedQuote {
        command: line.to_string(),
    };

    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(ch) = chars.next() {
        match ch {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(inner) => current.push(inner),
                        None => return Err(unterminated()),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(escaped @ ('"' | '\\')) => current.push(escaped),
                            Some(other) => {
                                current.push('\\');
                                current.push(other);
                            }
                            None => return Err(unterminated()),
                        },
                        Some(inner) => current.push(inner),
                        None => return Err(unterminated()),
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(escaped) => current.push(escaped),
                    None => current.push('\\'),
                }
            }
            other => {
                in_word = true;
                current.push(other);
            }
        }
    }

    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// Expands placeholders in already-split words.
///
/// A word that is exactly `{posargs}` splices the positional arguments in
/// place; embedded occurrences join them with single spaces. `{{` and `}}`
/// produce literal braces.
pub fn substitute_words(
    words: &[String],
    subs: &Substitutions<'_>,
) -> Result<Vec<String>, CmdlineError> {
    let mut expanded = Vec::with_capacity(words.len());
    for word in words {
        if word == "{posargs}" {
            expanded.extend(subs.posargs.iter().cloned());
            continue;
        }
        expanded.push(expand_word(word, subs)?);
    }
    Ok(expanded)
}

fn expand_word(word: &str, subs: &Substitutions<'_>) -> Result<String, CmdlineError> {
    let mut out = String::with_capacity(word.len());
    let mut chars = word.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '{' => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    out.push('{');
                    continue;
                }
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(inner) => name.push(inner),
                        None => {
                            return Err(CmdlineError::UnclosedPlaceholder {
                                word: word.to_string(),
                            })
                        }
                    }
                }
                out.push_str(&resolve_placeholder(&name, subs)?);
            }
            '}' => {
                if chars.peek() == Some(&'}') {
                    chars.next();
                }
                out.push('}');
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

fn resolve_placeholder(name: &str, subs: &Substitutions<'_>) -> Result<String, CmdlineError> {
    match name {
        "posargs" => Ok(subs.posargs.join(" ")),
        "envname" => Ok(subs.envname.to_string()),
        "envdir" => Ok(subs.envdir.to_string()),
        "rootdir" => Ok(subs.rootdir.to_string()),
        other => Err(CmdlineError::UnknownPlaceholder {
            name: other.to_string(),
        }),
    }
}
