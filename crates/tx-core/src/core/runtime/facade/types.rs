use std::fmt;

use serde::{Deserialize, Serialize};

/// Top-level command family, used in status prefixes and JSON envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandGroup {
    Run,
    List,
    Show,
    Dist,
    Init,
    Completions,
}

impl fmt::Display for CommandGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandGroup::Run => "run",
            CommandGroup::List => "list",
            CommandGroup::Show => "show",
            CommandGroup::Dist => "dist",
            CommandGroup::Init => "init",
            CommandGroup::Completions => "completions",
        };
        f.write_str(name)
    }
}
