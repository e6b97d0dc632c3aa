use std::io::{self, Write};

use clap::{CommandFactory, Parser};
use clap_complete::{Shell, generate};

/// Generate shell completion scripts for firecrawl-flow
#[derive(Parser, Debug)]
pub struct Completion {
    /// The shell to generate completions for
    #[arg(value_enum, long)]
    pub shell: Shell,
}

impl Completion {
    pub fn run(&self) -> anyhow::Result<()> {
        let script = render(self.shell)?;
        io::stdout().write_all(script.as_bytes())?;
        Ok(())
    }
}

/// Render the completion script for `shell`.
///
/// The zsh `compdef` call is guarded so the script can be sourced before
/// `compinit` has run.
pub(crate) fn render(shell: Shell) -> anyhow::Result<String> {
    let mut cmd = crate::cli::Cli::command();
    let bin_name = cmd.get_name().to_string();

    let mut buf = Vec::new();
    generate(shell, &mut cmd, bin_name.clone(), &mut buf);
    let script = String::from_utf8(buf)?;

    if shell != Shell::Zsh {
        return Ok(script);
    }
    let bare = format!("compdef _{0} {0}", bin_name);
    let guarded = format!("(( $+functions[compdef] )) && compdef _{0} {0}", bin_name);
    Ok(script.replace(&bare, &guarded))
}
