//! `skillshare completions` — shell completion scripts.

use clap::CommandFactory;

use crate::Cli;

pub fn completions(shell: clap_complete::Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
}
