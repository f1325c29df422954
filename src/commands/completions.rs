use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};
use log::debug;
use miette::Result;

use super::{RelkitArgs, RelkitCommand};

#[derive(Debug, Clone, Args)]
pub struct CompletionsCommand {
    #[arg(value_enum)]
    shell: Shell,
}

impl RelkitCommand for CompletionsCommand {
    fn try_run(&mut self) -> Result<()> {
        debug!("Generating completions for {shell}", shell = self.shell);

        generate(
            self.shell,
            &mut RelkitArgs::command(),
            "relkit",
            &mut std::io::stdout().lock(),
        );

        Ok(())
    }
}
