//! Provides the main entry point to the program.
use airshed::commands::{
    Cli, Commands, ExampleSubcommands, handle_example_list_command, handle_example_run_command,
    handle_route_command, handle_run_command,
};
use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    human_panic::setup_panic!();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Run { scenario_dir } => handle_run_command(scenario_dir),
        Commands::Route {
            scenario_dir,
            from,
            to,
        } => handle_route_command(scenario_dir, from, to),
        Commands::Example { subcommand } => match subcommand {
            ExampleSubcommands::List => handle_example_list_command(),
            ExampleSubcommands::Run { name } => handle_example_run_command(name),
        },
    }
}
