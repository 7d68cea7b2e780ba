use clap::Parser;
use keyhold::cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Create {
            ref path,
            ref store_type,
            ref password,
            force,
        } => keyhold::cli::commands::create::execute(path, store_type, password.as_deref(), force),
    };

    if let Err(e) = result {
        keyhold::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
