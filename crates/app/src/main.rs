mod cli;
mod interactive;
mod process;
mod state;

use clap::{Parser, Subcommand};
use cli::{args::Args, op::Op, Keygen, ReceiveFile, SendFile};

command_enum! {
    (Keygen, Keygen),
    (Send, SendFile),
    (Receive, ReceiveFile),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let ctx = match cli::op::OpContext::new(args.config_path) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let guards = process::init_logging(&ctx.config);

    let code = match args.command.execute(&ctx).await {
        Ok(output) => {
            let output = output.to_string();
            if !output.is_empty() {
                println!("{}", output);
            }
            0
        }
        Err(e) => {
            tracing::debug!("command failed: {:?}", e);
            eprintln!("Error: {}", e);
            1
        }
    };

    // flush the non-blocking writers before exiting
    drop(guards);
    std::process::exit(code);
}
