use clap::{Parser, Subcommand};

use homecost::api::{CompareArgs, run_compare, run_http_server};

#[derive(Parser, Debug)]
#[command(
    name = "homecost",
    about = "Long-run housing cost comparison: apartment vs detached house"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the comparison JSON API
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Print one comparison as JSON
    Compare(CompareArgs),
}

#[tokio::main]
async fn main() {
    env_logger::init();

    match Cli::parse().command {
        Command::Serve { port } => {
            if let Err(e) = run_http_server(port).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Command::Compare(args) => match run_compare(&args) {
            Ok(json) => println!("{json}"),
            Err(msg) => {
                eprintln!("{msg}");
                std::process::exit(1);
            }
        },
    }
}
