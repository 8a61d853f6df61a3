use clap::Parser;

use gigo_cli::CliArgs;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    if let Err(e) = gigo_cli::app::run(args).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
