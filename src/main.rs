use clap::Parser;
use gsnip_lib::cli::{self, Cli};

#[tokio::main]
async fn main() {
    gsnip_lib::logging::init();
    let cli = Cli::parse();
    if let Err(e) = cli::run(cli).await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
