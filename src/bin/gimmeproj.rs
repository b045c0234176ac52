use gsnip_lease::cli::{self, LeaseCli};
use gsnip_lease::PoolKind;

#[tokio::main]
async fn main() {
    gsnip_lib::logging::init();
    let kind = PoolKind::Projects;
    if let Err(e) = cli::run(kind, LeaseCli::parse_for(kind)).await {
        eprintln!("{}", e);
        std::process::exit(2);
    }
}
