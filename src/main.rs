// src/main.rs

use tsbuild::{cli, logging};

#[tokio::main]
async fn main() {
    let args = cli::parse();

    if let Err(e) = logging::init_logging(&args) {
        eprintln!("tsbuild: failed to initialise logging: {e}");
        std::process::exit(1);
    }

    match tsbuild::run(args).await {
        Ok(status) => std::process::exit(status.code()),
        Err(e) => {
            eprintln!("tsbuild: {e}");
            std::process::exit(1);
        }
    }
}
