//! goatherd CLI - offline cache gate for Goat Manager assets.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

#[tokio::main]
async fn main() -> goatherd::Result<()> {
    env_logger::init();

    #[cfg(feature = "cli")]
    {
        goatherd::cli::run().await
    }
    #[cfg(not(feature = "cli"))]
    {
        eprintln!("CLI support not compiled in");
        std::process::exit(1);
    }
}
