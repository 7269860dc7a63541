use std::process;
use tracing::error;
use tracing_subscriber::EnvFilter;
use headserve::{Address, Server, ServerError};

fn run() -> Result<(), ServerError> {
    let server = Server::bind(&Address::default())?;
    server.run()
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    if let Err(e) = run() {
        error!("{}", e);
        process::exit(1);
    }
}
