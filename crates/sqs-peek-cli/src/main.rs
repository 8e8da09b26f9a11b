use sqs_peek_cli::run_cli;

#[tokio::main]
async fn main() {
    if let Err(e) = run_cli().await {
        // The subscriber may not be installed yet, so report on stderr directly
        eprintln!("sqs-peek: {} failed: {}", e.stage(), e);
        std::process::exit(1);
    }
}
