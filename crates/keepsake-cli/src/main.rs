//! keepsake - back up authored answers as portable HTML

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match keepsake_cli::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        },
    }
}
