use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    brainbuddy::run().await
}
