use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    visit_counter::lifecycle::run().await
}
