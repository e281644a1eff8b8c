use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    vertebralcare_lib::run().await
}
