use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match fitness_schedule::run().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("fitness-schedule: {err}");
            ExitCode::FAILURE
        }
    }
}
