use std::process::ExitCode;

fn main() -> ExitCode {
    match tickrated::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(target: "tickrated::process", %error, "daemon exited with error");
            eprintln!("tickrated: {error}");
            ExitCode::FAILURE
        }
    }
}
