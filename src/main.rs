use aci_pusher::cli::{Args, Runner, exit_code};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::parse_args() {
        Ok(args) => args.from_env(),
        Err(code) => return ExitCode::from(code),
    };
    let runner = Runner::new(args);

    match runner.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            runner.logger().error(&err.to_string());
            ExitCode::from(exit_code(&err))
        }
    }
}
