use std::process::ExitCode;

fn main() -> ExitCode {
    nebo_cli::run()
}
