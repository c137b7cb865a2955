use std::process::ExitCode;

fn main() -> ExitCode {
    vendorhub_cli::run()
}
