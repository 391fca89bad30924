use std::process::ExitCode;

fn main() -> ExitCode {
    basketgraph_cli::run()
}
