//! Entry point for the `siteplan` command-line interface.
#![forbid(unsafe_code)]

#[expect(
    clippy::print_stderr,
    reason = "the binary reports fatal errors on stderr"
)]
fn main() {
    env_logger::init();
    if let Err(err) = siteplan_cli::run() {
        eprintln!("siteplan: {err}");
        std::process::exit(1);
    }
}
