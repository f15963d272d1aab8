fn main() {
    std::process::exit(pwpost_cli::cli::run_from_env());
}
