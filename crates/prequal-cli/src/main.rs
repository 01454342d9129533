fn main() {
    if let Err(error) = prequal_cli::run() {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}
