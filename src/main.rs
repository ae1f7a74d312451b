fn main() {
    if let Err(e) = carapace::run() {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
