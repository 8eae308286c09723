fn main() {
    if let Err(err) = csv_recon::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
