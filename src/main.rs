fn main() {
    if let Err(err) = series_report::run() {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}
