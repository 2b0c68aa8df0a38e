fn main() {
    if let Err(err) = sunburst_rs::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
