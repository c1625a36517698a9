fn main() {
    if let Err(err) = payroll_detect::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
