mod error;
mod infra;
mod runtime;

fn main() {
    if let Err(err) = runtime::run_from_args() {
        eprintln!("sensor-rig: {err}");
        std::process::exit(1);
    }
}
