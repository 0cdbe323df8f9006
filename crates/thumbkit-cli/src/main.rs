mod args;
mod config;
mod interactive;
mod io;
mod parse;
mod run;


fn main() {
    if let Err(err) = run::run() {
        eprintln!("ERROR: {err}");
        std::process::exit(1);
    }
}
