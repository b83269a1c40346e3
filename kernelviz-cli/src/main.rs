use std::process;

#[tokio::main]
async fn main() {
    match kernelviz::cli::run().await {
        Ok(()) => {}
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    }
}
