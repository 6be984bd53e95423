use logwriter::{configure_error_sink, write_to_log_quietly};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all("./logs")?;
    configure_error_sink("errors.log", "./logs")?;

    tracing::warn!("This warning lands in ./logs/errors.log");

    // The directory does not exist; the failure is reported to the error sink
    write_to_log_quietly("never written", "./logs/missing", "app.log");

    Ok(())
}
