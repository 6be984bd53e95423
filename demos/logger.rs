use logwriter::{write_to_log, write_to_log_with_limit};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all("./logs")?;

    // Default 50 MiB threshold
    write_to_log("This is an info message", "./logs", "logger.log")?;
    write_to_log("This is a warning message", "./logs", "logger.log")?;

    // A tiny threshold archives the file on the next write
    write_to_log_with_limit("This is an error message", "./logs", "tiny.log", 16)?;
    if let Some(archive) = write_to_log_with_limit("Archived the previous line", "./logs", "tiny.log", 16)? {
        println!("Archived to {}", archive.display());
    }

    Ok(())
}
