use logwriter::{ArchiveCollision, LogWriterBuilder, RotationSize, TimeZone};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let writer = LogWriterBuilder::new()
        .time_zone(TimeZone::UTC) // Use UTC for consistent timing across different regions
        .max_size(RotationSize::MB(1))
        .collision(ArchiveCollision::Fail)
        .file_mode(0o640) // Set file permissions to: owner rw, group r, others none
        .create_directory(true)
        .build();

    writer.write_to_log("System startup - UTC timestamp will be used", "./logs", "utc.log")?;
    writer.write_to_log("Configuration loaded successfully", "./logs", "utc.log")?;
    writer.write_to_log("Server listening on port 8080", "./logs", "utc.log")?;

    Ok(())
}
