use {
    logwriter::{check_and_archive, list_archives, LogWriterBuilder, RotationSize},
    std::time::Instant,
};

const LOG_FOLDER: &str = "./logs/maintenance";

/// Writes enough records to force several rotations, then sweeps the file the
/// way a periodic maintenance job would.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();
    let writer = LogWriterBuilder::new()
        .max_size(RotationSize::KB(1))
        .create_directory(true)
        .build();

    for i in 1..=200 {
        writer.write_to_log(
            &format!("Log entry #{i}: This is a sample log message that will contribute to file size"),
            LOG_FOLDER,
            "sized.log",
        )?;
    }

    // Sweep without writing
    check_and_archive("sized.log", LOG_FOLDER, 512)?;

    println!("Done logging: {:?}", start.elapsed());
    for archive in list_archives(LOG_FOLDER, "sized.log")? {
        let size = std::fs::metadata(&archive).map_or(0, |m| m.len());
        println!("{:?} : {size} Bytes", archive.file_name().unwrap_or_default());
    }
    Ok(())
}
