use super::open_tracker;

pub fn run(subject: i64) -> Result<(), Box<dyn std::error::Error>> {
    let tracker = open_tracker()?;
    let forecast = tracker.forecast(subject)?;
    println!("{}", serde_json::to_string_pretty(&forecast)?);
    Ok(())
}
