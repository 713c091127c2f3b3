use gentlealarm_core::AlarmSound;
use serde_json::json;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let sounds: Vec<serde_json::Value> = AlarmSound::selectable()
        .map(|s| {
            json!({
                "id": s.asset_id(),
                "name": s.display_name(),
                "description": s.description(),
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&sounds)?);
    Ok(())
}
