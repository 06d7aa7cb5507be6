use chaos_core::ExperimentRecord;

use super::endpoint;

pub async fn run(base: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let resp = reqwest::get(endpoint(base, "/experiments")).await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(format!("Failed to list experiments ({}): {}", status, body).into());
    }

    let records: Vec<ExperimentRecord> = resp.json().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No experiments recorded.");
        return Ok(());
    }
    println!(
        "{:<5} {:<20} {:<16} {:<24} START",
        "ID", "ACCEPTED", "TYPE", "NAME"
    );
    for record in &records {
        println!("{}", format_row(record));
    }
    Ok(())
}

fn format_row(record: &ExperimentRecord) -> String {
    let def = &record.definition;
    let start = def
        .start_time
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "now".to_string());
    format!(
        "{:<5} {:<20} {:<16} {:<24} {}",
        record.id,
        record.accepted_at.format("%Y-%m-%d %H:%M:%S"),
        def.experiment_type,
        def.name,
        start
    )
}
