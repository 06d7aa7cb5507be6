use std::path::Path;

use chaos_core::{ExperimentDefinition, StatusResponse};

use super::endpoint;

pub async fn run(base: &str, file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;
    let definition = parse_definition(&content)?;

    let resp = reqwest::Client::new()
        .post(endpoint(base, "/start"))
        .json(&definition)
        .send()
        .await?;

    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(format!("Controller rejected experiment ({}): {}", status, body).into());
    }

    let reply: StatusResponse = serde_json::from_str(&body)?;
    println!("{}: {}", reply.status, reply.message);
    Ok(())
}

/// Parse and sanity-check an experiment file before it leaves this machine.
fn parse_definition(content: &str) -> Result<ExperimentDefinition, Box<dyn std::error::Error>> {
    let definition: ExperimentDefinition =
        serde_json::from_str(content).map_err(|e| format!("Invalid experiment JSON: {}", e))?;
    if let Err(e) = definition.experiment_type.parse::<chaos_core::FaultType>() {
        eprintln!("warning: {}; agents will drop this experiment", e);
    }
    Ok(definition)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_definition() {
        let def = parse_definition(
            r#"{"name":"burn","experiment_type":"cpu-stress","duration":5,"cpu_workers":2}"#,
        )
        .unwrap();
        assert_eq!(def.name, "burn");
        assert_eq!(def.cpu_workers, 2);
    }

    #[test]
    fn test_parse_definition_keeps_unknown_type() {
        let def = parse_definition(r#"{"experiment_type":"disk-fill"}"#).unwrap();
        assert_eq!(def.experiment_type, "disk-fill");
    }

    #[test]
    fn test_parse_definition_rejects_bad_json() {
        let err = parse_definition("{\"duration\": \"soon\"}").unwrap_err();
        assert!(err.to_string().contains("Invalid experiment JSON"));
    }
}
