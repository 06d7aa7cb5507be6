use chaos_core::StatusResponse;

use super::endpoint;

pub async fn run(base: &str) -> Result<(), Box<dyn std::error::Error>> {
    let resp = reqwest::Client::new()
        .post(endpoint(base, "/stop"))
        .send()
        .await?;
    let status = resp.status();
    let reply: Option<StatusResponse> = resp.json().await.ok();

    match reply {
        Some(reply) if status.is_success() => {
            println!("{}: {}", reply.status, reply.message);
            Ok(())
        }
        Some(reply) => Err(format!(
            "Controller cannot stop experiments ({}): {}",
            status, reply.message
        )
        .into()),
        None => Err(format!("Unexpected response from controller: {}", status).into()),
    }
}
