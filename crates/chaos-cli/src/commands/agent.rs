use chaos_config::AgentConfig;

pub async fn run(config: AgentConfig) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!(
        "Starting ChaosLab agent on http://{}:{} (interface {})",
        config.host, config.port, config.interface
    );
    eprintln!("Endpoints: /health, /inject");

    chaos_agent::serve(&config).await
}
