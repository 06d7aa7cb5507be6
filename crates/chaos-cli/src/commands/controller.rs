use chaos_config::ControllerConfig;

pub async fn run(config: ControllerConfig) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!(
        "Starting ChaosLab controller on http://{}:{}",
        config.host, config.port
    );
    eprintln!("Agents: {}", config.agents.join(", "));
    eprintln!("Endpoints: /health, /start, /stop, /experiments");

    chaos_controller::serve(&config).await
}
