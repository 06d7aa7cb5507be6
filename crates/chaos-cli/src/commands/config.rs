use chaos_config::ChaosConfig;

pub fn run(config: &ChaosConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Print as YAML for readability
    let yaml = serde_yaml::to_string(config)?;
    println!("{}", yaml);

    Ok(())
}
