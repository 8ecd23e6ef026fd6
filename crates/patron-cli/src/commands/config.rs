// Show the configuration resolved from the environment

use anyhow::Result;
use patron::OrchestratorConfig;

use crate::output::{print_field, OutputFormat};

pub fn run(output: OutputFormat) -> Result<()> {
    let config = OrchestratorConfig::from_env();

    if output.is_text() {
        print_field("Pool", &config.pool.name);
        print_field("Workers", &config.pool.size.to_string());
        print_field("Result buffer", &config.result_buffer.to_string());
    } else {
        output.print_value(&config)?;
    }

    Ok(())
}
