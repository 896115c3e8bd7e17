//! System instruction of the reception node

use copilot_core::{Error, Result};
use minijinja::{Environment, context};

const RECEPTION_TEMPLATE: &str = "\
You are a reception agent that is responsible for receiving messages from the user.
If the user asks for a trading recommendation, use the fetch_market_data tool to get the market data.
If the user did not mention a period of time, ask the user for it (e.g. \"What time period do you want me to consider? \
The price of the coin in the last 1 hour, 1 day, 1 week, 1 month, 1 year?\").
If the user asks for anything else, tell the user that you are not able to help with that.
When your response is complete, prefix it with {{ sentinel }} so the system knows to stop.
You have access to the following tools: {{ tool_names | join(\", \") }}";

/// Render the reception instruction for the given tool names
pub fn reception_prompt(tool_names: &[&str], sentinel: &str) -> Result<String> {
    let env = Environment::new();
    env.render_str(
        RECEPTION_TEMPLATE,
        context! { tool_names => tool_names, sentinel => sentinel },
    )
    .map_err(|e| Error::Configuration(format!("reception prompt failed to render: {e}")))
}
