//! Simulated weather tools for trying out tool calling.

use serde_json::json;
use tracing::info;

use crate::tools::{FnTool, ToolParameters, ToolRegistry};

const LOCATION_HINT: &str = "The city and state, e.g. San Francisco, CA";
const CONDITIONS: [&str; 3] = ["rainy", "cloudy", "windy and sunny"];

pub fn current_weather_tool() -> FnTool {
    FnTool::new(
        "get_current_weather",
        "Get the current weather",
        ToolParameters::object()
            .string("location", LOCATION_HINT, true)
            .build(),
        |args, _ctx| async move {
            let location = args.get_str_opt("location").unwrap_or("unknown location");
            info!(location, "simulating get_current_weather");
            Ok(json!({
                "temperature": "25°C",
                "weather": "sunny",
                "location": location,
            }))
        },
    )
}

pub fn forecast_tool() -> FnTool {
    FnTool::new(
        "get_n_day_weather_forecast",
        "Get an N-day weather forecast",
        ToolParameters::object()
            .string("location", LOCATION_HINT, true)
            .integer("num_days", "The number of days to forecast", true)
            .build(),
        |args, _ctx| async move {
            let location = args.get_str_opt("location").unwrap_or("unknown location");
            let num_days = args.get_i64_opt("num_days").unwrap_or(1);
            info!(location, num_days, "simulating get_n_day_weather_forecast");
            let forecast: Vec<_> = (0..num_days.max(0))
                .map(|i| {
                    json!({
                        "day": i + 1,
                        "temperature": format!("{}°C", 20 + i),
                        "weather": CONDITIONS[(i % 3) as usize],
                    })
                })
                .collect();
            Ok(json!({
                "forecast": forecast,
                "location": location,
                "num_days": num_days,
            }))
        },
    )
}

/// Registry holding both weather tools.
pub fn weather_tools() -> ToolRegistry {
    ToolRegistry::new()
        .with_tool(current_weather_tool())
        .with_tool(forecast_tool())
}
