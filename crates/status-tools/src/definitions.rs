//! Tool definitions advertised to the model.

use nudge_core::{ParameterSchema, PropertySchema, ToolDefinition};
use serde_json::json;

/// Name of the status getter.
pub const GET_STATUS: &str = "get_status";

/// Name of the status setter.
pub const SET_STATUS: &str = "set_status";

/// The `get_status` definition. Takes no parameters.
pub fn get_status_definition() -> ToolDefinition {
    ToolDefinition::new(
        GET_STATUS,
        "Get the current blocking status. Returns blocked = 1 when distracting apps \
         are blocked and 0 when they are not.",
        ParameterSchema::object(),
    )
}

/// The `set_status` definition. One integer parameter restricted to 0 or 1.
pub fn set_status_definition() -> ToolDefinition {
    ToolDefinition::new(
        SET_STATUS,
        "Set the blocking status. Use blocked = 1 to block distracting apps and \
         blocked = 0 to unblock them. Only call this when the user asks to change it.",
        ParameterSchema::object().property(
            "blocked",
            PropertySchema::integer("1 to block, 0 to unblock")
                .with_enum(vec![json!(0), json!(1)]),
            true,
        ),
    )
}

/// Both definitions, getter first.
pub fn status_definitions() -> Vec<ToolDefinition> {
    vec![get_status_definition(), set_status_definition()]
}
