use std::sync::LazyLock;

/// Fixed instruction sent with every manifest screenshot.
pub const EXTRACTION_PROMPT: &str = r#"
You are reading a screenshot of a delivery-route manifest. Your ONLY role is to
transcribe the delivery stops that are visible in the image.

RULES:
1. Produce one entry per stop, in the order they appear.
2. stopNumber is the stop's position label exactly as printed (e.g. "12", "3A").
3. address is the street address exactly as printed, including the number.
4. cep is the postal code exactly as printed; use "" if none is visible.
5. city is the city name; use "" if none is visible.
6. NEVER invent stops, addresses, or postal codes that are not in the image.

OUTPUT FORMAT:
A single JSON object: {"stops": [{"stopNumber": "", "address": "", "cep": "", "city": ""}]}
"#;

/// Fields every stop item must carry, in schema order.
pub const STOP_FIELDS: [&str; 4] = ["stopNumber", "address", "cep", "city"];

/// Response schema `{ stops: [{ stopNumber, address, cep, city }] }`,
/// all four item fields required.
pub static STOPS_RESPONSE_SCHEMA: LazyLock<serde_json::Value> = LazyLock::new(|| {
    let properties: serde_json::Map<String, serde_json::Value> = STOP_FIELDS
        .iter()
        .map(|field| (field.to_string(), serde_json::json!({"type": "STRING"})))
        .collect();

    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "stops": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": properties,
                    "required": STOP_FIELDS,
                }
            }
        },
        "required": ["stops"],
    })
});
