//! OCR instructions and structured-output schema.

use serde_json::{json, Value};

/// Instructions sent alongside every inspection image.
pub const OCR_PROMPT: &str = "\
Extract data from this technical table image.
The image contains a table with columns: date, address, length, +r, r-, bow, \u{394} bow, \u{394} length, go-no go, and an empty notes/extra column.
Also, find the \"Pin Number\" or \"Element Number\" which identifies the specific fuel element.

Rules:
1. Identify the Pin Number/Element Number.
2. Extract every row from the table accurately.
3. If a value is missing or unreadable, use an empty string.
4. \"\u{394}\" is represented as delta in the schema.
5. In the 'outliers' field, note any visual defects, stains, or weird markings mentioned in the notes column or seen on the page.
";

/// Row fields, in table column order.
pub const ROW_FIELDS: [&str; 10] = [
    "date",
    "address",
    "length",
    "plus_r",
    "minus_r",
    "bow",
    "delta_bow",
    "delta_length",
    "go_no_go",
    "notes",
];

/// Response schema constraining the model to `ExtractionOutput`'s shape.
pub fn response_schema() -> Value {
    let mut row_properties = serde_json::Map::new();
    for field in ROW_FIELDS {
        let property = match field {
            "plus_r" => json!({"type": "STRING", "description": "The +r value"}),
            "minus_r" => json!({"type": "STRING", "description": "The r- value"}),
            "notes" => json!({
                "type": "STRING",
                "description": "Notes from the extra column in the table"
            }),
            _ => json!({"type": "STRING"}),
        };
        row_properties.insert(field.to_string(), property);
    }

    json!({
        "type": "OBJECT",
        "properties": {
            "elementNumber": {
                "type": "STRING",
                "description": "The Pin Number or Element Number found on the document."
            },
            "rows": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": row_properties,
                    "required": ROW_FIELDS,
                }
            },
            "outliers": {
                "type": "STRING",
                "description": "Summary of any outliers or unusual data points detected."
            }
        },
        "required": ["elementNumber", "rows", "outliers"]
    })
}
