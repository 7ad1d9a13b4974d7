//! Seed schemas for the sample topic catalogue (spec §12).

use super::Schema;

fn suggestion_schema() -> Schema {
    Schema::Object {
        fields: vec![
            ("text".to_string(), Schema::String { min_len: Some(1), max_len: Some(280) }, false),
            ("reasoning".to_string(), Schema::String { min_len: Some(1), max_len: Some(1000) }, false),
        ],
    }
}

pub fn niche_review_result() -> Schema {
    Schema::Object {
        fields: vec![(
            "suggestions".to_string(),
            Schema::Array {
                items: Box::new(suggestion_schema()),
                min_len: Some(3),
                max_len: Some(3),
            },
            false,
        )],
    }
}

pub fn alignment_check_result() -> Schema {
    Schema::Object {
        fields: vec![
            ("aligned".to_string(), Schema::Boolean, false),
            ("score".to_string(), Schema::Integer { min: Some(0), max: Some(100) }, false),
            ("explanation".to_string(), Schema::String { min_len: Some(1), max_len: Some(2000) }, false),
        ],
    }
}

fn coaching_result_fields(extra: Vec<(String, Schema, bool)>) -> Schema {
    let mut fields = vec![
        ("summary".to_string(), Schema::String { min_len: Some(1), max_len: Some(4000) }, false),
        ("is_final".to_string(), Schema::Boolean, false),
    ];
    fields.extend(extra);
    Schema::Object { fields }
}

pub fn core_values_result() -> Schema {
    coaching_result_fields(vec![(
        "values".to_string(),
        Schema::Array {
            items: Box::new(Schema::String { min_len: Some(1), max_len: Some(80) }),
            min_len: Some(1),
            max_len: Some(10),
        },
        false,
    )])
}

pub fn purpose_result() -> Schema {
    coaching_result_fields(vec![(
        "purpose_statement".to_string(),
        Schema::String { min_len: Some(1), max_len: Some(500) },
        false,
    )])
}

pub fn vision_result() -> Schema {
    coaching_result_fields(vec![
        (
            "vision_statement".to_string(),
            Schema::String { min_len: Some(1), max_len: Some(500) },
            false,
        ),
        (
            "horizon_years".to_string(),
            Schema::Integer { min: Some(1), max: Some(30) },
            false,
        ),
    ])
}
