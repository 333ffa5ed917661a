//! Demo documents shipped with the CLI

use serde_json::{json, Value};

/// Title/content documents used by `isearch seed`.
pub fn health_articles() -> Vec<Value> {
    vec![
        json!({
            "title": "Benefits of Exercise",
            "content": "Regular exercise improves cardiovascular health, strengthens muscles, and boosts mental well-being. \
                Along with diet, exercise plays an important role in maintaining a healthy weight and preventing obesity. \
                To lose weight, you need to use more calories than you eat and drink. \
                Exercise can lower your blood glucose levels and help your insulin work better, \
                which reduces your risk of metabolic syndrome and type 2 diabetes."
        }),
        json!({
            "title": "Healthy Eating Habits",
            "content": "A balanced diet rich in fruits, vegetables, and whole grains provides essential nutrients for optimal health."
        }),
        json!({
            "title": "Importance of Sleep",
            "content": "Adequate sleep is crucial for physical recovery, cognitive function, and overall health maintenance."
        }),
    ]
}

/// Small dense-vector documents used by `isearch bulk` when no file is given.
pub fn vector_samples() -> Vec<Value> {
    vec![
        json!({ "text": "Example text 1", "vector": [5.479, 9.789, 2.606] }),
        json!({ "text": "Example text 2", "vector": [7.475, 9.63, 8.804] }),
        json!({ "text": "Example text 3", "vector": [5.535, 6.532, 6.407] }),
    ]
}
