use crate::{Error, Result};
use serde_json::{Map, Value, json};

/// Layered pedigree configuration (`layout.*`, `render.*`, `assistant.*`).
///
/// Starts from [`PedigreeConfig::defaults`]; user overrides are merged on top with
/// [`PedigreeConfig::deep_merge`]. Passed by value into each call.
#[derive(Debug, Clone, PartialEq)]
pub struct PedigreeConfig(Value);

impl Default for PedigreeConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

impl PedigreeConfig {
    pub fn defaults() -> Self {
        Self(json!({
            "layout": {
                "canvasWidth": 800.0,
                "canvasHeight": 600.0,
                "symbolSize": 30.0,
                "generationSpacing": 100.0,
                "topMargin": 50.0,
                "sideMargin": 40.0,
                "bottomMargin": 20.0,
                "siblingGap": 50.0,
                "spouseGap": 30.0,
                "labelFontSize": 12.0,
                "ageFontSize": 10.0,
                "labelGap": 5.0
            },
            "render": {
                "lineWidth": 2.0,
                "background": "white",
                "borderColor": "#000000",
                "connectorColor": "#000000",
                "affectedColor": "#000000",
                "carrierColor": "#666666",
                "textColor": "#333333",
                "ageColor": "#666666",
                "fontFamily": "Arial, sans-serif",
                "jpegQuality": 90
            },
            "assistant": {
                "endpoint": "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent",
                "timeoutSecs": 30,
                "maxRetries": 1
            }
        }))
    }

    pub fn empty_object() -> Self {
        Self(Value::Object(Map::new()))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// Parses a JSON document and merges it over the defaults.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).map_err(|e| Error::InvalidConfig {
            message: e.to_string(),
        })?;
        if !value.is_object() {
            return Err(Error::InvalidConfig {
                message: "top-level config must be a JSON object".to_string(),
            });
        }
        let mut cfg = Self::defaults();
        cfg.deep_merge(&value);
        Ok(cfg)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    fn lookup(&self, dotted_path: &str) -> Option<&Value> {
        let mut cur = &self.0;
        for segment in dotted_path.split('.') {
            cur = cur.as_object()?.get(segment)?;
        }
        Some(cur)
    }

    pub fn get_str(&self, dotted_path: &str) -> Option<&str> {
        self.lookup(dotted_path)?.as_str()
    }

    pub fn get_f64(&self, dotted_path: &str) -> Option<f64> {
        self.lookup(dotted_path)?
            .as_f64()
            .filter(|v| v.is_finite())
    }

    pub fn get_u64(&self, dotted_path: &str) -> Option<u64> {
        self.lookup(dotted_path)?.as_u64()
    }

    pub fn get_bool(&self, dotted_path: &str) -> Option<bool> {
        self.lookup(dotted_path)?.as_bool()
    }

    pub fn set_value(&mut self, dotted_path: &str, value: Value) {
        if !self.0.is_object() {
            self.0 = Value::Object(Map::new());
        }

        let Value::Object(ref mut root) = self.0 else {
            return;
        };
        let mut cur: &mut Map<String, Value> = root;
        let mut segments = dotted_path.split('.').peekable();
        while let Some(seg) = segments.next() {
            if segments.peek().is_none() {
                cur.insert(seg.to_string(), value);
                return;
            }
            let slot = cur.entry(seg).or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            let Some(next) = slot.as_object_mut() else {
                return;
            };
            cur = next;
        }
    }

    pub fn deep_merge(&mut self, other: &Value) {
        deep_merge_value(&mut self.0, other);
    }
}

fn deep_merge_value(base: &mut Value, incoming: &Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(in_map)) => {
            for (key, in_value) in in_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge_value(base_value, in_value),
                    None => {
                        base_map.insert(key.clone(), in_value.clone());
                    }
                }
            }
        }
        (base_slot, in_value) => {
            *base_slot = in_value.clone();
        }
    }
}
