//! Colormap catalog and custom colormap specifications.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{NiivueError, Result};

/// Names of the colormaps built into the NiiVue frontend.
///
/// The catalog is informational: volumes and layers accept any colormap
/// name, and names added with `add_colormap` are not listed here.
pub const BUILTIN_COLORMAPS: &[&str] = &[
    "actc",
    "bcgwhw",
    "bcgwhw_dark",
    "blue",
    "blue2cyan",
    "blue2magenta",
    "blue2red",
    "bluegrn",
    "bone",
    "bronze",
    "cet_l17",
    "cividis",
    "cool",
    "copper",
    "copper2",
    "ct_airways",
    "ct_artery",
    "ct_bones",
    "ct_brain",
    "ct_brain_gray",
    "ct_cortex",
    "ct_denoised",
    "ct_kidneys",
    "ct_liver",
    "ct_muscles",
    "ct_scalp",
    "ct_skull",
    "ct_soft",
    "ct_soft_tissue",
    "ct_surface",
    "ct_veins",
    "ct_w_contrast",
    "cubehelix",
    "electric_blue",
    "freesurfer",
    "ge_color",
    "gold",
    "gray",
    "green",
    "green2cyan",
    "green2orange",
    "hot",
    "hotiron",
    "hsv",
    "inferno",
    "jet",
    "linspecer",
    "magma",
    "mako",
    "nih",
    "plasma",
    "random",
    "red",
    "redyell",
    "rocket",
    "roi_i256",
    "surface",
    "turbo",
    "violet",
    "viridis",
    "warm",
    "winter",
    "x_rain",
];

/// Returns the names of all built-in colormaps.
#[must_use]
pub fn colormaps() -> &'static [&'static str] {
    BUILTIN_COLORMAPS
}

/// Returns whether `name` is a built-in colormap.
#[must_use]
pub fn is_builtin(name: &str) -> bool {
    BUILTIN_COLORMAPS.contains(&name)
}

const CHANNELS: [&str; 5] = ["R", "G", "B", "A", "I"];

/// A custom colormap: parallel channel lists plus optional range and labels.
///
/// `i` holds the intensity index (0–255) of each control point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColormapSpec {
    #[serde(rename = "R")]
    pub r: Vec<f64>,
    #[serde(rename = "G")]
    pub g: Vec<f64>,
    #[serde(rename = "B")]
    pub b: Vec<f64>,
    #[serde(rename = "A")]
    pub a: Vec<f64>,
    #[serde(rename = "I")]
    pub i: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
}

impl ColormapSpec {
    /// Parses and validates an untyped colormap mapping.
    ///
    /// Each violated constraint yields its own error: a missing channel, a
    /// non-numeric channel element, a channel whose length differs from `R`,
    /// a non-numeric `min`/`max`, or `labels` that are not strings or do not
    /// match the channel length.
    pub fn from_value(value: &Value) -> Result<Self> {
        let map = value.as_object().ok_or(NiivueError::ColormapNotObject)?;

        let mut channels: Vec<Vec<f64>> = Vec::with_capacity(CHANNELS.len());
        for key in CHANNELS {
            channels.push(numeric_list(map, key)?);
        }
        let expected = channels[0].len();
        for (key, channel) in CHANNELS.into_iter().zip(&channels).skip(1) {
            if channel.len() != expected {
                return Err(NiivueError::ColormapLengthMismatch {
                    key,
                    expected,
                    actual: channel.len(),
                });
            }
        }

        let min = optional_number(map, "min")?;
        let max = optional_number(map, "max")?;
        let labels = match map.get("labels") {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => {
                let labels = items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| {
                        item.as_str()
                            .map(str::to_owned)
                            .ok_or(NiivueError::ColormapLabelNotString(Some(index)))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Some(labels)
            }
            Some(_) => return Err(NiivueError::ColormapLabelNotString(None)),
        };

        let mut channels = channels.into_iter();
        let mut next = || channels.next().unwrap_or_default();
        let spec = Self {
            r: next(),
            g: next(),
            b: next(),
            a: next(),
            i: next(),
            min,
            max,
            labels,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Checks the length and value constraints of a typed specification.
    pub fn validate(&self) -> Result<()> {
        let expected = self.r.len();
        for (key, channel) in [("G", &self.g), ("B", &self.b), ("A", &self.a), ("I", &self.i)] {
            if channel.len() != expected {
                return Err(NiivueError::ColormapLengthMismatch {
                    key,
                    expected,
                    actual: channel.len(),
                });
            }
        }
        for (key, channel) in CHANNELS.into_iter().zip(self.channels()) {
            if let Some(index) = channel.iter().position(|v| !v.is_finite()) {
                return Err(NiivueError::ColormapNotNumeric {
                    key,
                    index: Some(index),
                });
            }
        }
        if self.min.is_some_and(|v| !v.is_finite()) {
            return Err(NiivueError::ColormapBoundNotNumeric("min"));
        }
        if self.max.is_some_and(|v| !v.is_finite()) {
            return Err(NiivueError::ColormapBoundNotNumeric("max"));
        }
        if let Some(labels) = &self.labels {
            if labels.len() != expected {
                return Err(NiivueError::ColormapLabelsLength {
                    expected,
                    actual: labels.len(),
                });
            }
        }
        Ok(())
    }

    /// Returns the number of control points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.r.len()
    }

    /// Returns true if the colormap has no control points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.r.is_empty()
    }

    fn channels(&self) -> [&Vec<f64>; 5] {
        [&self.r, &self.g, &self.b, &self.a, &self.i]
    }
}

fn numeric_list(map: &Map<String, Value>, key: &'static str) -> Result<Vec<f64>> {
    let items = map
        .get(key)
        .ok_or(NiivueError::MissingColormapKey(key))?
        .as_array()
        .ok_or(NiivueError::ColormapNotNumeric { key, index: None })?;
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            item.as_f64().ok_or(NiivueError::ColormapNotNumeric {
                key,
                index: Some(index),
            })
        })
        .collect()
}

fn optional_number(map: &Map<String, Value>, key: &'static str) -> Result<Option<f64>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or(NiivueError::ColormapBoundNotNumeric(key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> Value {
        json!({
            "R": [0, 255],
            "G": [0, 128],
            "B": [0, 0],
            "A": [0, 64],
            "I": [0, 255],
        })
    }

    #[test]
    fn test_catalog_contains_defaults() {
        assert!(is_builtin("gray"));
        assert!(is_builtin("viridis"));
        assert!(!is_builtin("not-a-colormap"));
        assert!(colormaps().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_valid_spec() {
        let spec = ColormapSpec::from_value(&valid()).unwrap();
        assert_eq!(spec.len(), 2);
        assert_eq!(spec.g, vec![0.0, 128.0]);
        assert!(spec.labels.is_none());
    }

    #[test]
    fn test_missing_key() {
        let mut value = valid();
        value.as_object_mut().unwrap().remove("A");
        assert!(matches!(
            ColormapSpec::from_value(&value),
            Err(NiivueError::MissingColormapKey("A"))
        ));
    }

    #[test]
    fn test_length_mismatch() {
        let value = json!({"R": [1, 2], "G": [1], "B": [1, 2], "A": [1, 2], "I": [1, 2]});
        assert!(matches!(
            ColormapSpec::from_value(&value),
            Err(NiivueError::ColormapLengthMismatch {
                key: "G",
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_non_numeric_element() {
        let mut value = valid();
        value["B"] = json!([0, "zero"]);
        assert!(matches!(
            ColormapSpec::from_value(&value),
            Err(NiivueError::ColormapNotNumeric {
                key: "B",
                index: Some(1)
            })
        ));

        value["B"] = json!("0,0");
        assert!(matches!(
            ColormapSpec::from_value(&value),
            Err(NiivueError::ColormapNotNumeric {
                key: "B",
                index: None
            })
        ));
    }

    #[test]
    fn test_bounds_must_be_numeric() {
        let mut value = valid();
        value["min"] = json!(0);
        value["max"] = json!("high");
        assert!(matches!(
            ColormapSpec::from_value(&value),
            Err(NiivueError::ColormapBoundNotNumeric("max"))
        ));
    }

    #[test]
    fn test_labels() {
        let mut value = valid();
        value["labels"] = json!(["background", "lesion"]);
        let spec = ColormapSpec::from_value(&value).unwrap();
        assert_eq!(spec.labels.as_deref().map(<[String]>::len), Some(2));

        value["labels"] = json!(["background"]);
        assert!(matches!(
            ColormapSpec::from_value(&value),
            Err(NiivueError::ColormapLabelsLength {
                expected: 2,
                actual: 1
            })
        ));

        value["labels"] = json!(["background", 3]);
        assert!(matches!(
            ColormapSpec::from_value(&value),
            Err(NiivueError::ColormapLabelNotString(Some(1)))
        ));
    }

    #[test]
    fn test_not_a_mapping() {
        assert!(matches!(
            ColormapSpec::from_value(&json!([1, 2, 3])),
            Err(NiivueError::ColormapNotObject)
        ));
    }

    #[test]
    fn test_wire_keys_are_uppercase() {
        let spec = ColormapSpec::from_value(&valid()).unwrap();
        let wire = serde_json::to_value(&spec).unwrap();
        assert_eq!(wire["R"], json!([0.0, 255.0]));
        assert!(wire.get("min").is_none());
        assert!(wire.get("labels").is_none());
    }
}
