//! Configuration options for the NiiVue viewer.
//!
//! Options are a flat mapping from snake_case names to JSON values. Known
//! names are validated against [`OPTION_SPECS`] when set; unknown names are
//! passed through untouched so newer frontend options stay reachable. On the
//! wire every name is camelCase, with [`WIRE_NAME_OVERRIDES`] taking
//! precedence over the mechanical conversion.

use std::collections::BTreeMap;

use glam::Vec4;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::{NiivueError, Result};

/// The value contract of a known option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// RGBA color, four components in `[0, 1]`.
    Color,
    /// Boolean feature toggle.
    Toggle,
    /// Duration in milliseconds (non-negative integer).
    Millis,
    /// One of a closed set of names.
    ///
    /// With `numeric` set the frontend expects the position of the name in
    /// `values` rather than the name itself.
    Choice {
        values: &'static [&'static str],
        numeric: bool,
    },
    /// Number in `[0, 1]`.
    Fraction,
    /// Flood-fill connectivity: 6 or 26.
    Neighbors,
    /// Non-negative integer.
    Count,
    /// Any finite number.
    Number,
    /// Free text.
    Text,
}

const SLICE_TYPES: &[&str] = &["axial", "coronal", "sagittal", "multiplanar", "render"];
const MULTIPLANAR_LAYOUTS: &[&str] = &["auto", "column", "grid", "row"];
const DRAG_MODES: &[&str] = &[
    "none",
    "contrast",
    "measurement",
    "pan",
    "slicer_3d",
    "callback_only",
    "roi_selection",
];
const LOG_LEVELS: &[&str] = &["debug", "info", "warn", "error", "fatal", "silent"];

/// Options whose values are validated host-side.
pub const OPTION_SPECS: &[(&str, OptionKind)] = &[
    // Colors
    ("back_color", OptionKind::Color),
    ("crosshair_color", OptionKind::Color),
    ("font_color", OptionKind::Color),
    ("selection_box_color", OptionKind::Color),
    ("clip_plane_color", OptionKind::Color),
    ("ruler_color", OptionKind::Color),
    ("legend_background_color", OptionKind::Color),
    ("legend_text_color", OptionKind::Color),
    // Timing
    ("double_touch_timeout", OptionKind::Millis),
    ("long_touch_timeout", OptionKind::Millis),
    ("key_debounce_time", OptionKind::Millis),
    // Toggles
    ("is_ruler", OptionKind::Toggle),
    ("is_colorbar", OptionKind::Toggle),
    ("is_orient_cube", OptionKind::Toggle),
    ("is_radiological_convention", OptionKind::Toggle),
    ("is_anti_alias", OptionKind::Toggle),
    ("is_additive_blend", OptionKind::Toggle),
    ("is_nearest_interpolation", OptionKind::Toggle),
    ("is_resize_canvas", OptionKind::Toggle),
    ("is_high_resolution_capable", OptionKind::Toggle),
    ("is_filled_pen", OptionKind::Toggle),
    ("is_slice_mm", OptionKind::Toggle),
    ("is_v1_slice_shader", OptionKind::Toggle),
    ("show_legend", OptionKind::Toggle),
    ("show_3d_crosshair", OptionKind::Toggle),
    ("trust_cal_min_max", OptionKind::Toggle),
    ("drag_and_drop_enabled", OptionKind::Toggle),
    ("yoke_3d_to_2d_zoom", OptionKind::Toggle),
    // Choices
    (
        "slice_type",
        OptionKind::Choice {
            values: SLICE_TYPES,
            numeric: true,
        },
    ),
    (
        "multiplanar_layout",
        OptionKind::Choice {
            values: MULTIPLANAR_LAYOUTS,
            numeric: true,
        },
    ),
    (
        "drag_mode",
        OptionKind::Choice {
            values: DRAG_MODES,
            numeric: true,
        },
    ),
    (
        "log_level",
        OptionKind::Choice {
            values: LOG_LEVELS,
            numeric: false,
        },
    ),
    // Tuning
    ("atlas_outline", OptionKind::Fraction),
    ("mesh_xray", OptionKind::Fraction),
    ("render_overlay_blend", OptionKind::Fraction),
    ("flood_fill_neighbors", OptionKind::Neighbors),
    ("max_draw_undo_bitmaps", OptionKind::Count),
    ("multiplanar_pad_pixels", OptionKind::Count),
    ("limit_frames_4d", OptionKind::Count),
    ("pen_value", OptionKind::Number),
    ("crosshair_width", OptionKind::Number),
    ("ruler_width", OptionKind::Number),
    ("text_height", OptionKind::Number),
    ("colorbar_height", OptionKind::Number),
    ("mesh_thickness_on_2d", OptionKind::Number),
    ("loading_text", OptionKind::Text),
];

/// Wire names that do not follow the mechanical snake → camel conversion.
pub const WIRE_NAME_OVERRIDES: &[(&str, &str)] = &[
    ("show_3d_crosshair", "show3Dcrosshair"),
    ("mesh_thickness_on_2d", "meshThicknessOn2D"),
    ("yoke_3d_to_2d_zoom", "yoke3Dto2DZoom"),
    ("is_slice_mm", "isSliceMM"),
    ("limit_frames_4d", "limitFrames4D"),
    ("mesh_xray", "meshXRay"),
];

/// Returns the contract of a known option.
#[must_use]
pub fn option_kind(name: &str) -> Option<OptionKind> {
    OPTION_SPECS
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, kind)| *kind)
}

/// Converts `snake_case` to `camelCase`.
#[must_use]
pub fn snake_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, part) in name.split('_').filter(|p| !p.is_empty()).enumerate() {
        if i == 0 {
            out.push_str(part);
            continue;
        }
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Converts `camelCase` to `snake_case`.
#[must_use]
pub fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            if !out.is_empty() {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Returns the wire (camelCase) name of a host-side option name.
#[must_use]
pub fn wire_name(name: &str) -> String {
    WIRE_NAME_OVERRIDES
        .iter()
        .find(|(host, _)| *host == name)
        .map_or_else(|| snake_to_camel(name), |(_, wire)| (*wire).to_string())
}

/// Returns the host-side (snake_case) name of a wire option name.
#[must_use]
pub fn host_name(wire: &str) -> String {
    WIRE_NAME_OVERRIDES
        .iter()
        .find(|(_, w)| *w == wire)
        .map_or_else(|| camel_to_snake(wire), |(host, _)| (*host).to_string())
}

/// Validates an RGBA color given as a component slice.
///
/// Components keep the precision they were given; [`Vec4`] is only the
/// read-side view.
pub fn parse_color(option: &str, components: &[f64]) -> Result<[f64; 4]> {
    let rgba: [f64; 4] = components
        .try_into()
        .map_err(|_| NiivueError::ColorLength {
            option: option.to_string(),
            actual: components.len(),
        })?;
    for (index, &value) in rgba.iter().enumerate() {
        if !(0.0..=1.0).contains(&value) {
            return Err(NiivueError::ColorComponent {
                option: option.to_string(),
                index,
                value,
            });
        }
    }
    Ok(rgba)
}

fn color_to_value(rgba: [f64; 4]) -> Value {
    Value::Array(
        rgba.iter()
            .map(|&c| Number::from_f64(c).map_or(Value::Null, Value::Number))
            .collect(),
    )
}

fn invalid(option: &str, reason: impl Into<String>) -> NiivueError {
    NiivueError::InvalidOption {
        option: option.to_string(),
        reason: reason.into(),
    }
}

/// Validates `value` for option `name` and returns its wire form.
pub fn normalize(name: &str, value: Value) -> Result<Value> {
    let Some(kind) = option_kind(name) else {
        log::warn!("option '{name}' is not known host-side; passing it through unvalidated");
        return Ok(value);
    };

    match kind {
        OptionKind::Color => {
            let items = value
                .as_array()
                .ok_or_else(|| invalid(name, "expected a list of 4 numbers"))?;
            let components = items
                .iter()
                .map(Value::as_f64)
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| invalid(name, "color components must be numbers"))?;
            parse_color(name, &components).map(color_to_value)
        }
        OptionKind::Toggle => match value {
            Value::Bool(_) => Ok(value),
            _ => Err(invalid(name, "expected a boolean")),
        },
        OptionKind::Millis | OptionKind::Count => match value.as_u64() {
            Some(_) => Ok(value),
            None => Err(invalid(name, "expected a non-negative integer")),
        },
        OptionKind::Choice { values, numeric } => {
            let position = match &value {
                Value::String(s) => values.iter().position(|v| v == s),
                Value::Number(n) => n
                    .as_u64()
                    .and_then(|i| usize::try_from(i).ok())
                    .filter(|&i| i < values.len()),
                _ => None,
            }
            .ok_or_else(|| invalid(name, format!("expected one of {values:?}")))?;
            Ok(if numeric {
                Value::from(position)
            } else {
                Value::from(values[position])
            })
        }
        OptionKind::Fraction => match value.as_f64() {
            Some(v) if (0.0..=1.0).contains(&v) => Ok(value),
            _ => Err(invalid(name, "expected a number within [0, 1]")),
        },
        OptionKind::Neighbors => match value.as_u64() {
            Some(6 | 26) => Ok(value),
            _ => Err(invalid(name, "expected 6 or 26")),
        },
        OptionKind::Number => match value.as_f64() {
            Some(v) if v.is_finite() => Ok(value),
            _ => Err(invalid(name, "expected a finite number")),
        },
        OptionKind::Text => match value {
            Value::String(_) => Ok(value),
            _ => Err(invalid(name, "expected a string")),
        },
    }
}

/// Viewer options keyed by snake_case name, stored in wire form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options {
    values: BTreeMap<String, Value>,
}

impl Options {
    /// Creates an empty option set (frontend defaults apply).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an option set from `(name, value)` pairs, validating each.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut options = Self::new();
        for (name, value) in pairs {
            options.set(name, value)?;
        }
        Ok(options)
    }

    /// Sets an option after validating it. Nothing changes on error.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let name = name.into();
        let value = normalize(&name, value.into())?;
        self.values.insert(name, value);
        Ok(())
    }

    /// Sets an RGBA color option from its components.
    pub fn set_color(&mut self, name: impl Into<String>, components: &[f64]) -> Result<()> {
        let name = name.into();
        let color = parse_color(&name, components)?;
        self.values.insert(name, color_to_value(color));
        Ok(())
    }

    /// Gets an option value in wire form.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Gets an RGBA color option as single-precision components.
    #[must_use]
    pub fn color(&self, name: &str) -> Option<Vec4> {
        #[allow(clippy::cast_possible_truncation)]
        let components = self
            .values
            .get(name)?
            .as_array()?
            .iter()
            .map(|c| c.as_f64().map(|c| c as f32))
            .collect::<Option<Vec<_>>>()?;
        (components.len() == 4).then(|| Vec4::from_slice(&components))
    }

    /// Removes an option, restoring the frontend default.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    /// Returns the number of explicitly set options.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no option is explicitly set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the wire mapping with camelCase names.
    #[must_use]
    pub fn to_wire(&self) -> Map<String, Value> {
        self.values
            .iter()
            .map(|(name, value)| (wire_name(name), value.clone()))
            .collect()
    }

    /// Replaces all options with a mapping received from the frontend.
    ///
    /// Remote values are trusted and stored as received.
    pub fn replace_from_wire(&mut self, wire: &Map<String, Value>) {
        self.values = wire
            .iter()
            .map(|(name, value)| (host_name(name), value.clone()))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snake_to_camel() {
        assert_eq!(snake_to_camel("back_color"), "backColor");
        assert_eq!(snake_to_camel("is_v1_slice_shader"), "isV1SliceShader");
        assert_eq!(snake_to_camel("height"), "height");
    }

    #[test]
    fn test_camel_to_snake() {
        assert_eq!(camel_to_snake("backColor"), "back_color");
        assert_eq!(camel_to_snake("isV1SliceShader"), "is_v1_slice_shader");
    }

    #[test]
    fn test_overrides_take_precedence() {
        assert_eq!(snake_to_camel("show_3d_crosshair"), "show3dCrosshair");
        assert_eq!(wire_name("show_3d_crosshair"), "show3Dcrosshair");
        assert_eq!(host_name("show3Dcrosshair"), "show_3d_crosshair");
        assert_eq!(wire_name("mesh_xray"), "meshXRay");
        assert_eq!(host_name("meshXRay"), "mesh_xray");
    }

    #[test]
    fn test_color_validation() {
        assert!(parse_color("crosshair_color", &[1.0, 0.0, 0.0, 1.0]).is_ok());
        assert!(matches!(
            parse_color("crosshair_color", &[1.0, 0.0, 0.0]),
            Err(NiivueError::ColorLength { actual: 3, .. })
        ));
        assert!(matches!(
            parse_color("crosshair_color", &[1.0, 2.0, 0.0, 1.0]),
            Err(NiivueError::ColorComponent { index: 1, .. })
        ));
        assert!(matches!(
            parse_color("crosshair_color", &[1.0, 0.0, -0.1, 1.0]),
            Err(NiivueError::ColorComponent { index: 2, .. })
        ));
    }

    #[test]
    fn test_set_known_options() {
        let mut options = Options::new();
        options.set("is_colorbar", true).unwrap();
        options.set("flood_fill_neighbors", 26).unwrap();
        options.set("mesh_xray", 0.3).unwrap();
        options.set("double_touch_timeout", 500).unwrap();
        options.set("back_color", json!([0, 0, 0, 1])).unwrap();
        assert_eq!(options.len(), 5);
        assert_eq!(options.color("back_color"), Some(Vec4::new(0.0, 0.0, 0.0, 1.0)));
    }

    #[test]
    fn test_color_components_keep_their_precision() {
        let mut options = Options::new();
        options.set_color("crosshair_color", &[0.1, 0.2, 0.3, 1.0]).unwrap();
        options.set("font_color", json!([0.7, 0.6, 0.5, 0.4])).unwrap();
        assert_eq!(options.get("crosshair_color"), Some(&json!([0.1, 0.2, 0.3, 1.0])));
        assert_eq!(options.get("font_color"), Some(&json!([0.7, 0.6, 0.5, 0.4])));
        assert_eq!(options.color("crosshair_color"), Some(Vec4::new(0.1, 0.2, 0.3, 1.0)));
    }

    #[test]
    fn test_invalid_values_leave_options_unchanged() {
        let mut options = Options::new();
        assert!(options.set("flood_fill_neighbors", 8).is_err());
        assert!(options.set("mesh_xray", 1.5).is_err());
        assert!(options.set("is_colorbar", "yes").is_err());
        assert!(options.set("key_debounce_time", -5).is_err());
        assert!(options.set("back_color", json!([0, 0, 0])).is_err());
        assert!(options.is_empty());
    }

    #[test]
    fn test_choices() {
        let mut options = Options::new();
        options.set("slice_type", "multiplanar").unwrap();
        options.set("log_level", "warn").unwrap();
        options.set("drag_mode", 3).unwrap();
        assert_eq!(options.get("slice_type"), Some(&json!(3)));
        assert_eq!(options.get("log_level"), Some(&json!("warn")));
        assert_eq!(options.get("drag_mode"), Some(&json!(3)));
        assert!(options.set("multiplanar_layout", "diagonal").is_err());
        assert!(options.set("drag_mode", 42).is_err());
    }

    #[test]
    fn test_unknown_option_passes_through() {
        let mut options = Options::new();
        options.set("some_future_flag", json!({"a": 1})).unwrap();
        assert_eq!(options.to_wire()["someFutureFlag"], json!({"a": 1}));
    }

    #[test]
    fn test_wire_round_trip() {
        let options =
            Options::from_pairs([("show_3d_crosshair", json!(true)), ("pen_value", json!(2))])
                .unwrap();
        let wire = options.to_wire();
        assert_eq!(wire["show3Dcrosshair"], json!(true));
        assert_eq!(wire["penValue"], json!(2));

        let mut restored = Options::new();
        restored.replace_from_wire(&wire);
        assert_eq!(restored, options);
    }

    proptest::proptest! {
        #[test]
        fn prop_color_components_must_be_unit_range(
            components in proptest::collection::vec(-0.5f64..1.5, 4)
        ) {
            let in_range = components.iter().all(|c| (0.0..=1.0).contains(c));
            proptest::prop_assert_eq!(parse_color("font_color", &components).is_ok(), in_range);
        }
    }
}
