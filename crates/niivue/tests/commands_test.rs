//! Command tests: local validation and the exact outbound frames.

use std::rc::Rc;

use serde_json::json;

use niivue::*;

fn viewer() -> (NiiVue, Rc<MessageLog>) {
    let log = Rc::new(MessageLog::new());
    let nv = NiiVue::new(log.clone());
    log.take();
    (nv, log)
}

#[test]
fn test_add_colormap_length_mismatch_sends_nothing() {
    let (nv, log) = viewer();
    let err = nv
        .add_colormap(
            "x",
            &json!({"R": [1, 2], "G": [1], "B": [1, 2], "A": [1, 2], "I": [1, 2]}),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        NiivueError::ColormapLengthMismatch {
            key: "G",
            expected: 2,
            actual: 1
        }
    ));
    assert!(log.is_empty());
}

#[test]
fn test_add_colormap_sends_exact_contents() {
    let (nv, log) = viewer();
    nv.add_colormap(
        "my_cmap",
        &json!({
            "R": [0, 255],
            "G": [0, 128],
            "B": [0, 64],
            "A": [0, 255],
            "I": [0, 255],
        }),
    )
    .unwrap();

    let frames = log.take();
    assert_eq!(frames.len(), 1);
    let wire = serde_json::to_value(&frames[0]).unwrap();
    assert_eq!(wire["method"], json!("custom"));
    assert_eq!(wire["model"], json!(nv.model_id()));
    assert_eq!(
        wire["content"],
        json!({
            "type": "add_colormap",
            "data": {
                "name": "my_cmap",
                "cmap": {
                    "R": [0.0, 255.0],
                    "G": [0.0, 128.0],
                    "B": [0.0, 64.0],
                    "A": [0.0, 255.0],
                    "I": [0.0, 255.0],
                },
            },
        })
    );
}

#[test]
fn test_add_colormap_distinct_errors() {
    let (nv, log) = viewer();
    let base = || json!({"R": [0, 1], "G": [0, 1], "B": [0, 1], "A": [0, 1], "I": [0, 1]});

    let mut missing = base();
    missing.as_object_mut().unwrap().remove("A");
    assert!(matches!(
        nv.add_colormap("c", &missing),
        Err(NiivueError::MissingColormapKey("A"))
    ));

    let mut not_numeric = base();
    not_numeric["B"] = json!([0, "one"]);
    assert!(matches!(
        nv.add_colormap("c", &not_numeric),
        Err(NiivueError::ColormapNotNumeric {
            key: "B",
            index: Some(1)
        })
    ));

    let mut bad_min = base();
    bad_min["min"] = json!("low");
    assert!(matches!(
        nv.add_colormap("c", &bad_min),
        Err(NiivueError::ColormapBoundNotNumeric("min"))
    ));

    let mut short_labels = base();
    short_labels["labels"] = json!(["only one"]);
    assert!(matches!(
        nv.add_colormap("c", &short_labels),
        Err(NiivueError::ColormapLabelsLength {
            expected: 2,
            actual: 1
        })
    ));

    let mut bad_label = base();
    bad_label["labels"] = json!(["a", 2]);
    assert!(matches!(
        nv.add_colormap("c", &bad_label),
        Err(NiivueError::ColormapLabelNotString(Some(1)))
    ));

    assert!(matches!(
        nv.add_colormap("c", &json!([1, 2, 3])),
        Err(NiivueError::ColormapNotObject)
    ));
    assert!(log.is_empty());
}

#[test]
fn test_add_colormap_with_labels_and_range() {
    let (nv, log) = viewer();
    let cmap = json!({
        "R": [0, 255], "G": [0, 0], "B": [0, 0], "A": [0, 64], "I": [0, 255],
        "min": 0, "max": 10, "labels": ["background", "lesion"],
    });
    nv.add_colormap("lesions", &cmap).unwrap();

    let commands = log.commands();
    let [Command::AddColormap { name, cmap }] = commands.as_slice() else {
        panic!("expected one add_colormap command");
    };
    assert_eq!(name, "lesions");
    assert_eq!(cmap.len(), 2);
    assert_eq!(cmap.max, Some(10.0));
    assert_eq!(
        cmap.labels.as_deref(),
        Some(&["background".to_string(), "lesion".to_string()][..])
    );
}

#[test]
fn test_color_setters_validate_before_sending() {
    let (nv, log) = viewer();

    assert!(matches!(
        nv.set_crosshair_color(&[1.0, 0.0, 0.0]),
        Err(NiivueError::ColorLength { actual: 3, .. })
    ));
    assert!(matches!(
        nv.set_selection_box_color(&[1.0, 0.0, 1.5, 1.0]),
        Err(NiivueError::ColorComponent { index: 2, .. })
    ));
    assert!(log.is_empty());
    assert_eq!(nv.crosshair_color(), None);

    nv.set_crosshair_color(&[0.0, 1.0, 0.0, 0.5]).unwrap();
    assert_eq!(nv.crosshair_color(), Some(Vec4::new(0.0, 1.0, 0.0, 0.5)));

    let frames = log.take();
    assert_eq!(frames.len(), 1);
    let OutboundMessage::Update { state, .. } = &frames[0] else {
        panic!("expected an options update");
    };
    assert_eq!(state["_opts"]["crosshairColor"], json!([0.0, 1.0, 0.0, 0.5]));
}

#[test]
fn test_color_setter_sends_components_as_given() {
    let (nv, log) = viewer();
    nv.set_crosshair_color(&[0.1, 0.2, 0.3, 1.0]).unwrap();

    let frames = log.take();
    let OutboundMessage::Update { state, .. } = &frames[0] else {
        panic!("expected an options update");
    };
    assert_eq!(state["_opts"]["crosshairColor"], json!([0.1, 0.2, 0.3, 1.0]));
    assert_eq!(nv.option("crosshair_color"), Some(json!([0.1, 0.2, 0.3, 1.0])));
}

#[test]
fn test_set_gamma() {
    let (nv, log) = viewer();
    assert!(nv.set_gamma(f64::INFINITY).is_err());
    nv.set_gamma(0.8).unwrap();
    assert_eq!(log.commands(), vec![Command::SetGamma(0.8)]);
}

#[test]
fn test_colormap_catalog() {
    let (nv, _) = viewer();
    let names = nv.colormaps();
    assert!(names.contains(&"gray"));
    assert!(names.contains(&"hot"));
    assert!(names.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(names, colormaps());
}
