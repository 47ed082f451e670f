use super::*;
use serde_json::json;

fn layer(id: u32) -> TextLayer {
    TextLayer::with_defaults(LayerId(id), &LayerDefaults::default())
}

#[test]
fn add_to_empty_stack_yields_id_1_with_defaults() {
    let mut stack = LayerStack::new();
    let id = stack.add_layer(&LayerDefaults::default());
    assert_eq!(id, LayerId(1));

    let l = stack.get(id).unwrap();
    assert_eq!(l.text, "edit");
    assert_eq!(l.font_family, "Inter");
    assert_eq!(l.font_weight, 800);
    assert_eq!(l.font_size, 200.0);
    assert_eq!(l.color, Color::WHITE);
    assert_eq!(l.opacity, 1.0);
    assert_eq!(l.shadow_color, Color::rgba(0, 0, 0, 204));
    assert_eq!(l.shadow_size, 4.0);
    assert_eq!((l.left, l.top, l.rotation), (0.0, 0.0, 0.0));
}

#[test]
fn add_after_existing_max_yields_next_id() {
    let mut stack = LayerStack::from_layers(vec![layer(3)]).unwrap();
    assert_eq!(stack.add_layer(&LayerDefaults::default()), LayerId(4));
}

#[test]
fn duplicate_takes_id_above_current_max() {
    let mut stack = LayerStack::from_layers(vec![layer(3), layer(7)]).unwrap();
    stack
        .update_attribute(LayerId(3), LayerAttr::Text("hello".into()))
        .unwrap();

    let new_id = stack.duplicate_layer(LayerId(3)).unwrap();
    assert_eq!(new_id, LayerId(8));

    let copy = stack.get(new_id).unwrap();
    let original = stack.get(LayerId(3)).unwrap();
    assert_eq!(copy.text, "hello");
    assert_eq!(
        TextLayer {
            id: original.id,
            ..copy.clone()
        },
        *original
    );
    assert_eq!(stack.layers().last().unwrap().id, new_id);
}

#[test]
fn ids_freed_by_removal_are_not_reused() {
    let mut stack = LayerStack::new();
    let d = LayerDefaults::default();
    stack.add_layer(&d);
    let second = stack.add_layer(&d);
    stack.remove_layer(second).unwrap();
    assert_eq!(stack.add_layer(&d), LayerId(3));
}

#[test]
fn removing_the_highest_id_does_not_free_it() {
    let mut stack = LayerStack::from_layers(vec![layer(1), layer(2), layer(3)]).unwrap();
    stack.remove_layer(LayerId(3)).unwrap();
    assert_eq!(stack.add_layer(&LayerDefaults::default()), LayerId(4));
}

#[test]
fn update_attribute_touches_only_target_field_and_layer() {
    let mut stack = LayerStack::from_layers(vec![layer(1), layer(2)]).unwrap();
    let before = stack.clone();

    stack
        .update_attribute(LayerId(2), LayerAttr::FontSize(64.0))
        .unwrap();

    assert_eq!(stack.get(LayerId(1)), before.get(LayerId(1)));
    let updated = stack.get(LayerId(2)).unwrap();
    assert_eq!(updated.font_size, 64.0);
    assert_eq!(
        TextLayer {
            font_size: 200.0,
            ..updated.clone()
        },
        *before.get(LayerId(2)).unwrap()
    );
    assert_eq!(before.get(LayerId(2)).unwrap().font_size, 200.0);
}

#[test]
fn operations_on_missing_id_leave_stack_untouched() {
    let mut stack = LayerStack::from_layers(vec![layer(1)]).unwrap();
    let before = stack.clone();

    assert!(matches!(
        stack.update_attribute(LayerId(9), LayerAttr::Top(1.0)),
        Err(TextBehindError::LayerNotFound(LayerId(9)))
    ));
    assert!(stack.duplicate_layer(LayerId(9)).is_err());
    assert!(stack.remove_layer(LayerId(9)).is_err());
    assert_eq!(stack, before);
}

#[test]
fn remove_keeps_order_of_remaining_layers() {
    let mut stack = LayerStack::from_layers(vec![layer(1), layer(2), layer(3)]).unwrap();
    let removed = stack.remove_layer(LayerId(2)).unwrap();
    assert_eq!(removed.id, LayerId(2));
    let ids: Vec<_> = stack.iter().map(|l| l.id.0).collect();
    assert_eq!(ids, vec![1, 3]);
}

#[test]
fn from_layers_rejects_duplicate_ids() {
    assert!(LayerStack::from_layers(vec![layer(1), layer(1)]).is_err());
}

#[test]
fn attr_from_json_accepts_ui_names() {
    assert_eq!(
        LayerAttr::from_json("fontSize", json!(120)).unwrap(),
        LayerAttr::FontSize(120.0)
    );
    assert_eq!(
        LayerAttr::from_json("shadow_color", json!("black")).unwrap(),
        LayerAttr::ShadowColor(Color::BLACK)
    );
    assert_eq!(
        LayerAttr::from_json("fontWeight", json!("700")).unwrap(),
        LayerAttr::FontWeight(700)
    );
    assert_eq!(
        LayerAttr::from_json("text", json!("hi")).unwrap().name(),
        "text"
    );
}

#[test]
fn attr_from_json_rejects_bad_input() {
    assert!(LayerAttr::from_json("bogus", json!(1)).is_err());
    assert!(LayerAttr::from_json("text", json!(1)).is_err());
    assert!(LayerAttr::from_json("left", json!("abc")).is_err());
    assert!(LayerAttr::from_json("color", json!(true)).is_err());
    assert!(LayerAttr::from_json("fontWeight", json!(0)).is_err());
}

#[test]
fn stack_serializes_as_layer_array() {
    let stack = LayerStack::from_layers(vec![layer(5)]).unwrap();
    let v = serde_json::to_value(&stack).unwrap();
    assert_eq!(v[0]["id"], json!(5));
    assert_eq!(v[0]["fontFamily"], json!("Inter"));
    assert_eq!(v[0]["shadowColor"], json!("#000000cc"));

    let back: LayerStack = serde_json::from_value(v).unwrap();
    assert_eq!(back, stack);
}
