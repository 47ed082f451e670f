use std::sync::Mutex;
use std::sync::mpsc;

use super::*;
use crate::export::sink::InMemorySink;
use crate::foundation::core::Point;

fn session() -> EditorSession {
    EditorSession::new(EditorOpts::default(), FontBook::new())
}

fn solid(w: u32, h: u32, rgba: [u8; 4]) -> PreparedImage {
    PreparedImage::from_straight_rgba8(w, h, rgba.repeat((w * h) as usize)).unwrap()
}

fn echo_remover(cutout: PreparedImage) -> Arc<dyn BackgroundRemover> {
    Arc::new(move |_: &PreparedImage| -> TextBehindResult<PreparedImage> { Ok(cutout.clone()) })
}

/// Remover that blocks until the returned sender fires.
fn gated_remover(cutout: PreparedImage) -> (Arc<dyn BackgroundRemover>, mpsc::Sender<()>) {
    let (tx, rx) = mpsc::channel::<()>();
    let gate = Mutex::new(rx);
    let remover: Arc<dyn BackgroundRemover> = Arc::new(
        move |_: &PreparedImage| -> TextBehindResult<PreparedImage> {
            let _ = gate.lock().unwrap().recv();
            Ok(cutout.clone())
        },
    );
    (remover, tx)
}

#[test]
fn layer_operations_follow_id_policy() {
    let mut s = session();
    let a = s.add_layer();
    let b = s.add_layer();
    assert_eq!((a, b), (LayerId(1), LayerId(2)));

    s.update_attribute_json(a, "text", serde_json::json!("hello"))
        .unwrap();
    let c = s.duplicate_layer(a).unwrap();
    assert_eq!(c, LayerId(3));
    assert_eq!(s.layers().get(c).unwrap().text, "hello");
    assert_eq!(s.layers().get(b).unwrap().text, "edit");

    s.remove_layer(c).unwrap();
    assert_eq!(s.add_layer(), LayerId(4));
    assert!(matches!(
        s.remove_layer(LayerId(99)),
        Err(TextBehindError::LayerNotFound(LayerId(99)))
    ));
}

#[test]
fn numeric_position_edits_snap_to_grid() {
    let mut s = session();
    let id = s.add_layer();
    s.set_position_percent(id, PositionAxis::X, 62.7).unwrap();
    s.set_position_percent(id, PositionAxis::Y, 18.0).unwrap();
    let l = s.layers().get(id).unwrap();
    assert_eq!((l.left, l.top), (15.0, 30.0));
}

#[test]
fn removing_dragged_layer_releases_the_drag() {
    let mut s = session();
    let id = s.add_layer();
    let rect = ImageRect::new(0.0, 0.0, 100.0, 100.0);
    s.apply_gesture(
        rect,
        GestureCommand::DragStarted {
            id,
            point: Point::new(50.0, 50.0),
        },
    )
    .unwrap();
    assert_eq!(s.drag_state(), DragState::Dragging { id });
    s.remove_layer(id).unwrap();
    assert_eq!(s.drag_state(), DragState::Idle);
}

#[test]
fn removal_result_is_merged_into_current_pair() {
    let mut s = session();
    let pair = s
        .load_image(
            ImageSource::from(solid(4, 4, [0, 0, 255, 255])),
            Some(echo_remover(solid(4, 4, [255, 0, 0, 128]))),
        )
        .unwrap();
    assert!(s.removal_pending());
    assert_eq!(s.wait_removal(), RemovalStatus::Applied(pair));
    assert!(!s.removal_pending());
    assert_eq!(s.image().unwrap().cutout.as_ref().unwrap().width, 4);
    assert_eq!(s.poll_removal(), RemovalStatus::Idle);
}

#[test]
fn edits_made_during_removal_survive_the_merge() {
    let mut s = session();
    let (remover, release) = gated_remover(solid(2, 2, [1, 1, 1, 255]));
    let pair = s
        .load_image(ImageSource::from(solid(2, 2, [0, 0, 0, 255])), Some(remover))
        .unwrap();
    assert_eq!(s.poll_removal(), RemovalStatus::Pending(pair));

    let id = s.add_layer();
    s.update_attribute(id, LayerAttr::Text("while waiting".into()))
        .unwrap();

    release.send(()).unwrap();
    assert_eq!(s.wait_removal(), RemovalStatus::Applied(pair));
    assert_eq!(s.layers().len(), 1);
    assert_eq!(s.layers().get(id).unwrap().text, "while waiting");
    assert!(s.image().unwrap().cutout.is_some());
}

#[test]
fn stale_result_for_replaced_image_is_discarded() {
    let mut s = session();
    let (remover, release) = gated_remover(solid(2, 2, [9, 9, 9, 255]));
    let first = s
        .load_image(ImageSource::from(solid(2, 2, [0, 0, 0, 255])), Some(remover))
        .unwrap();
    let second = s
        .load_image(ImageSource::from(solid(3, 3, [0, 0, 0, 255])), None)
        .unwrap();
    assert_ne!(first, second);
    assert!(!s.removal_pending());
    let _ = release.send(());

    let status = s.apply_removal(RemovalOutcome {
        pair: first,
        result: Ok(solid(2, 2, [9, 9, 9, 255])),
    });
    assert_eq!(status, RemovalStatus::Discarded(first));
    let img = s.image().unwrap();
    assert_eq!(img.id, second);
    assert!(img.cutout.is_none());
}

#[test]
fn removal_failure_keeps_editing_usable() {
    let mut s = session();
    let failing: Arc<dyn BackgroundRemover> =
        Arc::new(|_: &PreparedImage| -> TextBehindResult<PreparedImage> {
            Err(TextBehindError::removal_failed("no model"))
        });
    let pair = s
        .load_image(ImageSource::from(solid(2, 2, [0, 0, 0, 255])), Some(failing))
        .unwrap();
    assert!(matches!(
        s.wait_removal(),
        RemovalStatus::Failed { pair: p, .. } if p == pair
    ));
    assert!(s.image().unwrap().cutout.is_none());
    assert_eq!(s.notices().len(), 1);
    assert_eq!(s.take_notices().len(), 1);
    assert!(s.notices().is_empty());

    let mut sink = InMemorySink::new();
    s.export(Some(PreviewBox::new(100.0, 100.0)), &mut sink)
        .unwrap();
    assert_eq!(sink.images().len(), 1);
}

#[test]
fn failed_load_keeps_previous_pair() {
    let mut s = session();
    let pair = s
        .load_image(ImageSource::from(solid(2, 2, [0, 0, 0, 255])), None)
        .unwrap();
    let err = s
        .load_image(ImageSource::bytes(b"nope".to_vec()), None)
        .unwrap_err();
    assert!(matches!(err, TextBehindError::ImageDecodeFailed(_)));
    assert_eq!(s.image().unwrap().id, pair);
}

#[test]
fn export_preconditions_leave_sink_untouched() {
    let mut s = session();
    s.add_layer();
    let mut sink = InMemorySink::new();

    let err = s
        .export(Some(PreviewBox::new(100.0, 100.0)), &mut sink)
        .unwrap_err();
    assert!(matches!(err, TextBehindError::ExportPreconditionMissing(_)));

    s.load_image(ImageSource::from(solid(2, 2, [0, 0, 0, 255])), None)
        .unwrap();
    let err = s.export(None, &mut sink).unwrap_err();
    assert!(matches!(err, TextBehindError::ExportPreconditionMissing(_)));

    assert!(sink.images().is_empty());
    assert_eq!(s.layers().len(), 1);
}

#[test]
fn export_encodes_at_source_resolution() {
    let mut s = session();
    s.load_image(ImageSource::from(solid(5, 3, [10, 20, 30, 255])), None)
        .unwrap();
    let mut sink = InMemorySink::new();
    let out = s
        .export(Some(PreviewBox::new(640.0, 480.0)), &mut sink)
        .unwrap();
    assert_eq!((out.width, out.height), (5, 3));
    assert_eq!(out.file_name, "text-behind-image.png");

    let decoded = image::load_from_memory(&sink.images()[0].bytes)
        .unwrap()
        .to_rgba8();
    assert!(decoded.pixels().all(|p| p.0 == [10, 20, 30, 255]));
}

#[test]
fn placements_scale_to_output() {
    let mut s = session();
    s.load_image(ImageSource::from(solid(1200, 1200, [0, 0, 0, 255])), None)
        .unwrap();
    let id = s.add_layer();
    let p = s.placements(PreviewBox::new(800.0, 600.0)).unwrap();
    assert_eq!(p.len(), 1);
    assert_eq!(p[0].id, id);
    assert_eq!(p[0].preview.position, Point::new(400.0, 300.0));
    assert_eq!(p[0].output.position, Point::new(600.0, 600.0));
    assert_eq!(p[0].output.font_size, 400.0);
}
