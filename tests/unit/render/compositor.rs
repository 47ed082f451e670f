use super::*;
use crate::layers::color::Color;
use crate::layers::model::{LayerDefaults, LayerId};

fn solid(w: u32, h: u32, rgba: [u8; 4]) -> ImageSource {
    ImageSource::from(
        PreparedImage::from_straight_rgba8(w, h, rgba.repeat((w * h) as usize)).unwrap(),
    )
}

fn compositor() -> Compositor {
    Compositor::new(CompositorOpts::default(), FontBook::new())
}

fn preview() -> Option<PreviewBox> {
    Some(PreviewBox::new(400.0, 300.0))
}

#[test]
fn zero_layers_without_cutout_reproduces_source() {
    let src = solid(8, 6, [10, 20, 30, 255]);
    let frame = compositor()
        .compose(&ExportScene {
            source: Some(&src),
            cutout: None,
            layers: &[],
            preview: preview(),
        })
        .unwrap();
    assert_eq!((frame.width, frame.height), (8, 6));
    assert_eq!(frame.data, src.load().unwrap().rgba8_premul.as_ref().clone());
}

#[test]
fn cutout_is_composited_over_background() {
    let src = solid(4, 4, [0, 0, 255, 255]);
    // Left half opaque red, right half transparent.
    let mut px = Vec::new();
    for _y in 0..4 {
        for x in 0..4 {
            px.extend_from_slice(if x < 2 { &[255, 0, 0, 255] } else { &[0, 0, 0, 0] });
        }
    }
    let cut = ImageSource::from(PreparedImage::from_straight_rgba8(4, 4, px).unwrap());

    let frame = compositor()
        .compose(&ExportScene {
            source: Some(&src),
            cutout: Some(&cut),
            layers: &[],
            preview: preview(),
        })
        .unwrap();
    assert_eq!(&frame.data[0..4], &[255, 0, 0, 255]);
    assert_eq!(&frame.data[12..16], &[0, 0, 255, 255]);
}

#[test]
fn smaller_cutout_is_stretched_to_source_size() {
    let src = solid(6, 4, [0, 0, 0, 255]);
    let cut = solid(3, 2, [0, 255, 0, 255]);
    let frame = compositor()
        .compose(&ExportScene {
            source: Some(&src),
            cutout: Some(&cut),
            layers: &[],
            preview: preview(),
        })
        .unwrap();
    assert_eq!((frame.width, frame.height), (6, 4));
    assert!(frame.data.chunks_exact(4).all(|p| p == [0, 255, 0, 255]));
}

#[test]
fn preconditions_are_checked_before_decoding() {
    let broken = ImageSource::bytes(b"not an image".to_vec());
    let mut c = compositor();

    let err = c
        .compose(&ExportScene {
            source: None,
            cutout: None,
            layers: &[],
            preview: preview(),
        })
        .unwrap_err();
    assert!(matches!(err, TextBehindError::ExportPreconditionMissing(_)));

    for preview in [None, Some(PreviewBox::new(0.0, 300.0))] {
        let err = c
            .compose(&ExportScene {
                source: Some(&broken),
                cutout: None,
                layers: &[],
                preview,
            })
            .unwrap_err();
        assert!(matches!(err, TextBehindError::ExportPreconditionMissing(_)));
    }
}

#[test]
fn undecodable_cutout_fails_the_export() {
    let src = solid(2, 2, [1, 2, 3, 255]);
    let broken = ImageSource::bytes(b"garbage".to_vec());
    let err = compositor()
        .compose(&ExportScene {
            source: Some(&src),
            cutout: Some(&broken),
            layers: &[],
            preview: preview(),
        })
        .unwrap_err();
    assert!(matches!(err, TextBehindError::ImageDecodeFailed(_)));
}

#[test]
fn clear_color_shows_through_transparent_source() {
    let src = solid(2, 2, [0, 0, 0, 0]);
    let mut c = Compositor::new(
        CompositorOpts {
            clear_rgba: Some([255, 255, 255, 255]),
            ..CompositorOpts::default()
        },
        FontBook::new(),
    );
    let frame = c
        .compose(&ExportScene {
            source: Some(&src),
            cutout: None,
            layers: &[],
            preview: preview(),
        })
        .unwrap();
    assert!(frame.data.chunks_exact(4).all(|p| p == [255, 255, 255, 255]));
}

#[test]
fn opaque_cutout_hides_text_completely() {
    let font = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";
    if !std::path::Path::new(font).exists() {
        eprintln!("DejaVu Sans not installed; skipping");
        return;
    }
    let mut book = FontBook::new();
    book.register_file(font).unwrap();
    let mut c = Compositor::new(CompositorOpts::default(), book);

    let mut layer = TextLayer::with_defaults(LayerId(1), &LayerDefaults::default());
    layer.font_size = 60.0;
    let layers = vec![layer];

    let src = solid(64, 48, [0, 0, 0, 255]);
    let with_text = c
        .compose(&ExportScene {
            source: Some(&src),
            cutout: None,
            layers: &layers,
            preview: Some(PreviewBox::new(64.0, 48.0)),
        })
        .unwrap();
    assert_ne!(with_text.data, src.load().unwrap().rgba8_premul.as_ref().clone());

    let cut = solid(64, 48, [9, 9, 9, 255]);
    let hidden = c
        .compose(&ExportScene {
            source: Some(&src),
            cutout: Some(&cut),
            layers: &layers,
            preview: Some(PreviewBox::new(64.0, 48.0)),
        })
        .unwrap();
    assert!(hidden.data.chunks_exact(4).all(|p| p == [9, 9, 9, 255]));
}

#[test]
fn later_layers_draw_over_earlier_ones() {
    let font = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";
    if !std::path::Path::new(font).exists() {
        eprintln!("DejaVu Sans not installed; skipping");
        return;
    }
    let mut book = FontBook::new();
    book.register_file(font).unwrap();
    let mut c = Compositor::new(CompositorOpts::default(), book);

    let mut red = TextLayer::with_defaults(LayerId(1), &LayerDefaults::default());
    red.text = "MMMMMM".to_string();
    red.font_size = 30.0;
    red.left = 10.0;
    red.color = Color::rgba(255, 0, 0, 255);
    let mut blue = red.clone();
    blue.id = LayerId(2);
    blue.color = Color::rgba(0, 0, 255, 255);
    let layers = vec![red, blue];

    let src = solid(300, 300, [0, 0, 0, 255]);
    let frame = c
        .compose(&ExportScene {
            source: Some(&src),
            cutout: None,
            layers: &layers,
            preview: Some(PreviewBox::new(300.0, 300.0)),
        })
        .unwrap();

    let reddish = frame
        .data
        .chunks_exact(4)
        .filter(|p| p[0] > p[2])
        .count();
    let blue_ink = frame.data.chunks_exact(4).filter(|p| p[2] > 128).count();
    assert_eq!(reddish, 0);
    assert!(blue_ink > 100, "only {blue_ink} blue pixels");
}

#[test]
fn oversized_source_with_layers_is_a_render_error() {
    let src = solid(70_000, 1, [0, 0, 0, 255]);
    let mut c = compositor();

    let plain = c
        .compose(&ExportScene {
            source: Some(&src),
            cutout: None,
            layers: &[],
            preview: preview(),
        })
        .unwrap();
    assert_eq!(plain.width, 70_000);

    let layers = vec![TextLayer::with_defaults(LayerId(1), &LayerDefaults::default())];
    let err = c
        .compose(&ExportScene {
            source: Some(&src),
            cutout: None,
            layers: &layers,
            preview: preview(),
        })
        .unwrap_err();
    assert!(
        matches!(&err, TextBehindError::Render(msg) if msg.contains("raster limit")),
        "{err}"
    );
}
