use std::sync::Mutex;
use std::time::Duration;

use super::*;

fn source() -> PreparedImage {
    PreparedImage::from_straight_rgba8(1, 1, vec![10, 20, 30, 255]).unwrap()
}

#[test]
fn wait_returns_cutout_tagged_with_pair() {
    let remover: Arc<dyn BackgroundRemover> =
        Arc::new(|src: &PreparedImage| -> TextBehindResult<PreparedImage> { Ok(src.clone()) });
    let job = RemovalJob::spawn(ImagePairId(7), source(), remover).unwrap();
    assert_eq!(job.pair(), ImagePairId(7));

    let out = job.wait();
    assert_eq!(out.pair, ImagePairId(7));
    assert_eq!(out.result.unwrap(), source());
}

#[test]
fn try_take_is_empty_until_worker_finishes() {
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let gate = Mutex::new(release_rx);
    let remover: Arc<dyn BackgroundRemover> = Arc::new(
        move |src: &PreparedImage| -> TextBehindResult<PreparedImage> {
            let _ = gate.lock().unwrap().recv();
            Ok(src.clone())
        },
    );
    let mut job = RemovalJob::spawn(ImagePairId(1), source(), remover).unwrap();
    assert!(job.try_take().is_none());

    release_tx.send(()).unwrap();
    let mut outcome = None;
    for _ in 0..500 {
        outcome = job.try_take();
        if outcome.is_some() {
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(outcome.unwrap().result.is_ok());
}

#[test]
fn remover_error_is_reported() {
    let remover: Arc<dyn BackgroundRemover> =
        Arc::new(|_: &PreparedImage| -> TextBehindResult<PreparedImage> {
            Err(TextBehindError::removal_failed("model unavailable"))
        });
    let out = RemovalJob::spawn(ImagePairId(2), source(), remover)
        .unwrap()
        .wait();
    assert!(matches!(out.result, Err(TextBehindError::RemovalFailed(_))));
}

#[test]
fn panicking_remover_becomes_removal_failure() {
    let remover: Arc<dyn BackgroundRemover> =
        Arc::new(|_: &PreparedImage| -> TextBehindResult<PreparedImage> {
            panic!("remover blew up")
        });
    let out = RemovalJob::spawn(ImagePairId(3), source(), remover)
        .unwrap()
        .wait();
    assert!(matches!(out.result, Err(TextBehindError::RemovalFailed(_))));
}
