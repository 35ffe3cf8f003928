//! Integration test: a writer thread drives the controller while a
//! render thread runs the session loop.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Barrier};
use std::thread;

use nightvis_pipeline::{Control, ParameterSet, Session, SourceImage};

fn flat_source() -> Arc<SourceImage> {
    Arc::new(SourceImage::from_raw(8, 8, 3, vec![100; 192]).unwrap())
}

#[test]
fn render_loop_coalesces_updates_made_during_a_render() {
    let mut session = Session::new(flat_source(), ParameterSet::default());
    let controller = Arc::clone(session.controller());
    let gate = Arc::new(Barrier::new(2));

    let renderer = {
        let gate = Arc::clone(&gate);
        thread::spawn(move || {
            let mut frames = Vec::new();
            let displayed = session.run(|frame| {
                frames.push((frame.generation, frame.image.pixel(0, 0).to_vec()));
                if frames.len() == 1 {
                    // Hold the first frame until every update has landed.
                    gate.wait();
                    gate.wait();
                }
            });
            (session, displayed, frames)
        })
    };

    gate.wait();
    for b in 1..=200 {
        controller.set(Control::Brightness, f64::from(b)).unwrap();
    }
    controller.close();
    gate.wait();

    let (session, displayed, frames) = renderer.join().unwrap();
    assert_eq!(displayed, 2, "200 updates should collapse into one frame");
    assert_eq!(frames[0].0, Some(1));
    assert_eq!(frames[1].0, Some(201));
    // Flat source: the green channel equals the brightness.
    assert_eq!(frames[1].1, vec![0, 200, 0]);

    let last = session.frame().expect("at least one frame");
    assert!((last.params.brightness - 200.0).abs() < f32::EPSILON);
}

#[test]
fn concurrent_writers_never_lose_the_final_generation() {
    let session = Session::new(flat_source(), ParameterSet::default());
    let controller = Arc::clone(session.controller());

    let writers: Vec<_> = Control::ALL
        .into_iter()
        .map(|control| {
            let controller = Arc::clone(&controller);
            thread::spawn(move || {
                for i in 0..50 {
                    controller.set(control, f64::from(i)).unwrap();
                }
            })
        })
        .collect();
    for w in writers {
        w.join().unwrap();
    }

    let snapshot = controller.take_latest().unwrap();
    assert_eq!(snapshot.generation, 1 + 4 * 50);
    assert!(controller.take_latest().is_none());

    // Each control ends on its last written value, clamped and snapped.
    let params = snapshot.params;
    assert_eq!(params.blur_kernel_size, 49);
    assert!((params.contrast - 10.0).abs() < f32::EPSILON);
    assert!((params.brightness - 49.0).abs() < f32::EPSILON);
    assert_eq!(params.channel, 2);
}

#[test]
fn refresh_after_rejected_update_keeps_frame() {
    let mut session = Session::new(flat_source(), ParameterSet::default());
    session.refresh().unwrap();
    let before = session.frame().cloned().unwrap();

    assert!(session.controller().set(Control::Contrast, f64::INFINITY).is_err());
    assert!(session.refresh().unwrap().is_none());
    assert_eq!(session.frame(), Some(&before));
}
