use std::sync::Arc;

use hikari::{
    canvas::{Canvas, ToneMap},
    expect,
    math::Vector3,
};

#[test]
fn accumulates_adds() {
    let canvas = Canvas::new(4, 4);
    canvas.add(1, 2, Vector3::new(1.0, 2.0, 3.0));
    canvas.add(1, 2, Vector3::new(0.5, 0.5, 0.5));
    canvas.add(0, 0, Vector3::new(1.0, 0.0, 0.0));

    assert_eq!(canvas.at(1, 2), Vector3::new(1.5, 2.5, 3.5));
    assert_eq!(canvas.at(0, 0), Vector3::new(1.0, 0.0, 0.0));
    assert_eq!(canvas.at(3, 3), Vector3::zeros());
}

#[test]
fn accumulation_is_schedule_independent() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 100;

    let canvas = Arc::new(Canvas::new(16, 16));

    // Every thread sweeps every pixel, the worst case interleaving
    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let canvas = Arc::clone(&canvas);
            std::thread::spawn(move || {
                for _ in 0..ROUNDS {
                    for y in 0..16 {
                        for x in 0..16 {
                            canvas.add(x, y, Vector3::ones());
                        }
                    }
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    // Integer sums stay exact in f32, so no update may go missing
    let expected = (THREADS * ROUNDS) as f32;
    for y in 0..16 {
        for x in 0..16 {
            assert_eq!(canvas.at(x, y), Vector3::ones() * expected);
        }
    }
}

#[test]
fn writes_bmp_snapshot() {
    let canvas = Canvas::new(8, 8);
    for y in 0..8 {
        for x in 0..8 {
            let shade = (x + y) as f32 / 14.0;
            canvas.add(x, y, Vector3::new(shade, shade * 0.5, 1.0 - shade));
        }
    }

    let path = std::env::temp_dir().join("hikari_canvas_test.bmp");
    expect!(canvas.write(&path, ToneMap::AcesFilmic), "Snapshot failed");

    let meta = std::fs::metadata(&path).unwrap();
    assert!(meta.len() > 0);

    let image = image::open(&path).unwrap().to_rgb8();
    assert_eq!(image.width(), 8);
    assert_eq!(image.height(), 8);

    std::fs::remove_file(&path).ok();
}

#[test]
fn tone_map_none_keeps_ldr_values() {
    let canvas = Canvas::new(2, 1);
    canvas.add(0, 0, Vector3::zeros());
    canvas.add(1, 0, Vector3::ones());

    let path = std::env::temp_dir().join("hikari_canvas_ldr_test.bmp");
    expect!(canvas.write(&path, ToneMap::None), "Snapshot failed");

    let image = image::open(&path).unwrap().to_rgb8();
    // Zero stays zero and one saturates to full white through sRGB
    assert_eq!(image.get_pixel(0, 0), &image::Rgb([0u8, 0, 0]));
    assert_eq!(image.get_pixel(1, 0), &image::Rgb([255u8, 255, 255]));

    std::fs::remove_file(&path).ok();
}
