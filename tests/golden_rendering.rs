use std::fs;
use std::path::PathBuf;

use bibcert::rendering::background::{paint_background, Background, FallbackReason, FallbackStyle};
use bibcert::rendering::RasterSurface;
use sha2::{Digest, Sha256};

fn golden_path(name: &str) -> PathBuf {
    let mut p = PathBuf::from("tests/goldens/expected");
    p.push(name);
    p
}

#[test]
fn fallback_background_matches_golden() {
    let mut surface = RasterSurface::new(256, 128);
    paint_background(
        &mut surface,
        &Background::Fallback(FallbackReason::TimedOut),
        &FallbackStyle::default(),
    )
    .expect("paint fallback");

    // Hash raw pixels so the golden does not depend on PNG encoder settings
    let digest = hex::encode(Sha256::digest(surface.image().as_raw()));

    let expected_path = golden_path("fallback_256x128.sha256");
    if std::env::var("UPDATE_GOLDENS").is_ok() {
        fs::create_dir_all("tests/goldens/expected").ok();
        fs::write(&expected_path, &digest).expect("write golden");
        println!("Updated golden: {:?}", expected_path);
        return;
    }

    if !expected_path.exists() {
        println!(
            "No golden at {:?}; run with UPDATE_GOLDENS=1 to create it. Skipping.",
            expected_path
        );
        return;
    }

    let exp = fs::read_to_string(&expected_path).expect("unable to read golden");
    assert_eq!(digest, exp.trim());
}

#[test]
fn fallback_corners_and_border_pixels() {
    let mut surface = RasterSurface::new(256, 128);
    paint_background(
        &mut surface,
        &Background::Fallback(FallbackReason::TimedOut),
        &FallbackStyle::default(),
    )
    .expect("paint fallback");
    let img = surface.image();

    assert_eq!(img.get_pixel(0, 0).0, [0xf8, 0xfa, 0xfc, 0xff]);
    assert_eq!(img.get_pixel(255, 127).0, [0xe2, 0xe8, 0xf0, 0xff]);
    // Border straddles the inset outline at 20px: rows 16..24 are teal.
    assert_eq!(img.get_pixel(128, 16).0, [0x0d, 0x94, 0x88, 0xff]);
    assert_eq!(img.get_pixel(128, 23).0, [0x0d, 0x94, 0x88, 0xff]);
    assert_ne!(img.get_pixel(128, 24).0, [0x0d, 0x94, 0x88, 0xff]);
    assert_ne!(img.get_pixel(128, 15).0, [0x0d, 0x94, 0x88, 0xff]);
}

#[test]
fn fallback_rendering_is_deterministic() {
    let render = || {
        let mut s = RasterSurface::new(120, 80);
        paint_background(
            &mut s,
            &Background::Fallback(FallbackReason::LoadFailed("missing".into())),
            &FallbackStyle::default(),
        )
        .unwrap();
        s.image().as_raw().clone()
    };
    assert_eq!(render(), render());
}
