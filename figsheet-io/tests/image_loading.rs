use std::fs::File;

use approx::assert_relative_eq;
use figsheet_io::{load_image, load_image_lenient, Error};
use tiff::encoder::{colortype, TiffEncoder};

#[test]
fn test_gray16_tiff_keeps_raw_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ctrl_00h.tif");
    let data: Vec<u16> = vec![0, 1000, 40000, 65535, 7, 8];
    let mut encoder = TiffEncoder::new(File::create(&path).unwrap()).unwrap();
    encoder
        .write_image::<colortype::Gray16>(3, 2, &data)
        .unwrap();

    let image = load_image(dir.path(), "ctrl_00h.tif").unwrap();
    assert_eq!(image.dim(), (2, 3));
    assert_relative_eq!(image[[0, 2]], 40000.0);
    assert_relative_eq!(image[[1, 0]], 65535.0);
}

#[test]
fn test_rgb_tiff_is_channel_mean() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rgb.TIFF");
    let data: Vec<u8> = vec![30, 60, 90, 0, 0, 3];
    let mut encoder = TiffEncoder::new(File::create(&path).unwrap()).unwrap();
    encoder
        .write_image::<colortype::RGB8>(2, 1, &data)
        .unwrap();

    let image = load_image(dir.path(), "rgb.TIFF").unwrap();
    assert_eq!(image.dim(), (1, 2));
    assert_relative_eq!(image[[0, 0]], 60.0);
    assert_relative_eq!(image[[0, 1]], 1.0);
}

#[test]
fn test_png_through_image_crate() {
    let dir = tempfile::tempdir().unwrap();
    let buf = image::GrayImage::from_raw(2, 2, vec![0, 64, 128, 255]).unwrap();
    buf.save(dir.path().join("plane.png")).unwrap();

    let image = load_image(dir.path(), "plane.png").unwrap();
    assert_eq!(image.dim(), (2, 2));
    assert_relative_eq!(image[[1, 1]], 255.0);
    assert_relative_eq!(image[[0, 1]], 64.0);
}

#[test]
fn test_corrupt_file_fails_leniently() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("broken.tif"), b"II*\0garbage").unwrap();
    assert!(load_image(dir.path(), "broken.tif").is_err());
    assert!(load_image_lenient(dir.path(), "broken.tif").is_none());
}

#[test]
fn test_nd2_reports_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.ND2"), b"x").unwrap();
    assert!(matches!(
        load_image(dir.path(), "a.ND2"),
        Err(Error::UnsupportedFormat(_))
    ));
}
