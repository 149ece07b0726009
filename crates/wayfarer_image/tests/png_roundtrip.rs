use std::io::Cursor;

use wayfarer_image::{ImageData, ImageError, ImageSource};

fn encode_png(width: u32, height: u32, pixels: Vec<u8>) -> Vec<u8> {
    let buffer = image::RgbaImage::from_raw(width, height, pixels).unwrap();
    let mut bytes = Vec::new();
    buffer
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

#[test]
fn decodes_png_bytes_to_rgba() {
    let pixels: Vec<u8> = (0..6 * 4).map(|i| (i * 10) as u8).collect();
    let bytes = encode_png(3, 2, pixels.clone());

    let data = ImageData::load(&ImageSource::bytes(bytes)).unwrap();
    assert_eq!(data.dimensions(), (3, 2));
    assert_eq!(data.pixels(), pixels.as_slice());
}

#[test]
fn loads_png_file_from_disk() {
    let dir = std::env::temp_dir().join("wayfarer_image_test");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("dot.png");
    std::fs::write(&path, encode_png(1, 1, vec![255, 0, 0, 255])).unwrap();

    let data = ImageData::load(&ImageSource::file(&path)).unwrap();
    assert_eq!(data.pixels(), &[255, 0, 0, 255]);
}

#[test]
fn garbage_bytes_are_a_decode_error() {
    let err = ImageData::load(&ImageSource::bytes(vec![1, 2, 3])).unwrap_err();
    assert!(matches!(err, ImageError::Decode(_)));
}

#[test]
fn missing_file_is_an_io_error() {
    let err = ImageData::load(&ImageSource::file("/definitely/not/here.png")).unwrap_err();
    assert!(matches!(err, ImageError::Io { .. }));
}
