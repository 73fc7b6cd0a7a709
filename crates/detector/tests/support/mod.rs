//! Shared fixtures: a backend that replays fixed outputs and a local HTTP
//! server standing in for the image host.

#![allow(dead_code)]

use axum::{
    Router,
    http::{StatusCode, header},
    routing::get,
};
use detector::{
    BackendOptions, ClassOutput, DetectionBackend, Detector, LabelMap, RawDetections,
    processing::PreProcessor,
};
use image::{ImageFormat, Rgb, RgbImage};
use ndarray::{Array, Array4, IxDyn};
use std::io::Cursor;
use std::sync::{Arc, Mutex};

pub const IMAGE_WIDTH: u32 = 64;
pub const IMAGE_HEIGHT: u32 = 48;

/// Replays the same outputs for every call and remembers input shapes.
pub struct ScriptedBackend {
    raw: RawDetections,
    seen_shapes: Arc<Mutex<Vec<Vec<usize>>>>,
}

impl ScriptedBackend {
    pub fn new(raw: RawDetections) -> (Self, Arc<Mutex<Vec<Vec<usize>>>>) {
        let seen_shapes = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                raw,
                seen_shapes: Arc::clone(&seen_shapes),
            },
            seen_shapes,
        )
    }
}

impl DetectionBackend for ScriptedBackend {
    fn load_model(path: &str, _options: &BackendOptions) -> anyhow::Result<Self> {
        anyhow::bail!("scripted backend has no model file to load ({})", path)
    }

    fn detect(&mut self, images: &Array4<f32>) -> anyhow::Result<RawDetections> {
        self.seen_shapes
            .lock()
            .unwrap()
            .push(images.shape().to_vec());
        Ok(self.raw.clone())
    }
}

/// Panics on its first run, then replays `raw`.
pub struct PanicOnceBackend {
    raw: RawDetections,
    calls: usize,
}

impl PanicOnceBackend {
    pub fn new(raw: RawDetections) -> Self {
        Self { raw, calls: 0 }
    }
}

impl DetectionBackend for PanicOnceBackend {
    fn load_model(path: &str, _options: &BackendOptions) -> anyhow::Result<Self> {
        anyhow::bail!("scripted backend has no model file to load ({})", path)
    }

    fn detect(&mut self, _images: &Array4<f32>) -> anyhow::Result<RawDetections> {
        self.calls += 1;
        if self.calls == 1 {
            panic!("runtime fault during the first run");
        }
        Ok(self.raw.clone())
    }
}

pub fn labels() -> LabelMap {
    LabelMap::from_entities(["Person", "Car", "Bicycle", "Dog"])
}

/// Three detections in the batched layout the exported model produces.
pub fn three_detections() -> RawDetections {
    RawDetections {
        boxes: Array::from_shape_vec(
            IxDyn(&[1, 3, 4]),
            vec![
                0.1, 0.2, 0.4, 0.5, //
                0.5, 0.5, 0.9, 0.8, //
                0.0, 0.0, 1.0, 1.0,
            ],
        )
        .unwrap(),
        scores: Array::from_shape_vec(IxDyn(&[1, 3]), vec![0.92, 0.61, 0.05]).unwrap(),
        classes: ClassOutput::Indices(
            Array::from_shape_vec(IxDyn(&[1, 3]), vec![0i64, 3, 1]).unwrap(),
        ),
    }
}

pub fn detector_with(
    raw: RawDetections,
    max_dimension: Option<u32>,
) -> (Arc<Detector<ScriptedBackend>>, Arc<Mutex<Vec<Vec<usize>>>>) {
    let (backend, seen_shapes) = ScriptedBackend::new(raw);
    let detector = Detector::new(backend, Some(labels()), PreProcessor::new(max_dimension));
    (Arc::new(detector), seen_shapes)
}

pub fn sample_jpeg() -> Vec<u8> {
    let image = RgbImage::from_fn(IMAGE_WIDTH, IMAGE_HEIGHT, |x, y| {
        Rgb([(x * 4) as u8, (y * 5) as u8, 128])
    });
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Jpeg).unwrap();
    bytes.into_inner()
}

/// Serves `/street.jpg`, `/page.html` and a 404 at `/gone.jpg`. Returns the
/// base URL.
pub async fn spawn_image_server() -> String {
    let jpeg = sample_jpeg();

    let app = Router::new()
        .route(
            "/street.jpg",
            get(move || {
                let jpeg = jpeg.clone();
                async move { ([(header::CONTENT_TYPE, "image/jpeg")], jpeg) }
            }),
        )
        .route(
            "/page.html",
            get(|| async { ([(header::CONTENT_TYPE, "text/html")], "<html>hello</html>") }),
        )
        .route("/gone.jpg", get(|| async { StatusCode::NOT_FOUND }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}
