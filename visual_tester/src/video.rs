// Video path: OpenCV supplies the collaborators the engine leaves outside its core,
// i.e. frame I/O, a YOLOv8 ball detector and a drawing surface over `Mat`.

use crate::settings::AppConfig;
use action_ball::core_modules::detection_filter::DetectionFilter;
use action_ball::core_modules::frame_annotator::{Canvas, Color, clip_box, clip_segment, label_visible};
use action_ball::core_modules::geometry::{BoundingBox, Detection, Segment};
use action_ball::core_modules::tracker::{Detector, IouTracker};
use action_ball::{BallPipeline, DetectorConfig};
use anyhow::{Context, Result, bail};
use opencv::{
    core::{self, Mat, Point, Rect, Scalar, Size, Vector},
    dnn, imgproc,
    prelude::*,
    videoio::{self, VideoCapture, VideoWriter},
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

const FALLBACK_FPS: f64 = 30.0;

#[rustfmt::skip]
const COCO_LABELS: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch", "potted plant",
    "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote", "keyboard", "cell phone",
    "microwave", "oven", "toaster", "sink", "refrigerator", "book", "clock", "vase", "scissors",
    "teddy bear", "hair drier", "toothbrush",
];

#[derive(Debug, Clone)]
pub struct VideoOptions {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// A BGR OpenCV frame the annotator can draw on.
pub struct MatCanvas(pub Mat);

fn bgr(color: Color) -> Scalar {
    Scalar::new(color.b as f64, color.g as f64, color.r as f64, 0.0)
}

fn point(x: f64, y: f64) -> Point {
    Point::new(x.round() as i32, y.round() as i32)
}

const LABEL_FONT_SCALE: f64 = 0.6;
const LABEL_THICKNESS: i32 = 2;

impl MatCanvas {
    fn size(&self) -> (u32, u32) {
        (self.0.cols().max(0) as u32, self.0.rows().max(0) as u32)
    }
}

impl Canvas for MatCanvas {
    type Error = opencv::Error;

    fn draw_box(&mut self, bbox: &BoundingBox, color: Color, thickness: u32) -> opencv::Result<()> {
        let (width, height) = self.size();
        let Some(bbox) = clip_box(bbox, width, height) else {
            return Ok(());
        };
        let rect = Rect::new(
            bbox.x1.round() as i32,
            bbox.y1.round() as i32,
            bbox.width().round() as i32,
            bbox.height().round() as i32,
        );
        imgproc::rectangle(&mut self.0, rect, bgr(color), thickness as i32, imgproc::LINE_8, 0)
    }

    fn draw_label(&mut self, x: f64, y: f64, text: &str, color: Color) -> opencv::Result<()> {
        let (width, height) = self.size();
        let mut baseline = 0;
        let text_size =
            imgproc::get_text_size(text, imgproc::FONT_HERSHEY_SIMPLEX, LABEL_FONT_SCALE, LABEL_THICKNESS, &mut baseline)?;
        if !label_visible(x, y, text_size.width as f64, text_size.height as f64, width, height) {
            return Ok(());
        }
        imgproc::put_text(
            &mut self.0,
            text,
            point(x, y),
            imgproc::FONT_HERSHEY_SIMPLEX,
            LABEL_FONT_SCALE,
            bgr(color),
            LABEL_THICKNESS,
            imgproc::LINE_8,
            false,
        )
    }

    fn draw_segment(&mut self, segment: &Segment, color: Color, thickness: u32) -> opencv::Result<()> {
        let (width, height) = self.size();
        let Some(segment) = clip_segment(segment, width, height) else {
            return Ok(());
        };
        imgproc::line(
            &mut self.0,
            point(segment.from.x, segment.from.y),
            point(segment.to.x, segment.to.y),
            bgr(color),
            thickness as i32,
            imgproc::LINE_8,
            0,
        )
    }
}

/// YOLOv8 ONNX model run through OpenCV's DNN module.
pub struct YoloDetector {
    net: dnn::Net,
    input_size: i32,
    nms_threshold: f32,
    filter: DetectionFilter,
}

impl YoloDetector {
    pub fn new(config: &DetectorConfig) -> Result<Self> {
        let net = dnn::read_net_from_onnx(&config.model_path)
            .with_context(|| format!("cannot load detector model {}", config.model_path))?;
        Ok(Self {
            net,
            input_size: config.input_size as i32,
            nms_threshold: config.nms_threshold,
            filter: DetectionFilter::new(config.filter.clone()),
        })
    }
}

impl Detector<MatCanvas> for YoloDetector {
    type Error = opencv::Error;

    fn detect(&mut self, frame: &MatCanvas) -> opencv::Result<Vec<Detection>> {
        let frame = &frame.0;
        let size = Size::new(self.input_size, self.input_size);
        let blob = dnn::blob_from_image(frame, 1.0 / 255.0, size, Scalar::default(), true, false, core::CV_32F)?;
        self.net.set_input(&blob, "", 1.0, Scalar::default())?;
        let output = self.net.forward_single("")?;

        // Output layout: [1, 4 + classes, candidates], box given as cx, cy, w, h.
        let data = output.data_typed::<f32>()?;
        let rows = 4 + COCO_LABELS.len();
        let candidates = data.len() / rows;
        let x_scale = frame.cols() as f32 / self.input_size as f32;
        let y_scale = frame.rows() as f32 / self.input_size as f32;

        let mut boxes = Vector::<Rect>::new();
        let mut scores = Vector::<f32>::new();
        let mut found = Vec::new();
        for i in 0..candidates {
            let (class, score) = (0..COCO_LABELS.len())
                .map(|c| (c, data[(4 + c) * candidates + i]))
                .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

            let cx = data[i] * x_scale;
            let cy = data[candidates + i] * y_scale;
            let w = data[2 * candidates + i] * x_scale;
            let h = data[3 * candidates + i] * y_scale;
            let bbox = BoundingBox::new((cx - w / 2.0) as f64, (cy - h / 2.0) as f64, (cx + w / 2.0) as f64, (cy + h / 2.0) as f64);
            let detection = Detection::new(bbox, score as f64);

            if !self.filter.accept(COCO_LABELS[class], &detection) {
                continue;
            }
            boxes.push(Rect::new(bbox.x1 as i32, bbox.y1 as i32, w as i32, h as i32));
            scores.push(score);
            found.push(detection);
        }

        let mut keep = Vector::<i32>::new();
        dnn::nms_boxes(&boxes, &scores, 0.0, self.nms_threshold, &mut keep, 1.0, 0)?;
        let detections: Vec<Detection> = keep.iter().map(|i| found[i as usize]).collect();
        debug!(candidates = found.len(), kept = detections.len(), "ball detections");
        Ok(detections)
    }
}

/// Brings a frame to the writer's size and channel count.
fn conform(frame: Mat, width: i32, height: i32) -> opencv::Result<Mat> {
    let mut frame = frame;
    if frame.cols() != width || frame.rows() != height {
        let mut resized = Mat::default();
        imgproc::resize(&frame, &mut resized, Size::new(width, height), 0.0, 0.0, imgproc::INTER_LINEAR)?;
        frame = resized;
    }
    if frame.channels() == 4 {
        let mut bgr = Mat::default();
        imgproc::cvt_color(&frame, &mut bgr, imgproc::COLOR_BGRA2BGR, 0)?;
        frame = bgr;
    }
    Ok(frame)
}

/// Annotates a video file frame by frame. Returns the number of frames written.
pub fn run(options: &VideoOptions, app: &AppConfig, stop: &AtomicBool) -> Result<u64> {
    if let Some(parent) = options.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("cannot create {}", parent.display()))?;
    }

    let input = options.input.to_string_lossy();
    let mut cap = VideoCapture::from_file(&input, videoio::CAP_ANY)?;
    if !cap.is_opened()? {
        bail!("cannot open video file: {input}");
    }

    let width = cap.get(videoio::CAP_PROP_FRAME_WIDTH)? as i32;
    let height = cap.get(videoio::CAP_PROP_FRAME_HEIGHT)? as i32;
    let mut fps = cap.get(videoio::CAP_PROP_FPS)?;
    if fps == 0.0 || fps.is_nan() {
        fps = FALLBACK_FPS;
    }

    let output = options.output.to_string_lossy();
    let fourcc = VideoWriter::fourcc('X', 'V', 'I', 'D')?;
    let mut writer = VideoWriter::new(&output, fourcc, fps, Size::new(width, height), true)?;
    if !writer.is_opened()? {
        bail!("failed to open video writer for: {output}");
    }
    info!(%input, width, height, fps, "video opened");

    let mut detector = YoloDetector::new(&app.detector)?;
    let mut tracker = IouTracker::new(app.tracker.clone());
    let mut pipeline = BallPipeline::new(app.pipeline.clone())?;

    let mut written = 0;
    loop {
        if stop.load(Ordering::Relaxed) {
            info!(frames = written, "interrupted");
            break;
        }
        let mut frame = Mat::default();
        if !cap.read(&mut frame)? || frame.empty() {
            info!(frames = written, "end of video");
            break;
        }

        let mut canvas = MatCanvas(frame);
        let report = pipeline.process_frame(&mut canvas, &mut detector, &mut tracker)?;
        debug!(
            frame = report.frame_number,
            live_tracks = tracker.active_count(),
            reported = report.tracks.len(),
            "tracker state"
        );
        writer.write(&conform(canvas.0, width, height)?)?;
        written += 1;
    }

    cap.release()?;
    writer.release()?;
    info!(output = %output, frames = written, "video saved");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_ball::core_modules::geometry::Centroid;

    #[test]
    fn sports_ball_is_coco_class_32() {
        assert_eq!(COCO_LABELS[32], "sports ball");
    }

    #[test]
    fn canvas_draws_in_bgr() {
        let frame = Mat::new_rows_cols_with_default(40, 40, core::CV_8UC3, Scalar::all(0.0)).unwrap();
        let mut canvas = MatCanvas(frame);
        canvas
            .draw_box(&BoundingBox::new(5.0, 5.0, 30.0, 30.0), Color::RED, 2)
            .unwrap();
        let pixel = canvas.0.at_2d::<core::Vec3b>(5, 5).unwrap();
        assert_eq!(pixel.0, [0, 0, 255]);
    }

    #[test]
    fn canvas_skips_geometry_far_outside_the_frame() {
        let frame = Mat::new_rows_cols_with_default(40, 40, core::CV_8UC3, Scalar::all(0.0)).unwrap();
        let mut canvas = MatCanvas(frame);
        canvas
            .draw_box(&BoundingBox::new(3e9, 10.0, 3e9 + 20.0, 30.0), Color::RED, 2)
            .unwrap();
        canvas.draw_label(3e9, 0.0, "ID1 | Action Ball", Color::RED).unwrap();
        let long = Segment {
            from: Centroid::new(0.0, 0.0),
            to: Centroid::new(1e9, 0.0),
        };
        canvas.draw_segment(&long, Color::RED, 2).unwrap();

        assert_eq!(canvas.0.at_2d::<core::Vec3b>(0, 20).unwrap().0, [0, 0, 255]);
        assert_eq!(canvas.0.at_2d::<core::Vec3b>(20, 20).unwrap().0, [0, 0, 0]);
    }

    #[test]
    fn conform_resizes_and_drops_alpha() {
        let frame = Mat::new_rows_cols_with_default(10, 20, core::CV_8UC4, Scalar::all(255.0)).unwrap();
        let out = conform(frame, 40, 30).unwrap();
        assert_eq!((out.cols(), out.rows(), out.channels()), (40, 30, 3));
    }
}
