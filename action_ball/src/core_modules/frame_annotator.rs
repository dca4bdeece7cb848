// THEORY:
// The `frame_annotator` is the final, purely presentational stage. It receives the
// frame's tracks together with an already-computed role assignment and the action
// ball's trail, and paints them. It never decides anything: every track maps to
// exactly one of three styles by looking up its role.
//
// Drawing goes through the `Canvas` trait so that the same rendering rules can paint
// an `image::RgbImage` here or an OpenCV `Mat` in the video tester without this module
// knowing about either backend's details.
//
// Tracks only have to be finite, so a box may sit billions of pixels away or be wider
// than any integer pixel type. Every canvas clips geometry to its own bounds in `f64`
// with `clip_box` / `clip_segment` before converting to pixels.

use crate::core_modules::geometry::{BoundingBox, Centroid, Identity, Segment, Track};
use crate::core_modules::role_classifier::{Role, RoleAssignment};
use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::convert::Infallible;
use std::sync::Arc;

const LINE_THICKNESS: u32 = 2;
const LABEL_OFFSET: f64 = 10.0;
const LABEL_SCALE: f32 = 18.0;
/// How far clipped geometry may reach past the canvas edge. Wider than any stroke, so the
/// edges of a clipped box never show up along the border.
const CLIP_MARGIN: f64 = 4.0;

/// An RGB drawing color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const RED: Color = Color { r: 255, g: 0, b: 0 };
    pub const GREEN: Color = Color { r: 0, g: 255, b: 0 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255 };
}

/// The three ways a track can be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Action,
    Stationary,
    Default,
}

impl Style {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Action => Style::Action,
            Role::Stationary => Style::Stationary,
            Role::Unclassified => Style::Default,
        }
    }

    pub fn color(self) -> Color {
        match self {
            Style::Action => Color::RED,
            Style::Stationary => Color::GREEN,
            Style::Default => Color::WHITE,
        }
    }

    pub fn label(self, identity: Identity) -> String {
        match self {
            Style::Action => format!("ID{identity} | Action Ball"),
            Style::Stationary => format!("ID{identity} | Stationary Ball"),
            Style::Default => format!("ID{identity}"),
        }
    }
}

/// A drawing surface the annotator can paint on.
pub trait Canvas {
    type Error: std::error::Error + Send + Sync + 'static;

    fn draw_box(&mut self, bbox: &BoundingBox, color: Color, thickness: u32) -> Result<(), Self::Error>;

    /// Draws text with its baseline-left corner at `(x, y)`.
    fn draw_label(&mut self, x: f64, y: f64, text: &str, color: Color) -> Result<(), Self::Error>;

    fn draw_segment(&mut self, segment: &Segment, color: Color, thickness: u32) -> Result<(), Self::Error>;
}

/// Paints every track in its role's style, plus the trail behind the action track.
///
/// With no tracks the canvas is left untouched. The trail is only drawn when the
/// action identity has a track in this frame.
pub fn annotate<C: Canvas>(
    canvas: &mut C,
    tracks: &[Track],
    roles: &RoleAssignment,
    trail: &[Segment],
) -> Result<(), C::Error> {
    for track in tracks {
        let style = Style::for_role(roles.role_of(track.identity));
        let color = style.color();

        if style == Style::Action {
            for segment in trail {
                canvas.draw_segment(segment, color, LINE_THICKNESS)?;
            }
        }

        canvas.draw_box(&track.bbox, color, LINE_THICKNESS)?;
        canvas.draw_label(
            track.bbox.x1,
            track.bbox.y1 - LABEL_OFFSET,
            &style.label(track.identity),
            color,
        )?;
    }
    Ok(())
}

/// Clamps `bbox` to a `width` x `height` canvas plus a small margin.
///
/// Returns `None` when the box lies entirely outside the canvas.
pub fn clip_box(bbox: &BoundingBox, width: u32, height: u32) -> Option<BoundingBox> {
    let (w, h) = (width as f64, height as f64);
    if bbox.x2 < 0.0 || bbox.y2 < 0.0 || bbox.x1 >= w || bbox.y1 >= h {
        return None;
    }
    let (lo, max_x, max_y) = (-CLIP_MARGIN, w + CLIP_MARGIN, h + CLIP_MARGIN);
    Some(BoundingBox::new(
        bbox.x1.clamp(lo, max_x),
        bbox.y1.clamp(lo, max_y),
        bbox.x2.clamp(lo, max_x),
        bbox.y2.clamp(lo, max_y),
    ))
}

/// Cuts a segment down to the part inside the canvas plus margin (Liang-Barsky).
///
/// Returns `None` when no part of the segment is inside.
pub fn clip_segment(segment: &Segment, width: u32, height: u32) -> Option<Segment> {
    let (x0, y0) = (segment.from.x, segment.from.y);
    let (dx, dy) = (segment.to.x - x0, segment.to.y - y0);
    let (lo, max_x, max_y) = (-CLIP_MARGIN, width as f64 + CLIP_MARGIN, height as f64 + CLIP_MARGIN);

    let (mut enter, mut exit) = (0.0_f64, 1.0_f64);
    for (p, q) in [(-dx, x0 - lo), (dx, max_x - x0), (-dy, y0 - lo), (dy, max_y - y0)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            enter = enter.max(t);
        } else {
            exit = exit.min(t);
        }
        if enter > exit {
            return None;
        }
    }
    Some(Segment {
        from: Centroid::new(x0 + enter * dx, y0 + enter * dy),
        to: Centroid::new(x0 + exit * dx, y0 + exit * dy),
    })
}

/// Whether a label of the given size, anchored baseline-left at `(x, y)`, touches the canvas.
pub fn label_visible(x: f64, y: f64, text_width: f64, text_height: f64, width: u32, height: u32) -> bool {
    x + text_width > 0.0 && x < width as f64 && y > 0.0 && y - text_height < height as f64
}

/// An `RgbImage` canvas drawn with `imageproc`.
///
/// Labels need a font; without one, only boxes and trails are drawn.
pub struct ImageCanvas {
    image: RgbImage,
    font: Option<Arc<FontVec>>,
}

impl ImageCanvas {
    pub fn new(image: RgbImage) -> Self {
        Self { image, font: None }
    }

    pub fn with_font(image: RgbImage, font: Arc<FontVec>) -> Self {
        Self { image, font: Some(font) }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

fn rgb(color: Color) -> Rgb<u8> {
    Rgb([color.r, color.g, color.b])
}

impl Canvas for ImageCanvas {
    type Error = Infallible;

    fn draw_box(&mut self, bbox: &BoundingBox, color: Color, thickness: u32) -> Result<(), Infallible> {
        let (width, height) = self.image.dimensions();
        let Some(bbox) = clip_box(bbox, width, height) else {
            return Ok(());
        };
        let x = bbox.x1.round() as i32;
        let y = bbox.y1.round() as i32;
        let w = bbox.width().round() as i64;
        let h = bbox.height().round() as i64;

        // Each ring is one pixel further inside the previous one.
        for inset in 0..thickness as i64 {
            let ring_w = w - 2 * inset;
            let ring_h = h - 2 * inset;
            if ring_w <= 0 || ring_h <= 0 {
                break;
            }
            let rect = Rect::at(x + inset as i32, y + inset as i32).of_size(ring_w as u32, ring_h as u32);
            draw_hollow_rect_mut(&mut self.image, rect, rgb(color));
        }
        Ok(())
    }

    fn draw_label(&mut self, x: f64, y: f64, text: &str, color: Color) -> Result<(), Infallible> {
        if let Some(font) = &self.font {
            let (width, height) = self.image.dimensions();
            let (text_w, text_h) = text_size(PxScale::from(LABEL_SCALE), font.as_ref(), text);
            if !label_visible(x, y, text_w as f64, text_h.max(LABEL_SCALE as u32) as f64, width, height) {
                return Ok(());
            }
            let top = y - LABEL_SCALE as f64;
            draw_text_mut(
                &mut self.image,
                rgb(color),
                x.round() as i32,
                top.round() as i32,
                PxScale::from(LABEL_SCALE),
                font.as_ref(),
                text,
            );
        }
        Ok(())
    }

    fn draw_segment(&mut self, segment: &Segment, color: Color, thickness: u32) -> Result<(), Infallible> {
        let (width, height) = self.image.dimensions();
        let Some(segment) = clip_segment(segment, width, height) else {
            return Ok(());
        };
        for offset in 0..thickness {
            let o = offset as f32;
            draw_line_segment_mut(
                &mut self.image,
                (segment.from.x as f32 + o, segment.from.y as f32 + o),
                (segment.to.x as f32 + o, segment.to.y as f32 + o),
                rgb(color),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[derive(Debug, PartialEq)]
    enum Call {
        Box(Color),
        Label(String),
        Segment(Color),
    }

    #[derive(Default)]
    struct RecordingCanvas {
        calls: Vec<Call>,
    }

    impl Canvas for RecordingCanvas {
        type Error = Infallible;

        fn draw_box(&mut self, _: &BoundingBox, color: Color, _: u32) -> Result<(), Infallible> {
            self.calls.push(Call::Box(color));
            Ok(())
        }

        fn draw_label(&mut self, _: f64, _: f64, text: &str, _: Color) -> Result<(), Infallible> {
            self.calls.push(Call::Label(text.to_string()));
            Ok(())
        }

        fn draw_segment(&mut self, _: &Segment, color: Color, _: u32) -> Result<(), Infallible> {
            self.calls.push(Call::Segment(color));
            Ok(())
        }
    }

    fn track(identity: Identity, x: f64) -> Track {
        Track::new(BoundingBox::new(x, 10.0, x + 20.0, 30.0), identity)
    }

    fn trail() -> Vec<Segment> {
        vec![
            Segment { from: Centroid::new(0.0, 0.0), to: Centroid::new(5.0, 5.0) },
            Segment { from: Centroid::new(5.0, 5.0), to: Centroid::new(10.0, 5.0) },
        ]
    }

    #[test]
    fn no_tracks_leaves_frame_unchanged() {
        let original = RgbImage::from_pixel(64, 48, Rgb([12, 34, 56]));
        let mut canvas = ImageCanvas::new(original.clone());
        let roles = RoleAssignment { action: Some(1), stationary: BTreeSet::from([2]) };

        annotate(&mut canvas, &[], &roles, &trail()).unwrap();
        assert_eq!(canvas.into_image(), original);
    }

    #[test]
    fn each_role_gets_its_own_style() {
        let mut canvas = RecordingCanvas::default();
        let roles = RoleAssignment { action: Some(1), stationary: BTreeSet::from([2]) };
        let tracks = [track(1, 0.0), track(2, 40.0), track(3, 80.0)];

        annotate(&mut canvas, &tracks, &roles, &trail()).unwrap();
        assert_eq!(
            canvas.calls,
            vec![
                Call::Segment(Color::RED),
                Call::Segment(Color::RED),
                Call::Box(Color::RED),
                Call::Label("ID1 | Action Ball".into()),
                Call::Box(Color::GREEN),
                Call::Label("ID2 | Stationary Ball".into()),
                Call::Box(Color::WHITE),
                Call::Label("ID3".into()),
            ]
        );
    }

    #[test]
    fn no_action_means_no_trail() {
        let mut canvas = RecordingCanvas::default();
        let roles = RoleAssignment { action: None, stationary: BTreeSet::from([2]) };

        annotate(&mut canvas, &[track(1, 0.0), track(2, 40.0)], &roles, &trail()).unwrap();
        assert!(!canvas.calls.iter().any(|c| matches!(c, Call::Segment(_))));
        assert_eq!(canvas.calls[0], Call::Box(Color::WHITE));
        assert_eq!(canvas.calls[2], Call::Box(Color::GREEN));
    }

    #[test]
    fn absent_action_track_draws_no_trail() {
        let mut canvas = RecordingCanvas::default();
        let roles = RoleAssignment { action: Some(9), stationary: BTreeSet::new() };

        annotate(&mut canvas, &[track(1, 0.0)], &roles, &trail()).unwrap();
        assert_eq!(canvas.calls, vec![Call::Box(Color::WHITE), Call::Label("ID1".into())]);
    }

    #[test]
    fn image_canvas_paints_box_border_and_trail() {
        let mut canvas = ImageCanvas::new(RgbImage::new(100, 100));
        let roles = RoleAssignment { action: Some(1), stationary: BTreeSet::new() };
        let tracks = [Track::new(BoundingBox::new(20.0, 20.0, 60.0, 60.0), 1)];
        let trail = [Segment { from: Centroid::new(0.0, 90.0), to: Centroid::new(90.0, 90.0) }];

        annotate(&mut canvas, &tracks, &roles, &trail).unwrap();
        let image = canvas.into_image();

        assert_eq!(image.get_pixel(20, 20), &Rgb([255, 0, 0]));
        assert_eq!(image.get_pixel(21, 40), &Rgb([255, 0, 0]));
        assert_eq!(image.get_pixel(40, 40), &Rgb([0, 0, 0]));
        assert_eq!(image.get_pixel(45, 90), &Rgb([255, 0, 0]));
    }

    #[test]
    fn boxes_outside_the_frame_are_clipped() {
        let mut canvas = ImageCanvas::new(RgbImage::new(32, 32));
        let roles = RoleAssignment::unassigned();
        let tracks = [Track::new(BoundingBox::new(20.0, 20.0, 500.0, 500.0), 4)];

        annotate(&mut canvas, &tracks, &roles, &[]).unwrap();
        assert_eq!(canvas.image().get_pixel(25, 20), &Rgb([255, 255, 255]));
    }

    #[test]
    fn far_away_boxes_leave_the_frame_untouched() {
        let original = RgbImage::new(64, 64);
        let mut canvas = ImageCanvas::new(original.clone());
        let roles = RoleAssignment { action: Some(1), stationary: BTreeSet::from([2]) };
        let tracks = [
            Track::new(BoundingBox::new(3e9, 10.0, 3e9 + 20.0, 30.0), 1),
            Track::new(BoundingBox::new(-5e12, -5e12, -4e12, -4e12), 2),
        ];
        let trail = [Segment { from: Centroid::new(3e9, 20.0), to: Centroid::new(3e9 + 40.0, 20.0) }];

        annotate(&mut canvas, &tracks, &roles, &trail).unwrap();
        assert_eq!(canvas.into_image(), original);
    }

    #[test]
    fn over_wide_box_is_clipped_to_the_frame() {
        let mut canvas = ImageCanvas::new(RgbImage::new(64, 64));
        let tracks = [Track::new(BoundingBox::new(10.0, 10.0, 10.0 + 4_294_967_296.0, 30.0), 3)];

        annotate(&mut canvas, &tracks, &RoleAssignment::unassigned(), &[]).unwrap();
        let image = canvas.into_image();
        assert_eq!(image.get_pixel(40, 10), &Rgb([255, 255, 255]));
        assert_eq!(image.get_pixel(10, 20), &Rgb([255, 255, 255]));
        // The right edge lies beyond the frame, so the last column stays clear.
        assert_eq!(image.get_pixel(63, 20), &Rgb([0, 0, 0]));
    }

    #[test]
    fn very_long_trail_segment_is_cut_to_the_frame() {
        let segment = Segment { from: Centroid::new(0.0, 0.0), to: Centroid::new(1e9, 5.0) };
        let clipped = clip_segment(&segment, 100, 100).expect("segment starts inside");
        assert_eq!(clipped.from, segment.from);
        assert!((clipped.to.x - (100.0 + CLIP_MARGIN)).abs() < 1e-6);

        let mut canvas = ImageCanvas::new(RgbImage::new(100, 100));
        canvas.draw_segment(&segment, Color::RED, LINE_THICKNESS).unwrap();
        assert_eq!(canvas.image().get_pixel(50, 0), &Rgb([255, 0, 0]));
    }

    #[test]
    fn clipping_drops_geometry_outside_the_canvas() {
        let outside = Segment { from: Centroid::new(-50.0, -50.0), to: Centroid::new(-10.0, 500.0) };
        assert_eq!(clip_segment(&outside, 100, 100), None);
        assert_eq!(clip_box(&BoundingBox::new(100.0, 0.0, 120.0, 20.0), 100, 100), None);

        let inside = BoundingBox::new(5.0, 5.0, 20.0, 20.0);
        assert_eq!(clip_box(&inside, 100, 100), Some(inside));
    }

    #[test]
    fn labels_are_visible_only_near_the_canvas() {
        assert!(label_visible(10.0, 20.0, 80.0, 18.0, 100, 100));
        assert!(label_visible(-50.0, 5.0, 80.0, 18.0, 100, 100));
        assert!(!label_visible(3e9, 20.0, 80.0, 18.0, 100, 100));
        assert!(!label_visible(-100.0, 20.0, 80.0, 18.0, 100, 100));
        assert!(!label_visible(10.0, -10.0, 80.0, 18.0, 100, 100));
    }
}
