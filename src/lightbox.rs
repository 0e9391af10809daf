//! Modal image viewer state: open/close phases, zoom, pan, pinch and swipe.
//!
//! Coordinates are client pixels. The view forwards pointer, touch, wheel and
//! key events here and renders from [`Lightbox::transform_css`] and friends.

use std::time::{Duration, Instant};

pub const MIN_SCALE: f64 = 1.0;
pub const MAX_SCALE: f64 = 4.0;
pub const ZOOM_STEP: f64 = 0.25;
pub const DOUBLE_TAP_SCALE: f64 = 2.0;
pub const DOUBLE_TAP_WINDOW: Duration = Duration::from_millis(200);
pub const SWIPE_THRESHOLD: f64 = 50.0;
pub const OPEN_DELAY: Duration = Duration::from_millis(10);
pub const CLOSE_DELAY: Duration = Duration::from_millis(300);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LightboxImage {
    pub src: String,
    pub caption: String,
}

impl LightboxImage {
    pub fn new(src: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            caption: caption.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn minus(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    fn distance(self, other: Point) -> f64 {
        let d = self.minus(other);
        (d.x * d.x + d.y * d.y).sqrt()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightboxPhase {
    Closed,
    Opening,
    Open,
    Closing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Navigation {
    Prev,
    Next,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightboxKey {
    Close,
    Prev,
    Next,
    ZoomIn,
    ZoomOut,
    Reset,
}

impl LightboxKey {
    /// Maps a DOM `key` value.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "Escape" => Some(Self::Close),
            "ArrowLeft" => Some(Self::Prev),
            "ArrowRight" => Some(Self::Next),
            "+" | "=" => Some(Self::ZoomIn),
            "-" | "_" => Some(Self::ZoomOut),
            "0" => Some(Self::Reset),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Pinch {
    initial_distance: f64,
    base_scale: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Lightbox {
    phase: LightboxPhase,
    images: Vec<LightboxImage>,
    index: usize,
    scale: f64,
    translate: Point,
    drag_origin: Option<Point>,
    pinch: Option<Pinch>,
    touch_start: Option<Point>,
    last_tap: Option<Instant>,
    /// Gallery set put aside while a single out-of-context image is shown.
    restore: Option<Vec<LightboxImage>>,
    last_navigation: Option<Navigation>,
}

impl Default for Lightbox {
    fn default() -> Self {
        Self {
            phase: LightboxPhase::Closed,
            images: Vec::new(),
            index: 0,
            scale: MIN_SCALE,
            translate: Point::default(),
            drag_origin: None,
            pinch: None,
            touch_start: None,
            last_tap: None,
            restore: None,
            last_navigation: None,
        }
    }
}

impl Lightbox {
    pub fn new(images: Vec<LightboxImage>) -> Self {
        Self {
            images,
            ..Self::default()
        }
    }

    pub fn phase(&self) -> LightboxPhase {
        self.phase
    }

    pub fn is_visible(&self) -> bool {
        self.phase != LightboxPhase::Closed
    }

    pub fn images(&self) -> &[LightboxImage] {
        &self.images
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn translate(&self) -> Point {
        self.translate
    }

    pub fn current(&self) -> Option<&LightboxImage> {
        self.images.get(self.index)
    }

    pub fn last_navigation(&self) -> Option<Navigation> {
        self.last_navigation
    }

    pub fn open(&mut self, index: usize) -> bool {
        if self.images.is_empty() {
            return false;
        }
        self.index = index.min(self.images.len() - 1);
        self.last_navigation = None;
        self.reset_zoom();
        self.phase = LightboxPhase::Opening;
        true
    }

    /// Opens the chat gallery at `index`. A single-image view that is still
    /// closing is finished first so the new set is not parked in `restore`.
    pub fn open_gallery(&mut self, images: Vec<LightboxImage>, index: usize) -> bool {
        if self.phase == LightboxPhase::Closing {
            self.finish_closing();
        }
        self.restore = None;
        self.images = images;
        self.open(index)
    }

    /// Shows one image on its own; the gallery comes back after closing.
    pub fn open_single(&mut self, image: LightboxImage) -> bool {
        if self.restore.is_none() {
            self.restore = Some(std::mem::take(&mut self.images));
        }
        self.images = vec![image];
        self.open(0)
    }

    pub fn finish_opening(&mut self) {
        if self.phase == LightboxPhase::Opening {
            self.phase = LightboxPhase::Open;
        }
    }

    pub fn close(&mut self) -> bool {
        match self.phase {
            LightboxPhase::Opening | LightboxPhase::Open => {
                self.phase = LightboxPhase::Closing;
                true
            }
            _ => false,
        }
    }

    pub fn finish_closing(&mut self) {
        if self.phase != LightboxPhase::Closing {
            return;
        }
        self.phase = LightboxPhase::Closed;
        self.reset_zoom();
        self.touch_start = None;
        self.last_tap = None;
        if let Some(images) = self.restore.take() {
            self.images = images;
            self.index = 0;
        }
    }

    pub fn next(&mut self) {
        if self.images.is_empty() {
            return;
        }
        self.index = (self.index + 1) % self.images.len();
        self.last_navigation = Some(Navigation::Next);
        self.reset_zoom();
    }

    pub fn prev(&mut self) {
        if self.images.is_empty() {
            return;
        }
        let len = self.images.len();
        self.index = (self.index + len - 1) % len;
        self.last_navigation = Some(Navigation::Prev);
        self.reset_zoom();
    }

    pub fn zoom_in(&mut self) {
        self.scale = (self.scale + ZOOM_STEP).min(MAX_SCALE);
    }

    pub fn zoom_out(&mut self) {
        self.scale = (self.scale - ZOOM_STEP).max(MIN_SCALE);
        if self.scale <= MIN_SCALE {
            self.translate = Point::default();
        }
    }

    pub fn reset_zoom(&mut self) {
        self.scale = MIN_SCALE;
        self.translate = Point::default();
        self.drag_origin = None;
        self.pinch = None;
    }

    /// Zooms so that `point` moves toward the centre of `image`.
    pub fn zoom_to_point(&mut self, point: Point, image: Rect, target: f64) {
        let offset = point.minus(image.center());
        self.scale = target.clamp(MIN_SCALE, MAX_SCALE);
        self.translate = Point::new(-offset.x * (self.scale - 1.0), -offset.y * (self.scale - 1.0));
    }

    /// Double click / double tap: 1x zooms to 2x at the point, anything else resets.
    pub fn toggle_zoom_at(&mut self, point: Point, image: Rect) {
        if self.scale <= MIN_SCALE {
            self.zoom_to_point(point, image, DOUBLE_TAP_SCALE);
        } else {
            self.reset_zoom();
        }
    }

    pub fn wheel(&mut self, delta_y: f64) {
        if !self.is_visible() {
            return;
        }
        if delta_y < 0.0 {
            self.zoom_in();
        } else {
            self.zoom_out();
        }
    }

    pub fn key(&mut self, key: LightboxKey) {
        if !self.is_visible() {
            return;
        }
        match key {
            LightboxKey::Close => {
                self.close();
            }
            LightboxKey::Prev => self.prev(),
            LightboxKey::Next => self.next(),
            LightboxKey::ZoomIn => self.zoom_in(),
            LightboxKey::ZoomOut => self.zoom_out(),
            LightboxKey::Reset => self.reset_zoom(),
        }
    }

    /// Starts a mouse drag; only possible while zoomed in.
    pub fn pointer_down(&mut self, point: Point) -> bool {
        if self.scale > MIN_SCALE {
            self.drag_origin = Some(point.minus(self.translate));
            true
        } else {
            false
        }
    }

    pub fn pointer_move(&mut self, point: Point) {
        if let Some(origin) = self.drag_origin {
            self.translate = point.minus(origin);
        }
    }

    pub fn pointer_up(&mut self) {
        self.drag_origin = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_origin.is_some()
    }

    /// Returns `true` when this tap completed a double tap.
    pub fn tap(&mut self, point: Point, image: Rect, now: Instant) -> bool {
        if let Some(last) = self.last_tap {
            let interval = now.saturating_duration_since(last);
            if !interval.is_zero() && interval < DOUBLE_TAP_WINDOW {
                self.toggle_zoom_at(point, image);
                self.last_tap = None;
                return true;
            }
        }
        self.last_tap = Some(now);
        false
    }

    /// Returns `true` when the touch completed a double tap, in which case the
    /// view suppresses the synthesized `dblclick`.
    pub fn touch_start(&mut self, touches: &[Point], image: Rect, now: Instant) -> bool {
        match touches {
            [a, b] => {
                self.pinch = Some(Pinch {
                    initial_distance: a.distance(*b),
                    base_scale: self.scale,
                });
                self.touch_start = None;
                self.drag_origin = None;
            }
            [point] => {
                let double_tap = self.tap(*point, image, now);
                self.touch_start = Some(*point);
                self.pointer_down(*point);
                return double_tap;
            }
            _ => {}
        }
        false
    }

    pub fn touch_move(&mut self, touches: &[Point]) {
        match touches {
            [a, b] => {
                if let Some(pinch) = self.pinch.filter(|p| p.initial_distance > 0.0) {
                    let ratio = a.distance(*b) / pinch.initial_distance;
                    self.scale = (pinch.base_scale * ratio).clamp(MIN_SCALE, MAX_SCALE);
                }
            }
            [point] if self.scale > MIN_SCALE => self.pointer_move(*point),
            _ => {}
        }
    }

    /// `remaining` is the number of fingers still down, `lifted` the finger that left.
    pub fn touch_end(&mut self, remaining: usize, lifted: Option<Point>) -> Option<Navigation> {
        if remaining > 0 {
            return None;
        }
        self.drag_origin = None;
        self.pinch = None;
        let start = self.touch_start.take()?;
        let end = lifted?;
        if self.scale > MIN_SCALE {
            return None;
        }

        let delta = end.minus(start);
        if delta.x.abs() > delta.y.abs() && delta.x.abs() > SWIPE_THRESHOLD {
            if delta.x > 0.0 {
                self.prev();
                Some(Navigation::Prev)
            } else {
                self.next();
                Some(Navigation::Next)
            }
        } else {
            None
        }
    }

    pub fn can_zoom_in(&self) -> bool {
        self.scale < MAX_SCALE
    }

    pub fn can_zoom_out(&self) -> bool {
        self.scale > MIN_SCALE
    }

    pub fn show_navigation(&self) -> bool {
        self.images.len() > 1
    }

    /// 1-based position and total, for the counter bar.
    pub fn counter(&self) -> (usize, usize) {
        (self.index + 1, self.images.len())
    }

    pub fn zoom_label(&self) -> String {
        format!("{}%", (self.scale * 100.0).round() as i64)
    }

    pub fn transform_css(&self) -> String {
        format!(
            "scale({}) translate({}px, {}px)",
            self.scale,
            self.translate.x / self.scale,
            self.translate.y / self.scale
        )
    }

    pub fn cursor(&self) -> &'static str {
        if self.is_dragging() {
            "grabbing"
        } else if self.scale > MIN_SCALE {
            "grab"
        } else {
            "default"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gallery(n: usize) -> Lightbox {
        Lightbox::new(
            (0..n)
                .map(|i| LightboxImage::new(format!("img-{i}.png"), format!("Image {}", i + 1)))
                .collect(),
        )
    }

    fn image_rect() -> Rect {
        Rect {
            x: 0.0,
            y: 0.0,
            width: 200.0,
            height: 100.0,
        }
    }

    #[test]
    fn test_phases() {
        let mut lb = gallery(2);
        assert!(lb.open(1));
        assert_eq!(lb.phase(), LightboxPhase::Opening);
        lb.finish_opening();
        assert_eq!(lb.phase(), LightboxPhase::Open);
        assert!(lb.close());
        assert!(!lb.close());
        lb.finish_closing();
        assert_eq!(lb.phase(), LightboxPhase::Closed);
        lb.finish_opening();
        assert_eq!(lb.phase(), LightboxPhase::Closed);
    }

    #[test]
    fn test_open_empty_gallery_is_refused() {
        let mut lb = Lightbox::default();
        assert!(!lb.open(0));
        assert!(!lb.is_visible());
    }

    #[test]
    fn test_navigation_wraps_and_resets_zoom() {
        let mut lb = gallery(3);
        lb.open(0);
        lb.zoom_in();
        lb.prev();
        assert_eq!(lb.index(), 2);
        assert_eq!(lb.scale(), MIN_SCALE);
        lb.next();
        assert_eq!(lb.index(), 0);
        assert_eq!(lb.counter(), (1, 3));
    }

    #[test]
    fn test_zoom_stays_in_bounds() {
        let mut lb = gallery(1);
        lb.open(0);
        for _ in 0..20 {
            lb.zoom_in();
            assert!(lb.scale() <= MAX_SCALE);
        }
        assert_eq!(lb.scale(), MAX_SCALE);
        assert!(!lb.can_zoom_in());
        assert_eq!(lb.zoom_label(), "400%");
        for _ in 0..20 {
            lb.zoom_out();
            assert!(lb.scale() >= MIN_SCALE);
        }
        assert_eq!(lb.scale(), MIN_SCALE);
        assert_eq!(lb.translate(), Point::default());
    }

    #[test]
    fn test_pinch_scales_by_distance_ratio() {
        let mut lb = gallery(1);
        lb.open(0);
        let now = Instant::now();
        lb.touch_start(&[Point::new(0.0, 0.0), Point::new(100.0, 0.0)], image_rect(), now);
        lb.touch_move(&[Point::new(0.0, 0.0), Point::new(250.0, 0.0)]);
        assert_eq!(lb.scale(), 2.5);
        lb.touch_move(&[Point::new(0.0, 0.0), Point::new(1000.0, 0.0)]);
        assert_eq!(lb.scale(), MAX_SCALE);
        lb.touch_move(&[Point::new(0.0, 0.0), Point::new(10.0, 0.0)]);
        assert_eq!(lb.scale(), MIN_SCALE);
    }

    #[test]
    fn test_double_tap_toggles_toward_point() {
        let mut lb = gallery(1);
        lb.open(0);
        let now = Instant::now();
        let tap = Point::new(150.0, 50.0);
        assert!(!lb.tap(tap, image_rect(), now));
        assert!(lb.tap(tap, image_rect(), now + Duration::from_millis(120)));
        assert_eq!(lb.scale(), DOUBLE_TAP_SCALE);
        assert_eq!(lb.translate(), Point::new(-50.0, 0.0));

        // Too slow: counts as a fresh first tap.
        assert!(!lb.tap(tap, image_rect(), now + Duration::from_millis(500)));
        assert!(lb.tap(tap, image_rect(), now + Duration::from_millis(600)));
        assert_eq!(lb.scale(), MIN_SCALE);
    }

    #[test]
    fn test_drag_only_when_zoomed() {
        let mut lb = gallery(1);
        lb.open(0);
        assert!(!lb.pointer_down(Point::new(10.0, 10.0)));
        lb.pointer_move(Point::new(50.0, 50.0));
        assert_eq!(lb.translate(), Point::default());

        lb.zoom_in();
        assert!(lb.pointer_down(Point::new(10.0, 10.0)));
        assert_eq!(lb.cursor(), "grabbing");
        lb.pointer_move(Point::new(40.0, 30.0));
        assert_eq!(lb.translate(), Point::new(30.0, 20.0));
        lb.pointer_up();
        assert_eq!(lb.cursor(), "grab");
    }

    #[test]
    fn test_swipe_navigates_only_at_base_scale() {
        let mut lb = gallery(3);
        lb.open(0);
        let now = Instant::now();

        lb.touch_start(&[Point::new(200.0, 100.0)], image_rect(), now);
        assert_eq!(lb.touch_end(0, Some(Point::new(100.0, 110.0))), Some(Navigation::Next));
        assert_eq!(lb.index(), 1);

        lb.touch_start(&[Point::new(100.0, 100.0)], image_rect(), now + Duration::from_secs(1));
        assert_eq!(lb.touch_end(0, Some(Point::new(130.0, 100.0))), None);

        lb.touch_start(&[Point::new(100.0, 100.0)], image_rect(), now + Duration::from_secs(2));
        assert_eq!(lb.touch_end(0, Some(Point::new(100.0, 300.0))), None);

        lb.zoom_in();
        lb.touch_start(&[Point::new(200.0, 100.0)], image_rect(), now + Duration::from_secs(3));
        assert_eq!(lb.touch_end(0, Some(Point::new(0.0, 100.0))), None);
        assert_eq!(lb.index(), 1);
    }

    #[test]
    fn test_single_image_view_restores_gallery() {
        let mut lb = gallery(3);
        lb.open_single(LightboxImage::new("preview.png", "Image preview"));
        assert_eq!(lb.images().len(), 1);
        assert!(!lb.show_navigation());

        lb.close();
        lb.finish_closing();
        assert_eq!(lb.images().len(), 3);
        assert_eq!(lb.phase(), LightboxPhase::Closed);
    }

    #[test]
    fn test_gallery_opens_while_preview_is_closing() {
        let mut lb = gallery(3);
        lb.open_single(LightboxImage::new("preview.png", "Image preview"));
        lb.finish_opening();
        assert!(lb.close());

        assert!(lb.open_gallery(gallery(4).images().to_vec(), 2));
        assert_eq!(lb.images().len(), 4);
        assert_eq!(lb.index(), 2);
        assert_eq!(lb.current().map(|image| image.src.as_str()), Some("img-2.png"));

        // The preview's close timer firing late changes nothing.
        lb.finish_closing();
        assert_eq!(lb.phase(), LightboxPhase::Opening);
        assert_eq!(lb.images().len(), 4);
    }

    #[test]
    fn test_double_tap_touch_is_reported() {
        let mut lb = gallery(1);
        lb.open(0);
        let now = Instant::now();
        let point = Point::new(150.0, 50.0);

        assert!(!lb.touch_start(&[point], image_rect(), now));
        lb.touch_end(0, Some(point));
        assert!(lb.touch_start(&[point], image_rect(), now + Duration::from_millis(120)));
        assert_eq!(lb.scale(), DOUBLE_TAP_SCALE);
        lb.touch_end(0, Some(point));

        // Two fingers never count as a tap.
        let pinch = [Point::new(0.0, 0.0), Point::new(100.0, 0.0)];
        assert!(!lb.touch_start(&pinch, image_rect(), now + Duration::from_millis(150)));
    }

    #[test]
    fn test_keys_and_wheel() {
        let mut lb = gallery(2);
        lb.key(LightboxKey::ZoomIn);
        assert_eq!(lb.scale(), MIN_SCALE);

        lb.open(0);
        lb.wheel(-1.0);
        assert_eq!(lb.scale(), 1.25);
        assert_eq!(LightboxKey::from_key("="), Some(LightboxKey::ZoomIn));
        lb.key(LightboxKey::from_key("0").unwrap());
        assert_eq!(lb.scale(), MIN_SCALE);
        lb.key(LightboxKey::Next);
        assert_eq!(lb.index(), 1);
        lb.key(LightboxKey::Close);
        assert_eq!(lb.phase(), LightboxPhase::Closing);
    }

    #[test]
    fn test_transform_css() {
        let mut lb = gallery(1);
        lb.open(0);
        lb.zoom_to_point(Point::new(150.0, 50.0), image_rect(), 2.0);
        assert_eq!(lb.transform_css(), "scale(2) translate(-25px, 0px)");
    }
}
