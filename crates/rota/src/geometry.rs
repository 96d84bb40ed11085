pub const FULL_TURN: f64 = 360.0;
pub const HALF_TURN: f64 = 180.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_squared(&self, other: Point) -> f64 {
        let (dx, dy) = (self.x - other.x, self.y - other.y);
        dx * dx + dy * dy
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Padding {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Padding {
    pub fn uniform(value: f64) -> Self {
        Self {
            left: value,
            top: value,
            right: value,
            bottom: value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f64 {
        (self.right - self.left).abs()
    }

    pub fn height(&self) -> f64 {
        (self.bottom - self.top).abs()
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0,
        )
    }

    pub fn inset(&self, amount: f64) -> Self {
        Self::new(
            self.left + amount,
            self.top + amount,
            self.right - amount,
            self.bottom - amount,
        )
    }
}

/// Wraps any angle into `[0, 360)`.
pub fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(FULL_TURN);
    // rem_euclid rounds tiny negative inputs up to exactly 360
    if wrapped >= FULL_TURN { 0.0 } else { wrapped }
}

/// Angle of `point` as seen from `center`, measured from the pointer towards
/// the center. Only differences between two such angles are meaningful.
pub fn pointer_angle(center: Point, point: Point) -> f64 {
    (center.y - point.y).atan2(center.x - point.x).to_degrees()
}

/// Screen angle of `point` around `center` in `[0, 360)`: 0 is right, 90 is
/// down.
pub fn screen_angle(center: Point, point: Point) -> f64 {
    normalize_degrees((point.y - center.y).atan2(point.x - center.x).to_degrees())
}

/// Endpoints for interpolating from `current` to `target` (both normalized)
/// along the shorter arc. When the direct difference exceeds half a turn the
/// start is reflected across the 0/360 seam, so the returned start may fall
/// outside `[0, 360)`.
pub fn shortest_path(current: f64, target: f64) -> (f64, f64) {
    let raw = (current - target).abs() % FULL_TURN;
    let start = if raw > HALF_TURN {
        if current > target {
            -(FULL_TURN - current)
        } else {
            FULL_TURN + current
        }
    } else {
        current
    };
    (start, target)
}

/// Disc placement derived from the last measure and layout pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChartGeometry {
    pub width: f64,
    pub height: f64,
    pub padding: Padding,
    pub stroke_width: f64,
    pub diameter: f64,
    pub center: Point,
}

impl ChartGeometry {
    pub fn new(stroke_width: f64) -> Self {
        Self {
            stroke_width,
            ..Default::default()
        }
    }

    /// Returns the side of the square the chart occupies. The diameter is that
    /// side minus the padding on the limiting axis and the stroke margin.
    pub fn measure(&mut self, width: f64, height: f64, padding: Padding) -> f64 {
        let use_height = height < width;
        let inner = if use_height {
            height - (padding.top + padding.bottom)
        } else {
            width - (padding.left + padding.right)
        };

        self.padding = padding;
        self.diameter = (inner - self.stroke_width).max(0.0);

        if use_height { height } else { width }
    }

    pub fn layout(&mut self, frame: Rect) {
        self.width = frame.width();
        self.height = frame.height();

        let content_width = self.width - (self.padding.left + self.padding.right);
        let content_height = self.height - (self.padding.top + self.padding.bottom);
        self.center = Point::new(
            self.padding.left + content_width / 2.0,
            self.padding.top + content_height / 2.0,
        );
    }

    pub fn radius(&self) -> f64 {
        self.diameter / 2.0
    }

    pub fn is_laid_out(&self) -> bool {
        self.width >= 1.0 && self.height >= 1.0 && self.diameter > 0.0
    }

    pub fn contains(&self, point: Point) -> bool {
        let radius = self.radius();
        point.distance_squared(self.center) < radius * radius
    }

    /// Square that slices inscribe their arcs in.
    pub fn slice_bounds(&self) -> Rect {
        let radius = self.radius();
        let (left, top) = (self.center.x - radius, self.center.y - radius);
        Rect::new(left, top, left + self.diameter, top + self.diameter)
    }

    /// Pixel size of full-view surfaces.
    pub fn surface_size(&self) -> (i32, i32) {
        (self.width.ceil() as i32, self.height.ceil() as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_range_and_idempotence() {
        for raw in [-720.5, -360.0, -1e-20, -0.5, 0.0, 45.0, 359.999, 360.0, 725.25] {
            let once = normalize_degrees(raw);
            assert!((0.0..FULL_TURN).contains(&once), "{raw} -> {once}");
            assert_eq!(normalize_degrees(once), once);
        }
        assert_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(450.0), 90.0);
    }

    #[test]
    fn test_shortest_path_never_exceeds_half_turn() {
        let mut current = 0.0;
        while current < FULL_TURN {
            let mut target = 0.0;
            while target < FULL_TURN {
                let (start, end) = shortest_path(current, target);
                assert!(
                    (end - start).abs() <= HALF_TURN + 1e-9,
                    "{current} -> {target} travels {}",
                    (end - start).abs()
                );
                assert!((normalize_degrees(start) - current).abs() < 1e-9);
                target += 7.5;
            }
            current += 5.0;
        }
    }

    #[test]
    fn test_shortest_path_reflects_across_seam() {
        assert_eq!(shortest_path(350.0, 10.0), (-10.0, 10.0));
        assert_eq!(shortest_path(10.0, 350.0), (370.0, 350.0));
        assert_eq!(shortest_path(90.0, 180.0), (90.0, 180.0));
    }

    #[test]
    fn test_measure_uses_smaller_side() {
        let mut geometry = ChartGeometry::new(1.0);
        let size = geometry.measure(500.0, 300.0, Padding::uniform(10.0));
        assert_eq!(size, 300.0);
        assert_eq!(geometry.diameter, 300.0 - 20.0 - 1.0);

        geometry.layout(Rect::new(0.0, 0.0, 300.0, 300.0));
        assert_eq!(geometry.center, Point::new(150.0, 150.0));
        assert!(geometry.is_laid_out());
    }

    #[test]
    fn test_contains_uses_squared_radius() {
        let mut geometry = ChartGeometry::new(0.0);
        geometry.measure(200.0, 200.0, Padding::default());
        geometry.layout(Rect::new(0.0, 0.0, 200.0, 200.0));

        assert!(geometry.contains(Point::new(100.0, 100.0)));
        assert!(geometry.contains(Point::new(199.0, 100.0)));
        assert!(!geometry.contains(Point::new(200.0, 100.0)));
        assert!(!geometry.contains(Point::new(5.0, 5.0)));
    }

    #[test]
    fn test_screen_angle_orientation() {
        let center = Point::new(0.0, 0.0);
        assert!((screen_angle(center, Point::new(10.0, 0.0)) - 0.0).abs() < 1e-9);
        assert!((screen_angle(center, Point::new(0.0, 10.0)) - 90.0).abs() < 1e-9);
        assert!((screen_angle(center, Point::new(-10.0, 0.0)) - 180.0).abs() < 1e-9);
        assert!((screen_angle(center, Point::new(0.0, -10.0)) - 270.0).abs() < 1e-9);
    }
}
