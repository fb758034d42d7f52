//! Per-frame "hand near head" classification.
//!
//! The classifier looks at a single pose and answers one question: is exactly
//! one wrist held close to the face? It keeps no state between frames; the
//! debounce layer decides whether the answer persisted long enough to matter.
//!
//! All geometry runs in mirrored coordinates (`frame_width - x`) so that the
//! derived shapes line up with the selfie-style preview drawn by the overlay.

use crate::pose::{KeypointName, Pose};

/// Keypoints at or below this score are treated as absent.
pub const MIN_KEYPOINT_SCORE: f32 = 0.2;

/// Eye distance used when only one eye is visible, in source pixels.
pub const FALLBACK_EYE_DISTANCE: f32 = 100.0;

/// Detection area extends this many eye distances left, right and above the eyes.
pub const AREA_SPREAD: f32 = 3.0;

/// Detection area extends this many eye distances below the eyes.
pub const AREA_DROP: f32 = 1.0;

/// A wrist must be strictly closer than this many eye distances to the eye center.
pub const REACH_FACTOR: f32 = 4.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn midpoint(&self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Flip an x coordinate to match a mirrored display.
pub fn mirror_x(x: f32, frame_width: u32) -> f32 {
    frame_width as f32 - x
}

/// Axis-aligned rectangle around the head. Bounds are inclusive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectionArea {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl DetectionArea {
    pub fn around(eye_center: Point, eye_distance: f32) -> Self {
        Self {
            left: eye_center.x - AREA_SPREAD * eye_distance,
            right: eye_center.x + AREA_SPREAD * eye_distance,
            top: eye_center.y - AREA_SPREAD * eye_distance,
            bottom: eye_center.y + AREA_DROP * eye_distance,
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left && point.x <= self.right && point.y >= self.top && point.y <= self.bottom
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

/// Head reference frame derived from the visible eyes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeadGeometry {
    pub eye_center: Point,
    pub eye_distance: f32,
    pub area: DetectionArea,
}

impl HeadGeometry {
    /// Build from mirrored eye positions. Returns `None` when neither eye is visible.
    pub fn from_eyes(left_eye: Option<Point>, right_eye: Option<Point>) -> Option<Self> {
        let (eye_center, eye_distance) = match (left_eye, right_eye) {
            (Some(left), Some(right)) => (left.midpoint(right), left.distance_to(right)),
            (Some(eye), None) | (None, Some(eye)) => (eye, FALLBACK_EYE_DISTANCE),
            (None, None) => return None,
        };
        Some(Self {
            eye_center,
            eye_distance,
            area: DetectionArea::around(eye_center, eye_distance),
        })
    }

    /// Radius of the "close enough" circle.
    pub fn reach(&self) -> f32 {
        REACH_FACTOR * self.eye_distance
    }

    /// Assess a mirrored wrist position against this head.
    pub fn assess(&self, wrist: Point) -> WristAssessment {
        let distance = self.eye_center.distance_to(wrist);
        WristAssessment {
            position: wrist,
            distance,
            in_area: self.area.contains(wrist),
            close_enough: distance < self.reach(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WristAssessment {
    /// Mirrored wrist position.
    pub position: Point,
    /// Distance from the eye center.
    pub distance: f32,
    pub in_area: bool,
    pub close_enough: bool,
}

impl WristAssessment {
    pub fn in_target(&self) -> bool {
        self.in_area && self.close_enough
    }
}

/// Outcome of classifying one pose.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProximityReport {
    pub near: bool,
    /// Present only when every precondition held.
    pub geometry: Option<HeadGeometry>,
    pub left_wrist: Option<WristAssessment>,
    pub right_wrist: Option<WristAssessment>,
}

impl ProximityReport {
    fn not_near() -> Self {
        Self::default()
    }

    pub fn left_in_target(&self) -> bool {
        self.left_wrist.is_some_and(|w| w.in_target())
    }

    pub fn right_in_target(&self) -> bool {
        self.right_wrist.is_some_and(|w| w.in_target())
    }
}

/// Classify a single pose.
///
/// Needs a confident nose, at least one confident eye and at least one
/// confident wrist; otherwise the frame is "not near". With the preconditions
/// met, the frame is "near" iff exactly one wrist lies both inside the
/// detection area and within reach of the eye center.
pub fn classify(pose: &Pose, frame_width: u32) -> ProximityReport {
    let mirrored = |name: KeypointName| {
        pose.confident(name, MIN_KEYPOINT_SCORE)
            .map(|kp| Point::new(mirror_x(kp.x, frame_width), kp.y))
    };

    if mirrored(KeypointName::Nose).is_none() {
        return ProximityReport::not_near();
    }
    let left_wrist = mirrored(KeypointName::LeftWrist);
    let right_wrist = mirrored(KeypointName::RightWrist);
    if left_wrist.is_none() && right_wrist.is_none() {
        return ProximityReport::not_near();
    }
    let Some(geometry) = HeadGeometry::from_eyes(
        mirrored(KeypointName::LeftEye),
        mirrored(KeypointName::RightEye),
    ) else {
        return ProximityReport::not_near();
    };

    let left_wrist = left_wrist.map(|p| geometry.assess(p));
    let right_wrist = right_wrist.map(|p| geometry.assess(p));
    let left = left_wrist.is_some_and(|w| w.in_target());
    let right = right_wrist.is_some_and(|w| w.in_target());

    ProximityReport {
        near: left != right,
        geometry: Some(geometry),
        left_wrist,
        right_wrist,
    }
}

/// Boolean shorthand for [`classify`].
pub fn is_hand_near_head(pose: &Pose, frame_width: u32) -> bool {
    classify(pose, frame_width).near
}
