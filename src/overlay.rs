//! Visualization side channel.
//!
//! Drawing is purely cosmetic. The monitor classifies first and only then hands
//! the pose and report to an [`OverlaySink`], so no sink can influence the
//! detection result. [`NoopOverlay`] is the default.

use crate::pose::{KeypointName, Pose};
use crate::proximity::{mirror_x, DetectionArea, Point, ProximityReport, MIN_KEYPOINT_SCORE};

const KEYPOINT_RADIUS: f32 = 5.0;
const EYE_CENTER_RADIUS: f32 = 3.0;
const WRIST_LINE_WIDTH: f32 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub alpha: f32,
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, alpha: f32) -> Self {
        Self { r, g, b, alpha }
    }

    pub const RED: Color = Color::rgba(255, 0, 0, 1.0);
    pub const GREEN: Color = Color::rgba(0, 128, 0, 1.0);
    pub const BLUE: Color = Color::rgba(0, 0, 255, 1.0);
    pub const YELLOW: Color = Color::rgba(255, 255, 0, 1.0);
    pub const WHITE: Color = Color::rgba(255, 255, 255, 1.0);
    pub const AREA_ACTIVE: Color = Color::rgba(255, 0, 0, 0.3);
    pub const AREA_IDLE: Color = Color::rgba(255, 255, 255, 0.3);
    pub const REACH: Color = Color::rgba(255, 255, 0, 0.2);
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Clear,
    Marker {
        center: Point,
        radius: f32,
        color: Color,
    },
    Rect {
        area: DetectionArea,
        color: Color,
    },
    Circle {
        center: Point,
        radius: f32,
        color: Color,
    },
    Line {
        from: Point,
        to: Point,
        color: Color,
        width: f32,
    },
    Label {
        at: Point,
        text: String,
    },
}

/// Receives draw commands for one frame at a time.
pub trait OverlaySink {
    fn draw(&mut self, command: DrawCommand);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopOverlay;

impl OverlaySink for NoopOverlay {
    fn draw(&mut self, _command: DrawCommand) {}
}

/// Collects commands in memory.
#[derive(Clone, Debug, Default)]
pub struct RecordingOverlay {
    commands: Vec<DrawCommand>,
}

impl RecordingOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }
}

impl OverlaySink for RecordingOverlay {
    fn draw(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }
}

fn keypoint_color(name: KeypointName) -> Color {
    if name.is_wrist() {
        Color::RED
    } else if name == KeypointName::Nose {
        Color::GREEN
    } else {
        Color::BLUE
    }
}

/// Clear the overlay and mark every confident keypoint with its name.
pub fn draw_keypoints(sink: &mut dyn OverlaySink, pose: &Pose, frame_width: u32) {
    sink.draw(DrawCommand::Clear);
    for kp in pose
        .keypoints
        .iter()
        .filter(|kp| kp.is_confident(MIN_KEYPOINT_SCORE))
    {
        let center = Point::new(mirror_x(kp.x, frame_width), kp.y);
        sink.draw(DrawCommand::Marker {
            center,
            radius: KEYPOINT_RADIUS,
            color: keypoint_color(kp.name),
        });
        sink.draw(DrawCommand::Label {
            at: Point::new(center.x + KEYPOINT_RADIUS, center.y - KEYPOINT_RADIUS),
            text: kp.name.to_string(),
        });
    }
}

/// Draw the detection area, eye center, reach circle and wrist lines.
///
/// Nothing is drawn when the report has no geometry (a precondition failed).
pub fn draw_report(sink: &mut dyn OverlaySink, report: &ProximityReport) {
    let Some(geometry) = report.geometry else {
        return;
    };
    let left = report.left_in_target();
    let right = report.right_in_target();

    sink.draw(DrawCommand::Rect {
        area: geometry.area,
        color: if report.near {
            Color::AREA_ACTIVE
        } else {
            Color::AREA_IDLE
        },
    });
    sink.draw(DrawCommand::Marker {
        center: geometry.eye_center,
        radius: EYE_CENTER_RADIUS,
        color: Color::YELLOW,
    });
    sink.draw(DrawCommand::Circle {
        center: geometry.eye_center,
        radius: geometry.reach(),
        color: Color::REACH,
    });

    for (wrist, alone_in_target) in [
        (report.left_wrist, left && !right),
        (report.right_wrist, right && !left),
    ] {
        let Some(wrist) = wrist else {
            continue;
        };
        sink.draw(DrawCommand::Line {
            from: geometry.eye_center,
            to: wrist.position,
            color: if alone_in_target {
                Color::RED
            } else {
                Color::GREEN
            },
            width: WRIST_LINE_WIDTH,
        });
        sink.draw(DrawCommand::Label {
            at: geometry.eye_center.midpoint(wrist.position),
            text: format!("{}px", wrist.distance.round() as i64),
        });
    }
}
