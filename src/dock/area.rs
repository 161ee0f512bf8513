use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;

use super::geometry::Rect;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Where a dragged group lands relative to a drop target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum DockArea {
    Left,
    Right,
    Top,
    Bottom,
    Center,
}

impl DockArea {
    /// Split axis the area implies. `Center` has none; it merges tabs.
    pub fn orientation(self) -> Option<Orientation> {
        match self {
            DockArea::Left | DockArea::Right => Some(Orientation::Horizontal),
            DockArea::Top | DockArea::Bottom => Some(Orientation::Vertical),
            DockArea::Center => None,
        }
    }

    /// Leading areas insert before the target, trailing ones after.
    pub fn is_leading(self) -> bool { matches!(self, DockArea::Left | DockArea::Top) }

    /// Rectangle a commit would give the dropped group, used as the drop
    /// preview overlay. Directional areas take half the target.
    pub fn preview_rect(self, target: Rect) -> Rect {
        let half_w = target.width() / 2.0;
        let half_h = target.height() / 2.0;
        match self {
            DockArea::Left => Rect::new(target.min_x(), target.min_y(), half_w, target.height()),
            DockArea::Right => Rect::new(target.min_x() + half_w, target.min_y(), half_w, target.height()),
            DockArea::Top => Rect::new(target.min_x(), target.min_y(), target.width(), half_h),
            DockArea::Bottom => Rect::new(target.min_x(), target.min_y() + half_h, target.width(), half_h),
            DockArea::Center => target,
        }
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn orientation_per_area() {
        assert_eq!(Some(Orientation::Horizontal), DockArea::Left.orientation());
        assert_eq!(Some(Orientation::Horizontal), DockArea::Right.orientation());
        assert_eq!(Some(Orientation::Vertical), DockArea::Top.orientation());
        assert_eq!(Some(Orientation::Vertical), DockArea::Bottom.orientation());
        assert_eq!(None, DockArea::Center.orientation());
    }

    #[test]
    fn leading_areas() {
        assert!(DockArea::Left.is_leading());
        assert!(DockArea::Top.is_leading());
        assert!(!DockArea::Right.is_leading());
        assert!(!DockArea::Bottom.is_leading());
        assert!(!DockArea::Center.is_leading());
    }

    #[test]
    fn preview_rects_stay_within_target() {
        let target = Rect::new(100.0, 50.0, 400.0, 300.0);
        for area in DockArea::iter() {
            let preview = area.preview_rect(target);
            assert!(target.contains_rect(preview), "{area:?} escaped the target");
        }
        assert_eq!(target, DockArea::Center.preview_rect(target));
        assert_eq!(
            Rect::new(300.0, 50.0, 200.0, 300.0),
            DockArea::Right.preview_rect(target)
        );
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!("\"left\"", serde_json::to_string(&DockArea::Left).unwrap());
        assert_eq!(
            "\"horizontal\"",
            serde_json::to_string(&Orientation::Horizontal).unwrap()
        );
    }
}
