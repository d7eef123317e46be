//! Localization seam.
//!
//! The serializer never reaches for global device state. Whatever knows the
//! current space and its origin is passed in as a [`Localizer`].

use crate::pose::Pose;

/// Source of the current space and its origin frame.
pub trait Localizer: Send + Sync {
    /// Identifier of the space the device is localized into.
    fn current_space_id(&self) -> Option<String>;

    /// Express a world pose relative to the space origin.
    ///
    /// `None` when not localized.
    fn offset_pose(&self, world: &Pose) -> Option<Pose>;

    /// Map an origin-relative pose back into world space.
    ///
    /// `None` when not localized.
    fn localize(&self, offset: &Pose) -> Option<Pose>;

    fn is_localized(&self) -> bool {
        self.current_space_id().is_some()
    }
}

/// Explicit localization state: a space id plus the world pose of its origin.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpaceContext {
    pub space_id: Option<String>,
    pub origin: Option<Pose>,
}

impl SpaceContext {
    /// Localized into `space_id` whose origin sits at `origin` in world space.
    pub fn localized(space_id: impl Into<String>, origin: Pose) -> Self {
        Self {
            space_id: Some(space_id.into()),
            origin: Some(origin),
        }
    }

    pub fn unlocalized() -> Self {
        Self::default()
    }
}

impl Localizer for SpaceContext {
    fn current_space_id(&self) -> Option<String> {
        self.origin.and(self.space_id.clone())
    }

    fn offset_pose(&self, world: &Pose) -> Option<Pose> {
        self.space_id.as_ref()?;
        Some(self.origin?.relative(world))
    }

    fn localize(&self, offset: &Pose) -> Option<Pose> {
        self.space_id.as_ref()?;
        Some(self.origin?.mul_pose(offset))
    }
}
