//! Placing decoded meshes back into the world.
//!
//! Creating scene objects is an engine concern; this module only decides the
//! world pose for each handle and hands both to a [`MeshInstantiator`].

use crate::localization::Localizer;
use crate::mesh::MeshHandle;
use crate::pose::Pose;

/// Engine integration point: turns one handle plus a world pose into a
/// scene object.
pub trait MeshInstantiator {
    type Object;

    fn instantiate(&mut self, mesh: MeshHandle, world_pose: Pose) -> Self::Object;
}

/// Instantiate every handle at its stored pose mapped through `localizer`.
///
/// When the localizer cannot map a pose, the stored pose is used as-is and
/// the fallback is logged as an error. Handles are consumed.
pub fn instantiate<I: MeshInstantiator>(
    meshes: Vec<MeshHandle>,
    instantiator: &mut I,
    localizer: &dyn Localizer,
) -> Vec<I::Object> {
    if meshes.is_empty() {
        log::error!("No meshes to instantiate");
        return Vec::new();
    }

    let mut fallbacks = 0usize;
    let objects: Vec<_> = meshes
        .into_iter()
        .map(|mesh| {
            let stored = mesh.pose();
            let world = localizer.localize(&stored).unwrap_or_else(|| {
                fallbacks += 1;
                stored
            });
            instantiator.instantiate(mesh, world)
        })
        .collect();

    if fallbacks > 0 {
        log::error!("Not localized: placed {fallbacks} mesh(es) at their stored offset pose");
    }
    log::info!("Instantiated {} mesh(es)", objects.len());
    objects
}
