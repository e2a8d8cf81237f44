//! Typed registration helpers, one per event.

use serde_json::Value;

use niivue_structures::{Mesh, Volume};

use crate::dispatcher::CallbackId;
use crate::events::{Event, EventKind, Resolved};
use crate::viewer::NiiVue;

impl NiiVue {
    /// Called with `(azimuth, elevation)` when the 3D view rotates.
    pub fn on_azimuth_elevation_change(
        &self,
        mut callback: impl FnMut(f64, f64) + 'static,
    ) -> CallbackId {
        self.on(EventKind::AzimuthElevationChange, move |event| {
            if let Event::AzimuthElevationChange { azimuth, elevation } = event {
                callback(*azimuth, *elevation);
            }
        })
    }

    /// Called with the segmentation result (`mm3`, `mL`, ...).
    pub fn on_click_to_segment(&self, callback: impl FnMut(&Value) + 'static) -> CallbackId {
        self.on_payload(EventKind::ClickToSegment, callback)
    }

    /// Called with the clip plane as `[depth, azimuth, elevation]`.
    pub fn on_clip_plane_change(&self, callback: impl FnMut(&Value) + 'static) -> CallbackId {
        self.on_payload(EventKind::ClipPlaneChange, callback)
    }

    /// Called when a document finishes loading.
    pub fn on_document_loaded(&self, callback: impl FnMut(&Value) + 'static) -> CallbackId {
        self.on_payload(EventKind::DocumentLoaded, callback)
    }

    /// Called with the drag geometry when a drag ends.
    pub fn on_drag_release(&self, callback: impl FnMut(&Value) + 'static) -> CallbackId {
        self.on_payload(EventKind::DragRelease, callback)
    }

    /// Called with the volume and its new frame index.
    ///
    /// Not called when the frontend names a volume that is not loaded.
    pub fn on_frame_change(
        &self,
        mut callback: impl FnMut(&Volume, usize) + 'static,
    ) -> CallbackId {
        self.on(EventKind::FrameChange, move |event| {
            if let Event::FrameChange {
                volume,
                frame_index,
            } = event
            {
                callback(volume, *frame_index);
            }
        })
    }

    /// Called when an image finishes loading, with the loaded volume or,
    /// if no volume has the reported id, the raw payload.
    pub fn on_image_loaded(
        &self,
        mut callback: impl FnMut(&Resolved<Volume>) + 'static,
    ) -> CallbackId {
        self.on(EventKind::ImageLoaded, move |event| {
            if let Event::ImageLoaded(resolved) = event {
                callback(resolved);
            }
        })
    }

    /// Called when a volume's intensity window changes.
    ///
    /// Not called when the frontend names a volume that is not loaded.
    pub fn on_intensity_change(&self, mut callback: impl FnMut(&Volume) + 'static) -> CallbackId {
        self.on(EventKind::IntensityChange, move |event| {
            if let Event::IntensityChange(volume) = event {
                callback(volume);
            }
        })
    }

    /// Called with the crosshair location.
    pub fn on_location_change(&self, callback: impl FnMut(&Value) + 'static) -> CallbackId {
        self.on_payload(EventKind::LocationChange, callback)
    }

    /// Called with `({url, headers}, mesh descriptor)`.
    pub fn on_mesh_added_from_url(
        &self,
        mut callback: impl FnMut(&Value, &Value) + 'static,
    ) -> CallbackId {
        self.on(EventKind::MeshAddedFromUrl, move |event| {
            if let Event::MeshAddedFromUrl { options, mesh } = event {
                callback(options, mesh);
            }
        })
    }

    /// Called when a mesh finishes loading, with the mesh or the raw payload.
    pub fn on_mesh_loaded(&self, mut callback: impl FnMut(&Resolved<Mesh>) + 'static) -> CallbackId {
        self.on(EventKind::MeshLoaded, move |event| {
            if let Event::MeshLoaded(resolved) = event {
                callback(resolved);
            }
        })
    }

    /// Called with the mouse state on button release.
    pub fn on_mouse_up(&self, callback: impl FnMut(&Value) + 'static) -> CallbackId {
        self.on_payload(EventKind::MouseUp, callback)
    }

    /// Called with `({url, headers}, volume descriptor)`.
    pub fn on_volume_added_from_url(
        &self,
        mut callback: impl FnMut(&Value, &Value) + 'static,
    ) -> CallbackId {
        self.on(EventKind::VolumeAddedFromUrl, move |event| {
            if let Event::VolumeAddedFromUrl { options, volume } = event {
                callback(options, volume);
            }
        })
    }

    /// Called without arguments when any volume changes in the frontend.
    pub fn on_volume_updated(&self, mut callback: impl FnMut() + 'static) -> CallbackId {
        self.on(EventKind::VolumeUpdated, move |_| callback())
    }

    fn on_payload(
        &self,
        kind: EventKind,
        mut callback: impl FnMut(&Value) + 'static,
    ) -> CallbackId {
        self.on(kind, move |event| {
            let payload = match event {
                Event::ClickToSegment(p)
                | Event::ClipPlaneChange(p)
                | Event::DocumentLoaded(p)
                | Event::DragRelease(p)
                | Event::LocationChange(p)
                | Event::MouseUp(p) => p,
                _ => return,
            };
            callback(payload);
        })
    }
}
