//! One-way commands sent to the frontend.
//!
//! Every command validates its arguments first; nothing is sent on error.

use serde_json::Value;

use niivue_core::{colormap, Command, ColormapSpec, NiivueError, Result};

use crate::viewer::NiiVue;

/// File name used by [`NiiVue::save_screenshot`].
pub const DEFAULT_SCENE_FILE: &str = "screenshot.png";

impl NiiVue {
    fn send_command(&self, command: Command) {
        self.inner.channel.command(command);
    }

    /// Asks the frontend to save the current scene under `filename`.
    pub fn save_scene(&self, filename: impl Into<String>) {
        self.send_command(Command::SaveScene(filename.into()));
    }

    /// Saves the current scene as `screenshot.png`.
    pub fn save_screenshot(&self) {
        self.save_scene(DEFAULT_SCENE_FILE);
    }

    /// Registers a custom colormap from an untyped mapping with `R`, `G`,
    /// `B`, `A`, `I` and optional `min`, `max`, `labels` keys.
    pub fn add_colormap(&self, name: impl Into<String>, cmap: &Value) -> Result<()> {
        let cmap = ColormapSpec::from_value(cmap)?;
        self.send_colormap(name.into(), cmap);
        Ok(())
    }

    /// Registers a custom colormap.
    pub fn add_colormap_spec(&self, name: impl Into<String>, cmap: ColormapSpec) -> Result<()> {
        cmap.validate()?;
        self.send_colormap(name.into(), cmap);
        Ok(())
    }

    fn send_colormap(&self, name: String, cmap: ColormapSpec) {
        if colormap::is_builtin(&name) {
            log::debug!("custom colormap '{name}' shadows a built-in colormap");
        }
        self.send_command(Command::AddColormap { name, cmap });
    }

    /// Sets the display gamma.
    pub fn set_gamma(&self, gamma: f64) -> Result<()> {
        if !gamma.is_finite() {
            return Err(NiivueError::InvalidGamma(gamma));
        }
        self.send_command(Command::SetGamma(gamma));
        Ok(())
    }

    /// Sets the colormap of the volume with the given id.
    pub fn set_colormap(&self, id: &str, colormap: impl Into<String>) -> Result<()> {
        let volume = self
            .volume_by_id(id)
            .ok_or_else(|| NiivueError::VolumeNotFound(id.to_string()))?;
        volume.set_colormap(colormap);
        Ok(())
    }

    /// Sets the opacity of the volume with the given id.
    pub fn set_opacity(&self, id: &str, opacity: f64) -> Result<()> {
        let volume = self
            .volume_by_id(id)
            .ok_or_else(|| NiivueError::VolumeNotFound(id.to_string()))?;
        volume.set_opacity(opacity);
        Ok(())
    }

    /// Sets the opacity of the mesh with the given id.
    pub fn set_mesh_opacity(&self, id: &str, opacity: f64) -> Result<()> {
        let mesh = self
            .mesh_by_id(id)
            .ok_or_else(|| NiivueError::MeshNotFound(id.to_string()))?;
        mesh.set_opacity(opacity);
        Ok(())
    }

    /// Returns the names of the built-in colormaps.
    pub fn colormaps(&self) -> &'static [&'static str] {
        colormap::colormaps()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use niivue_core::MessageLog;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_save_scene_default_name() {
        let log = Rc::new(MessageLog::new());
        let nv = NiiVue::new(log.clone());
        nv.save_screenshot();
        nv.save_scene("brain.png");
        assert_eq!(
            log.commands(),
            vec![
                Command::SaveScene("screenshot.png".into()),
                Command::SaveScene("brain.png".into()),
            ]
        );
    }

    #[test]
    fn test_gamma_must_be_finite() {
        let log = Rc::new(MessageLog::new());
        let nv = NiiVue::new(log.clone());
        assert!(matches!(nv.set_gamma(f64::NAN), Err(NiivueError::InvalidGamma(_))));
        nv.set_gamma(1.2).unwrap();
        assert_eq!(log.commands(), vec![Command::SetGamma(1.2)]);
    }

    #[test]
    fn test_set_colormap_requires_a_hit() {
        let log = Rc::new(MessageLog::new());
        let nv = NiiVue::new(log.clone());
        nv.add_volume(niivue_structures::VolumeFields::default().with_id("t1"))
            .unwrap();

        nv.set_colormap("t1", "hot").unwrap();
        assert_eq!(nv.volumes()[0].colormap(), "hot");
        assert!(matches!(
            nv.set_colormap("t2", "hot"),
            Err(NiivueError::VolumeNotFound(id)) if id == "t2"
        ));
        assert!(matches!(
            nv.set_mesh_opacity("m", 0.5),
            Err(NiivueError::MeshNotFound(_))
        ));
    }

    #[test]
    fn test_invalid_colormap_is_not_sent() {
        let log = Rc::new(MessageLog::new());
        let nv = NiiVue::new(log.clone());
        assert!(nv.add_colormap("x", &json!({"R": [0]})).is_err());
        assert!(log.commands().is_empty());
    }
}
