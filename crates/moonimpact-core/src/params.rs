//! Render-side shader parameter caches with dirty tracking.
//!
//! Setters only mark the parameter group they touch. `apply()` uploads the
//! groups marked dirty to a [`ParameterSink`] and clears every bit, so an
//! unchanged frame uploads nothing.

use bitflags::bitflags;
use glam::{Mat4, Vec3, Vec4};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DirtyFlags: u8 {
        const TRANSFORM = 1 << 0;
        const TEXTURE   = 1 << 1;
        const SCALAR    = 1 << 2;
        const LIGHTING  = 1 << 3;
    }
}

/// Opaque handle to a GPU texture view owned by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Destination of parameter uploads: an effect/constant-buffer binding in a
/// real renderer, a recorder in tests.
pub trait ParameterSink {
    fn set_matrix(&mut self, name: &'static str, value: &Mat4);
    fn set_vector(&mut self, name: &'static str, value: Vec4);
    fn set_scalar(&mut self, name: &'static str, value: f32);
    fn set_texture(&mut self, name: &'static str, texture: TextureHandle);
}

/// World/view/projection access shared by every effect.
pub trait CameraMatrices {
    fn world(&self) -> Mat4;
    fn view(&self) -> Mat4;
    fn projection(&self) -> Mat4;

    fn set_world(&mut self, world: Mat4);
    fn set_view(&mut self, view: Mat4);
    fn set_projection(&mut self, projection: Mat4);

    /// Upload dirty groups and clear all dirty bits.
    fn apply(&mut self, sink: &mut dyn ParameterSink);
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Transform {
    world: Mat4,
    view: Mat4,
    projection: Mat4,
}

impl Transform {
    const fn identity() -> Self {
        Self { world: Mat4::IDENTITY, view: Mat4::IDENTITY, projection: Mat4::IDENTITY }
    }

    #[inline]
    fn world_view_projection(&self) -> Mat4 {
        self.projection * self.view * self.world
    }
}

pub const DEFAULT_HEIGHT_MULTIPLIER: f32 = 32.0;

/// Parameters of the heightmap displacement/lighting effect.
#[derive(Debug, Clone)]
pub struct TerrainParameters {
    transform: Transform,
    texture: Option<TextureHandle>,
    height_multiplier: f32,
    light_colour: Vec4,
    light_ambient_colour: Vec4,
    light_direction: Vec3,
    resolution: Vec3,
    dirty: DirtyFlags,
}

impl Default for TerrainParameters {
    fn default() -> Self {
        Self::new()
    }
}

impl TerrainParameters {
    /// Everything starts dirty so the first `apply` uploads the full set.
    pub fn new() -> Self {
        Self {
            transform: Transform::identity(),
            texture: None,
            height_multiplier: DEFAULT_HEIGHT_MULTIPLIER,
            light_colour: Vec4::ONE,
            light_ambient_colour: Vec4::new(0.1, 0.1, 0.1, 1.0),
            light_direction: Vec3::new(0.0, -1.0, 0.0),
            resolution: Vec3::ZERO,
            dirty: DirtyFlags::all(),
        }
    }

    #[inline]
    pub fn dirty(&self) -> DirtyFlags {
        self.dirty
    }

    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    pub fn set_texture(&mut self, texture: Option<TextureHandle>) {
        self.texture = texture;
        self.dirty |= DirtyFlags::TEXTURE;
    }

    pub fn height_multiplier(&self) -> f32 {
        self.height_multiplier
    }

    pub fn set_height_multiplier(&mut self, value: f32) {
        self.height_multiplier = value;
        self.dirty |= DirtyFlags::SCALAR;
    }

    pub fn light_colour(&self) -> Vec4 {
        self.light_colour
    }

    pub fn set_light_colour(&mut self, colour: Vec4) {
        self.light_colour = colour;
        self.dirty |= DirtyFlags::LIGHTING;
    }

    pub fn light_ambient_colour(&self) -> Vec4 {
        self.light_ambient_colour
    }

    pub fn set_light_ambient_colour(&mut self, colour: Vec4) {
        self.light_ambient_colour = colour;
        self.dirty |= DirtyFlags::LIGHTING;
    }

    pub fn light_direction(&self) -> Vec3 {
        self.light_direction
    }

    pub fn set_light_direction(&mut self, direction: Vec3) {
        self.light_direction = direction;
        self.dirty |= DirtyFlags::LIGHTING;
    }

    pub fn resolution(&self) -> Vec3 {
        self.resolution
    }

    pub fn set_resolution(&mut self, resolution: Vec3) {
        self.resolution = resolution;
        self.dirty |= DirtyFlags::LIGHTING;
    }
}

impl CameraMatrices for TerrainParameters {
    fn world(&self) -> Mat4 {
        self.transform.world
    }

    fn view(&self) -> Mat4 {
        self.transform.view
    }

    fn projection(&self) -> Mat4 {
        self.transform.projection
    }

    fn set_world(&mut self, world: Mat4) {
        self.transform.world = world;
        self.dirty |= DirtyFlags::TRANSFORM;
    }

    fn set_view(&mut self, view: Mat4) {
        self.transform.view = view;
        self.dirty |= DirtyFlags::TRANSFORM;
    }

    fn set_projection(&mut self, projection: Mat4) {
        self.transform.projection = projection;
        self.dirty |= DirtyFlags::TRANSFORM;
    }

    fn apply(&mut self, sink: &mut dyn ParameterSink) {
        if self.dirty.contains(DirtyFlags::TRANSFORM) {
            sink.set_matrix("WorldViewProjection", &self.transform.world_view_projection());
            sink.set_matrix("World", &self.transform.world);
        }

        if self.dirty.contains(DirtyFlags::TEXTURE) {
            if let Some(texture) = self.texture {
                sink.set_texture("Tex", texture);
            }
        }

        if self.dirty.contains(DirtyFlags::SCALAR) {
            sink.set_scalar("HeightMultiplier", self.height_multiplier);
        }

        if self.dirty.contains(DirtyFlags::LIGHTING) {
            sink.set_vector("lightColour", self.light_colour);
            sink.set_vector("lightDirection", self.light_direction.extend(0.0));
            sink.set_vector("lightAmbient", self.light_ambient_colour);
            sink.set_vector("Resolution", self.resolution.extend(0.0));
        }

        self.dirty = DirtyFlags::empty();
    }
}

/// Parameters of the offscreen crater-splat effect. Transform only.
#[derive(Debug, Clone)]
pub struct CraterParameters {
    transform: Transform,
    dirty: DirtyFlags,
}

impl Default for CraterParameters {
    fn default() -> Self {
        Self::new()
    }
}

impl CraterParameters {
    pub fn new() -> Self {
        Self { transform: Transform::identity(), dirty: DirtyFlags::empty() }
    }

    #[inline]
    pub fn dirty(&self) -> DirtyFlags {
        self.dirty
    }
}

impl CameraMatrices for CraterParameters {
    fn world(&self) -> Mat4 {
        self.transform.world
    }

    fn view(&self) -> Mat4 {
        self.transform.view
    }

    fn projection(&self) -> Mat4 {
        self.transform.projection
    }

    fn set_world(&mut self, world: Mat4) {
        self.transform.world = world;
        self.dirty |= DirtyFlags::TRANSFORM;
    }

    fn set_view(&mut self, view: Mat4) {
        self.transform.view = view;
        self.dirty |= DirtyFlags::TRANSFORM;
    }

    fn set_projection(&mut self, projection: Mat4) {
        self.transform.projection = projection;
        self.dirty |= DirtyFlags::TRANSFORM;
    }

    fn apply(&mut self, sink: &mut dyn ParameterSink) {
        if self.dirty.contains(DirtyFlags::TRANSFORM) {
            sink.set_matrix("WorldViewProjection", &self.transform.world_view_projection());
        }
        self.dirty = DirtyFlags::empty();
    }
}

/// Sink that records parameter names in upload order.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub uploads: Vec<&'static str>,
    pub last_matrix: Option<Mat4>,
}

impl RecordingSink {
    pub fn clear(&mut self) {
        self.uploads.clear();
        self.last_matrix = None;
    }
}

impl ParameterSink for RecordingSink {
    fn set_matrix(&mut self, name: &'static str, value: &Mat4) {
        self.uploads.push(name);
        self.last_matrix = Some(*value);
    }

    fn set_vector(&mut self, name: &'static str, _value: Vec4) {
        self.uploads.push(name);
    }

    fn set_scalar(&mut self, name: &'static str, _value: f32) {
        self.uploads.push(name);
    }

    fn set_texture(&mut self, name: &'static str, _texture: TextureHandle) {
        self.uploads.push(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terrain_first_apply_uploads_everything_but_missing_texture() {
        let mut p = TerrainParameters::new();
        let mut sink = RecordingSink::default();
        p.apply(&mut sink);

        assert_eq!(
            sink.uploads,
            vec![
                "WorldViewProjection",
                "World",
                "HeightMultiplier",
                "lightColour",
                "lightDirection",
                "lightAmbient",
                "Resolution",
            ]
        );
        assert!(p.dirty().is_empty());
    }

    #[test]
    fn clean_apply_uploads_nothing() {
        let mut p = TerrainParameters::new();
        let mut sink = RecordingSink::default();
        p.apply(&mut sink);
        sink.clear();

        p.apply(&mut sink);
        assert!(sink.uploads.is_empty());
    }

    #[test]
    fn setters_mark_only_their_group() {
        let mut p = TerrainParameters::new();
        let mut sink = RecordingSink::default();
        p.apply(&mut sink);
        sink.clear();

        p.set_height_multiplier(12.0);
        assert_eq!(p.dirty(), DirtyFlags::SCALAR);

        p.set_texture(Some(TextureHandle(7)));
        assert_eq!(p.dirty(), DirtyFlags::SCALAR | DirtyFlags::TEXTURE);

        p.apply(&mut sink);
        assert_eq!(sink.uploads, vec!["Tex", "HeightMultiplier"]);
    }

    #[test]
    fn lighting_group_uploads_all_four_vectors() {
        let mut p = TerrainParameters::new();
        let mut sink = RecordingSink::default();
        p.apply(&mut sink);
        sink.clear();

        p.set_light_direction(Vec3::new(1.0, -1.0, 0.0));
        p.apply(&mut sink);
        assert_eq!(sink.uploads, vec!["lightColour", "lightDirection", "lightAmbient", "Resolution"]);
    }

    #[test]
    fn world_view_projection_composes_right_to_left() {
        let mut p = CraterParameters::new();
        let world = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let view = Mat4::from_scale(Vec3::splat(2.0));
        let projection = Mat4::from_translation(Vec3::new(0.0, 3.0, 0.0));
        p.set_world(world);
        p.set_view(view);
        p.set_projection(projection);

        let mut sink = RecordingSink::default();
        p.apply(&mut sink);

        let wvp = sink.last_matrix.unwrap();
        let moved = wvp.transform_point3(Vec3::ZERO);
        assert_eq!(moved, Vec3::new(2.0, 3.0, 0.0));
    }

    #[test]
    fn crater_starts_clean() {
        let mut p = CraterParameters::new();
        let mut sink = RecordingSink::default();
        p.apply(&mut sink);
        assert!(sink.uploads.is_empty());

        p.set_view(Mat4::IDENTITY);
        p.apply(&mut sink);
        assert_eq!(sink.uploads, vec!["WorldViewProjection"]);
    }
}
