//! The scene: owner of all GPU assets and the per-frame pipeline.

use std::path::{Path, PathBuf};

use super::{Material, MaterialDefaults, Model, SceneDescription, SceneError};
use crate::camera::Camera;
use crate::core::{Context, FrameState};
use crate::deferred::{
    ColorTarget, CompositePass, GBuffer, GeometryPass, ShadingPass, COLOR_TARGET_FORMAT,
};
use crate::geometry::MeshCache;
use crate::ibl::IblBundle;
use crate::shadows::{LightRig, ShadowMap, ShadowPass, SHADOW_RESOLUTION};

/// A renderable scene.
///
/// Owns the render-target set, the pass objects, the IBL and shadow
/// assets, and the material/model lists. All GPU resources are released
/// when the scene drops.
pub struct Scene {
    /// Root directory for asset paths in the description.
    assets_root: PathBuf,
    /// Materials, indexed by the models.
    materials: Vec<Material>,
    /// Models in draw order.
    models: Vec<Model>,
    /// Shared mesh storage.
    mesh_cache: MeshCache,
    /// Shared material fallbacks and sampler.
    #[allow(dead_code)]
    defaults: MaterialDefaults,
    /// G-buffer target set.
    gbuffer: GBuffer,
    /// HDR resolve color target.
    color_target: ColorTarget,
    /// Shadow map target.
    shadow_map: ShadowMap,
    /// Immutable IBL assets.
    ibl: IblBundle,
    /// Depth-only light pass.
    shadow_pass: ShadowPass,
    /// G-buffer fill pass.
    geometry_pass: GeometryPass,
    /// Fullscreen resolve pass.
    shading_pass: ShadingPass,
    /// Final composite pass.
    composite_pass: CompositePass,
}

impl Scene {
    /// Build a scene from a parsed description.
    ///
    /// Runs the one-shot IBL precompute, allocates every render target,
    /// loads all meshes and material maps, and creates all pipelines.
    /// Fatal configuration errors abort construction; no partial scene
    /// is returned.
    pub fn from_description(
        ctx: &Context,
        description: &SceneDescription,
        assets_root: impl AsRef<Path>,
    ) -> Result<Self, SceneError> {
        let assets_root = assets_root.as_ref().to_path_buf();

        description.validate_indices()?;
        GBuffer::validate(&ctx.device).map_err(SceneError::TargetValidation)?;

        log::info!(
            "Building scene: {} materials, {} transforms, {} models",
            description.materials.len(),
            description.transforms.len(),
            description.models.len()
        );

        // One-shot IBL precompute; blocks until complete.
        let ibl = IblBundle::create(&ctx.device, &ctx.queue, &assets_root, &description.environment)?;

        let shadow_map = ShadowMap::new(&ctx.device, SHADOW_RESOLUTION);
        let gbuffer = GBuffer::new(&ctx.device, ctx.width, ctx.height);
        let color_target = ColorTarget::new(
            &ctx.device,
            ctx.width,
            ctx.height,
            COLOR_TARGET_FORMAT,
            "Shading Color Target",
        );

        let shadow_pass = ShadowPass::new(&ctx.device);
        let geometry_pass = GeometryPass::new(&ctx.device);

        let defaults = MaterialDefaults::new(ctx);
        let materials: Vec<Material> = description
            .materials
            .iter()
            .map(|m| {
                Material::from_description(
                    ctx,
                    m,
                    &assets_root,
                    geometry_pass.material_layout(),
                    &defaults,
                )
            })
            .collect();

        let mut mesh_cache = MeshCache::new();
        let mut models = Vec::with_capacity(description.models.len());
        for model_desc in &description.models {
            let mesh = mesh_cache.load(&assets_root.join(&model_desc.mesh))?;
            models.push(Model::new(
                ctx,
                mesh,
                model_desc.material,
                description.transforms[model_desc.transform],
                geometry_pass.model_layout(),
                shadow_pass.model_layout(),
            ));
        }

        let shading_pass = ShadingPass::new(ctx, &gbuffer, &shadow_map, &ibl);
        let composite_pass = CompositePass::new(ctx, &gbuffer, &color_target.view, &ibl);

        Ok(Self {
            assets_root,
            materials,
            models,
            mesh_cache,
            defaults,
            gbuffer,
            color_target,
            shadow_map,
            ibl,
            shadow_pass,
            geometry_pass,
            shading_pass,
            composite_pass,
        })
    }

    /// Render one frame.
    ///
    /// Pass order is the pipeline's data-dependency order: shadow ->
    /// geometry -> shading -> composite, all recorded into one command
    /// encoder and submitted in program order on one queue.
    pub fn render(
        &mut self,
        ctx: &Context,
        camera: &Camera,
        frame: &mut FrameState,
    ) -> Result<(), wgpu::SurfaceError> {
        // Light matrices are rebuilt per frame; the light is not
        // assumed static.
        let light = LightRig::new();

        self.shadow_pass.update(&ctx.queue, &light);
        self.geometry_pass
            .update(&ctx.queue, camera, ctx.aspect_ratio(), frame);
        self.shading_pass.update(&ctx.queue, camera, &light, &self.ibl);
        self.composite_pass
            .update(&ctx.queue, camera, ctx.aspect_ratio(), &self.ibl);

        let output = ctx.get_current_texture()?;
        let surface_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = ctx.create_command_encoder();

        self.shadow_pass
            .record(&mut encoder, &self.shadow_map, &self.models);
        self.geometry_pass
            .record(&mut encoder, &self.gbuffer, &self.models, &self.materials);
        self.shading_pass.record(
            &mut encoder,
            &self.color_target.view,
            &self.shadow_map,
            &self.ibl,
        );
        self.composite_pass
            .record(&mut encoder, &surface_view, &self.gbuffer, &self.ibl);

        ctx.submit(std::iter::once(encoder.finish()));
        output.present();

        frame.advance();
        Ok(())
    }

    /// Reallocate every viewport-sized target after a surface resize.
    pub fn resize(&mut self, ctx: &Context) {
        self.gbuffer = GBuffer::new(&ctx.device, ctx.width, ctx.height);
        self.color_target = ColorTarget::new(
            &ctx.device,
            ctx.width,
            ctx.height,
            COLOR_TARGET_FORMAT,
            "Shading Color Target",
        );
        // The passes hold views into the old targets; rebuild them.
        self.shading_pass = ShadingPass::new(ctx, &self.gbuffer, &self.shadow_map, &self.ibl);
        self.composite_pass =
            CompositePass::new(ctx, &self.gbuffer, &self.color_target.view, &self.ibl);

        log::info!("Resized scene targets to {}x{}", ctx.width, ctx.height);
    }

    /// Asset root directory.
    #[inline]
    pub fn assets_root(&self) -> &Path {
        &self.assets_root
    }

    /// Materials.
    #[inline]
    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// Models.
    #[inline]
    pub fn models(&self) -> &[Model] {
        &self.models
    }

    /// Number of distinct meshes loaded.
    #[inline]
    pub fn mesh_count(&self) -> usize {
        self.mesh_cache.len()
    }

    /// G-buffer target set.
    #[inline]
    pub fn gbuffer(&self) -> &GBuffer {
        &self.gbuffer
    }

    /// Shadow map.
    #[inline]
    pub fn shadow_map(&self) -> &ShadowMap {
        &self.shadow_map
    }

    /// IBL bundle.
    #[inline]
    pub fn ibl(&self) -> &IblBundle {
        &self.ibl
    }
}
