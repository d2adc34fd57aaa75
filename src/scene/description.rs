//! Scene description text format.
//!
//! A scene file is an ordered sequence of whitespace-separated tokens:
//!
//! ```text
//! type: pbr
//! lighting:
//! environment: studio
//! materials 1:
//! material 0:
//! basecolor_factor: 1 1 1 1
//! metalness_factor: 0.5
//! roughness_factor: 0.5
//! basecolor_map: null
//! metalness_map: null
//! roughness_map: null
//! normal_map: null
//! occlusion_map: null
//! emission_map: null
//! double_sided: off
//! enable_blend: off
//! alpha_cutoff: 0
//! transforms 1:
//! transform 0:
//! 1 0 0 0
//! 0 1 0 0
//! 0 0 1 0
//! 0 0 0 1
//! models 1:
//! model 0:
//! mesh: cube.obj
//! skeleton: null
//! attached: -1
//! material: 0
//! transform: 0
//! ```
//!
//! `null` marks an absent map path. Transform rows are written
//! row-major. Skeleton/attachment fields are parsed and ignored.

use std::path::PathBuf;
use std::str::SplitWhitespace;

use glam::Mat4;

use super::SceneError;

/// Parsed material parameters.
#[derive(Debug, Clone)]
pub struct MaterialDescription {
    /// Base color factor (RGBA).
    pub basecolor_factor: [f32; 4],
    /// Metalness factor.
    pub metalness_factor: f32,
    /// Roughness factor.
    pub roughness_factor: f32,
    /// Base color map path, relative to the assets root.
    pub basecolor_map: Option<PathBuf>,
    /// Metalness map path.
    pub metalness_map: Option<PathBuf>,
    /// Roughness map path.
    pub roughness_map: Option<PathBuf>,
    /// Normal map path.
    pub normal_map: Option<PathBuf>,
    /// Occlusion map path.
    pub occlusion_map: Option<PathBuf>,
    /// Emission map path.
    pub emission_map: Option<PathBuf>,
    /// Render both faces.
    pub double_sided: bool,
    /// Enable screen-door blending.
    pub enable_blend: bool,
    /// Alpha cutoff; zero disables the cutoff test.
    pub alpha_cutoff: f32,
}

/// Parsed model reference.
#[derive(Debug, Clone)]
pub struct ModelDescription {
    /// Mesh file path, relative to the assets root.
    pub mesh: PathBuf,
    /// Index into the material list.
    pub material: usize,
    /// Index into the transform list.
    pub transform: usize,
}

/// A parsed scene description.
#[derive(Debug, Clone)]
pub struct SceneDescription {
    /// Scene type tag.
    pub scene_type: String,
    /// Environment (cubemap directory) name.
    pub environment: String,
    /// Materials, in declaration order.
    pub materials: Vec<MaterialDescription>,
    /// World transforms, in declaration order.
    pub transforms: Vec<Mat4>,
    /// Models, in declaration order.
    pub models: Vec<ModelDescription>,
}

impl SceneDescription {
    /// Parse a scene description from text.
    ///
    /// Structural problems are fatal: no partial scene is returned.
    pub fn from_str(text: &str) -> Result<Self, SceneError> {
        let mut tokens = Tokens::new(text);

        tokens.expect("type:")?;
        let scene_type = tokens.next("scene type")?.to_string();

        tokens.expect("lighting:")?;
        tokens.expect("environment:")?;
        let environment = tokens.next("environment name")?.to_string();

        let num_materials = tokens.counted_header("materials")?;
        let mut materials = Vec::with_capacity(num_materials);
        for _ in 0..num_materials {
            materials.push(read_material(&mut tokens)?);
        }

        let num_transforms = tokens.counted_header("transforms")?;
        let mut transforms = Vec::with_capacity(num_transforms);
        for _ in 0..num_transforms {
            transforms.push(read_transform(&mut tokens)?);
        }

        let num_models = tokens.counted_header("models")?;
        let mut models = Vec::with_capacity(num_models);
        for _ in 0..num_models {
            models.push(read_model(&mut tokens)?);
        }

        let description = Self {
            scene_type,
            environment,
            materials,
            transforms,
            models,
        };
        description.validate_indices()?;
        Ok(description)
    }

    /// Check that every model's material/transform indices resolve.
    pub fn validate_indices(&self) -> Result<(), SceneError> {
        for (i, model) in self.models.iter().enumerate() {
            if model.material >= self.materials.len() {
                return Err(SceneError::IndexOutOfBounds {
                    model: i,
                    kind: "material",
                    index: model.material,
                    len: self.materials.len(),
                });
            }
            if model.transform >= self.transforms.len() {
                return Err(SceneError::IndexOutOfBounds {
                    model: i,
                    kind: "transform",
                    index: model.transform,
                    len: self.transforms.len(),
                });
            }
        }
        Ok(())
    }
}

fn read_material(tokens: &mut Tokens) -> Result<MaterialDescription, SceneError> {
    tokens.indexed_header("material")?;

    tokens.expect("basecolor_factor:")?;
    let basecolor_factor = [
        tokens.f32("basecolor r")?,
        tokens.f32("basecolor g")?,
        tokens.f32("basecolor b")?,
        tokens.f32("basecolor a")?,
    ];
    tokens.expect("metalness_factor:")?;
    let metalness_factor = tokens.f32("metalness factor")?;
    tokens.expect("roughness_factor:")?;
    let roughness_factor = tokens.f32("roughness factor")?;

    tokens.expect("basecolor_map:")?;
    let basecolor_map = tokens.optional_path("basecolor map")?;
    tokens.expect("metalness_map:")?;
    let metalness_map = tokens.optional_path("metalness map")?;
    tokens.expect("roughness_map:")?;
    let roughness_map = tokens.optional_path("roughness map")?;
    tokens.expect("normal_map:")?;
    let normal_map = tokens.optional_path("normal map")?;
    tokens.expect("occlusion_map:")?;
    let occlusion_map = tokens.optional_path("occlusion map")?;
    tokens.expect("emission_map:")?;
    let emission_map = tokens.optional_path("emission map")?;

    tokens.expect("double_sided:")?;
    let double_sided = tokens.switch("double_sided")?;
    tokens.expect("enable_blend:")?;
    let enable_blend = tokens.switch("enable_blend")?;
    tokens.expect("alpha_cutoff:")?;
    let alpha_cutoff = tokens.f32("alpha cutoff")?;

    Ok(MaterialDescription {
        basecolor_factor,
        metalness_factor,
        roughness_factor,
        basecolor_map,
        metalness_map,
        roughness_map,
        normal_map,
        occlusion_map,
        emission_map,
        double_sided,
        enable_blend,
        alpha_cutoff,
    })
}

fn read_transform(tokens: &mut Tokens) -> Result<Mat4, SceneError> {
    tokens.indexed_header("transform")?;

    let mut rows = [[0.0f32; 4]; 4];
    for (r, row) in rows.iter_mut().enumerate() {
        for (c, value) in row.iter_mut().enumerate() {
            *value = tokens.f32(&format!("transform element [{}][{}]", r, c))?;
        }
    }

    // Rows are written row-major; glam matrices are column-major.
    Ok(Mat4::from_cols_array_2d(&rows).transpose())
}

fn read_model(tokens: &mut Tokens) -> Result<ModelDescription, SceneError> {
    tokens.indexed_header("model")?;

    tokens.expect("mesh:")?;
    let mesh = tokens
        .optional_path("mesh path")?
        .ok_or_else(|| SceneError::Parse("model has no mesh".into()))?;

    // Skeleton/attachment fields: parsed, not supported.
    tokens.expect("skeleton:")?;
    tokens.next("skeleton")?;
    tokens.expect("attached:")?;
    tokens.next("attached")?;

    tokens.expect("material:")?;
    let material = tokens.usize("material index")?;
    tokens.expect("transform:")?;
    let transform = tokens.usize("transform index")?;

    Ok(ModelDescription {
        mesh,
        material,
        transform,
    })
}

/// Whitespace token stream over the scene text.
struct Tokens<'a> {
    iter: SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            iter: text.split_whitespace(),
        }
    }

    fn next(&mut self, what: &str) -> Result<&'a str, SceneError> {
        self.iter
            .next()
            .ok_or_else(|| SceneError::Parse(format!("unexpected end of file, expected {}", what)))
    }

    fn expect(&mut self, literal: &str) -> Result<(), SceneError> {
        let token = self.next(literal)?;
        if token != literal {
            return Err(SceneError::Parse(format!(
                "expected '{}', got '{}'",
                literal, token
            )));
        }
        Ok(())
    }

    /// Consume `name N:` and return N.
    fn counted_header(&mut self, name: &str) -> Result<usize, SceneError> {
        self.expect(name)?;
        let token = self.next("count")?;
        let digits = token.strip_suffix(':').unwrap_or(token);
        digits
            .parse()
            .map_err(|_| SceneError::Parse(format!("bad {} count '{}'", name, token)))
    }

    /// Consume `name I:`, discarding the index.
    fn indexed_header(&mut self, name: &str) -> Result<(), SceneError> {
        self.expect(name)?;
        self.next("index")?;
        Ok(())
    }

    fn f32(&mut self, what: &str) -> Result<f32, SceneError> {
        let token = self.next(what)?;
        token
            .parse()
            .map_err(|_| SceneError::Parse(format!("bad {} '{}'", what, token)))
    }

    fn usize(&mut self, what: &str) -> Result<usize, SceneError> {
        let token = self.next(what)?;
        token
            .parse()
            .map_err(|_| SceneError::Parse(format!("bad {} '{}'", what, token)))
    }

    /// A path token, with `null` meaning absent.
    fn optional_path(&mut self, what: &str) -> Result<Option<PathBuf>, SceneError> {
        let token = self.next(what)?;
        if token == "null" {
            Ok(None)
        } else {
            Ok(Some(PathBuf::from(token)))
        }
    }

    /// An `on`/`off` switch.
    fn switch(&mut self, what: &str) -> Result<bool, SceneError> {
        let token = self.next(what)?;
        match token {
            "on" => Ok(true),
            "off" => Ok(false),
            _ => Err(SceneError::Parse(format!(
                "bad {} switch '{}', expected on/off",
                what, token
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = "
type: pbr
lighting:
environment: studio
materials 2:
material 0:
basecolor_factor: 1 1 1 1
metalness_factor: 0.5
roughness_factor: 0.5
basecolor_map: helmet/basecolor.png
metalness_map: null
roughness_map: null
normal_map: helmet/normal.png
occlusion_map: null
emission_map: null
double_sided: off
enable_blend: off
alpha_cutoff: 0
material 1:
basecolor_factor: 0.8 0.2 0.2 1
metalness_factor: 0
roughness_factor: 1
basecolor_map: null
metalness_map: null
roughness_map: null
normal_map: null
occlusion_map: null
emission_map: null
double_sided: on
enable_blend: off
alpha_cutoff: 0
transforms 1:
transform 0:
1 0 0 2
0 1 0 3
0 0 1 4
0 0 0 1
models 2:
model 0:
mesh: helmet/helmet.obj
skeleton: null
attached: -1
material: 0
transform: 0
model 1:
mesh: floor.obj
skeleton: null
attached: -1
material: 1
transform: 0
";

    #[test]
    fn test_parse_counts() {
        let desc = SceneDescription::from_str(SCENE).unwrap();
        assert_eq!(desc.scene_type, "pbr");
        assert_eq!(desc.environment, "studio");
        assert_eq!(desc.materials.len(), 2);
        assert_eq!(desc.transforms.len(), 1);
        assert_eq!(desc.models.len(), 2);
    }

    #[test]
    fn test_parse_material_maps() {
        let desc = SceneDescription::from_str(SCENE).unwrap();
        let material = &desc.materials[0];
        assert_eq!(
            material.basecolor_map.as_deref(),
            Some(std::path::Path::new("helmet/basecolor.png"))
        );
        assert!(material.metalness_map.is_none());
        assert!(material.normal_map.is_some());
        assert!(!material.double_sided);
        assert!(desc.materials[1].double_sided);
    }

    #[test]
    fn test_parse_transform_translation() {
        let desc = SceneDescription::from_str(SCENE).unwrap();
        let translation = desc.transforms[0].w_axis;
        // Rows in the file are row-major; translation sits in the last
        // column of the parsed matrix.
        assert_eq!(translation.x, 2.0);
        assert_eq!(translation.y, 3.0);
        assert_eq!(translation.z, 4.0);
    }

    #[test]
    fn test_model_indices_resolve() {
        let desc = SceneDescription::from_str(SCENE).unwrap();
        assert_eq!(desc.models[0].material, 0);
        assert_eq!(desc.models[1].material, 1);
        assert!(desc.validate_indices().is_ok());
    }

    #[test]
    fn test_out_of_bounds_material_is_fatal() {
        let bad = SCENE.replace("material: 1", "material: 9");
        match SceneDescription::from_str(&bad) {
            Err(SceneError::IndexOutOfBounds { kind, index, .. }) => {
                assert_eq!(kind, "material");
                assert_eq!(index, 9);
            }
            other => panic!("expected index error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_truncated_scene_is_fatal() {
        let truncated = &SCENE[..200];
        assert!(matches!(
            SceneDescription::from_str(truncated),
            Err(SceneError::Parse(_))
        ));
    }
}
