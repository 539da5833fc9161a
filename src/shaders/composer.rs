use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::RenderError;

/// Kernel entry modules, each composed into one compute pipeline.
pub const QUERY_KERNEL: &str = "query::pathtrace";
pub const WAVEFRONT_KERNELS: [&str; 5] = [
    "wavefront::raygen",
    "wavefront::intersect",
    "wavefront::closest_hit",
    "wavefront::miss",
    "wavefront::resolve",
];

const EMBEDDED: &[(&str, &str)] = &[
    ("common::types", include_str!("wgsl/common/types.wgsl")),
    ("common::bindings", include_str!("wgsl/common/bindings.wgsl")),
    ("common::random", include_str!("wgsl/common/random.wgsl")),
    ("common::math", include_str!("wgsl/common/math.wgsl")),
    ("common::traverse", include_str!("wgsl/common/traverse.wgsl")),
    ("common::surface", include_str!("wgsl/common/surface.wgsl")),
    ("common::bsdf", include_str!("wgsl/common/bsdf.wgsl")),
    ("common::lights", include_str!("wgsl/common/lights.wgsl")),
    ("common::integrator", include_str!("wgsl/common/integrator.wgsl")),
    ("query::pathtrace", include_str!("wgsl/query/pathtrace.wgsl")),
    ("wavefront::bindings", include_str!("wgsl/wavefront/bindings.wgsl")),
    ("wavefront::raygen", include_str!("wgsl/wavefront/raygen.wgsl")),
    ("wavefront::intersect", include_str!("wgsl/wavefront/intersect.wgsl")),
    ("wavefront::closest_hit", include_str!("wgsl/wavefront/closest_hit.wgsl")),
    ("wavefront::miss", include_str!("wgsl/wavefront/miss.wgsl")),
    ("wavefront::resolve", include_str!("wgsl/wavefront/resolve.wgsl")),
];

/// WGSL shader composer that resolves `// #import module::name` directives.
///
/// Each `.wgsl` module can declare imports at the top, and the composer
/// concatenates them in dependency order with deduplication.
#[derive(Clone)]
pub struct ShaderComposer {
    modules: HashMap<String, String>,
}

impl ShaderComposer {
    /// Composer over the sources compiled into the binary.
    pub fn embedded() -> Self {
        let modules = EMBEDDED
            .iter()
            .map(|&(name, src)| (name.to_string(), src.to_string()))
            .collect();
        Self { modules }
    }

    /// Embedded sources, with any `.wgsl` found under `dir` replacing the
    /// module of the same name.
    pub fn with_overrides(dir: &Path) -> Result<Self> {
        let mut composer = Self::embedded();
        let mut loaded = HashMap::new();
        Self::load_dir(dir, dir, &mut loaded)?;
        log::info!("Loaded {} shader override(s) from {}", loaded.len(), dir.display());
        composer.modules.extend(loaded);
        Ok(composer)
    }

    fn load_dir(base: &Path, dir: &Path, modules: &mut HashMap<String, String>) -> Result<()> {
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read shader directory: {}", dir.display()))?
        {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                Self::load_dir(base, &path, modules)?;
            } else if path.extension().is_some_and(|ext| ext == "wgsl") {
                let module_name = Self::path_to_module_name(base, &path);
                let source = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read shader: {}", path.display()))?;
                modules.insert(module_name, source);
            }
        }
        Ok(())
    }

    /// `base/common/lights.wgsl` -> `common::lights`
    fn path_to_module_name(base: &Path, path: &Path) -> String {
        let relative = path.strip_prefix(base).unwrap_or(path);
        let stem = relative.with_extension("");
        stem.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("::")
    }

    /// Compose a shader by resolving all imports recursively.
    pub fn compose(&self, entry_module: &str) -> Result<String> {
        let mut output = String::new();
        let mut visited = HashSet::new();
        self.resolve(entry_module, &mut output, &mut visited)?;
        Ok(output)
    }

    /// [`Self::compose`] with the failure classified as a setup error.
    pub fn compose_kernel(&self, entry_module: &str) -> Result<String, RenderError> {
        self.compose(entry_module)
            .map_err(|e| RenderError::Shader(format!("{entry_module}: {e:#}")))
    }

    fn resolve(
        &self,
        module_name: &str,
        output: &mut String,
        visited: &mut HashSet<String>,
    ) -> Result<()> {
        if visited.contains(module_name) {
            return Ok(());
        }
        visited.insert(module_name.to_string());

        let source = self
            .modules
            .get(module_name)
            .with_context(|| format!("Shader module not found: {module_name}"))?;

        let mut body = String::new();
        for line in source.lines() {
            let trimmed = line.trim();
            if let Some(import_name) = trimmed.strip_prefix("// #import ") {
                self.resolve(import_name.trim(), output, visited)
                    .with_context(|| format!("imported by {module_name}"))?;
            } else {
                body.push_str(line);
                body.push('\n');
            }
        }
        output.push_str(&body);
        output.push('\n');

        Ok(())
    }

    pub fn register(&mut self, name: &str, source: &str) {
        self.modules.insert(name.to_string(), source.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_composer(entries: &[(&str, &str)]) -> ShaderComposer {
        let mut composer = ShaderComposer {
            modules: HashMap::new(),
        };
        for &(name, src) in entries {
            composer.register(name, src);
        }
        composer
    }

    #[test]
    fn test_import_resolution() {
        let composer = make_composer(&[
            ("utils", "fn helper() -> f32 { return 1.0; }"),
            ("main", "// #import utils\nfn main() { let x = helper(); }"),
        ]);

        let result = composer.compose("main").unwrap();
        assert!(result.contains("fn helper()"));
        assert!(result.contains("fn main()"));
        assert!(result.find("fn helper()").unwrap() < result.find("fn main()").unwrap());
    }

    #[test]
    fn test_deduplication() {
        let composer = make_composer(&[
            ("base", "fn base_fn() {}"),
            ("a", "// #import base\nfn a_fn() {}"),
            ("b", "// #import base\nfn b_fn() {}"),
            ("main", "// #import a\n// #import b\nfn main_fn() {}"),
        ]);

        let result = composer.compose("main").unwrap();
        assert_eq!(result.matches("fn base_fn()").count(), 1);
    }

    #[test]
    fn test_missing_module_is_shader_error() {
        let composer = make_composer(&[("main", "// #import nowhere\nfn main() {}")]);
        let err = composer.compose_kernel("main").unwrap_err();
        assert!(matches!(err, RenderError::Shader(_)));
        assert!(err.to_string().contains("nowhere"));
        assert!(err.is_setup_fatal());
    }

    #[test]
    fn test_every_kernel_composes() {
        let composer = ShaderComposer::embedded();
        for kernel in std::iter::once(QUERY_KERNEL).chain(WAVEFRONT_KERNELS) {
            let src = composer.compose(kernel).unwrap();
            assert_eq!(src.matches("struct FrameState").count(), 1, "{kernel}");
            assert_eq!(src.matches("fn main(").count(), 1, "{kernel}");
            assert!(!src.contains("// #import"), "{kernel}");
        }
    }

    #[test]
    fn test_wavefront_kernels_share_integrator() {
        let composer = ShaderComposer::embedded();
        let query = composer.compose(QUERY_KERNEL).unwrap();
        let raygen = composer.compose("wavefront::raygen").unwrap();
        for f in ["fn path_begin(", "fn path_hit(", "fn path_miss(", "fn write_output("] {
            assert!(query.contains(f) && raygen.contains(f), "{f}");
        }
        assert!(raygen.contains("var<storage, read_write> paths"));
        assert!(!query.contains("var<storage, read_write> paths"));
    }

    #[test]
    fn test_override_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("common")).unwrap();
        std::fs::write(
            dir.path().join("common").join("random.wgsl"),
            "fn overridden_rng() {}",
        )
        .unwrap();
        let composer = ShaderComposer::with_overrides(dir.path()).unwrap();
        let src = composer.compose(QUERY_KERNEL).unwrap();
        assert!(src.contains("fn overridden_rng()"));
        assert!(!src.contains("fn pcg_hash("));
    }
}
